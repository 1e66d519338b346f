use crate::bundle;
use crate::domain::product::CatalogSnapshot;
use crate::domain::profile::{AccountPriority, CardPriority, LegacyPriority, Profile};
use crate::domain::recommendation::RecommendationRun;
use crate::engine::{self, weights::ScoringWeights};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Single-valued priority kept for older clients. First match wins:
///
/// | card priority | account priority  | result   |
/// |---------------|-------------------|----------|
/// | annualfee     | any               | starter  |
/// | travel        | any               | travel   |
/// | other         | savings or salary | savings  |
/// | other         | other             | cashback |
pub fn derive_legacy_priority(profile: &Profile) -> LegacyPriority {
    match (profile.card_priority, profile.account_priority) {
        (CardPriority::AnnualFee, _) => LegacyPriority::Starter,
        (CardPriority::Travel, _) => LegacyPriority::Travel,
        (_, AccountPriority::Savings | AccountPriority::Salary) => LegacyPriority::Savings,
        _ => LegacyPriority::Cashback,
    }
}

/// Scores one catalog snapshot into an immutable run. Identity and clock come from the caller.
pub fn build_run(
    profile: Profile,
    catalog: &CatalogSnapshot,
    weights: &ScoringWeights,
    run_id: Uuid,
    created_at: DateTime<Utc>,
) -> RecommendationRun {
    let accounts = engine::rank_accounts(&catalog.accounts, &profile, weights);
    let cards = engine::rank_cards(&catalog.cards, &profile, weights);
    let bundles = bundle::synthesize(&accounts, &cards, &weights.synergy);

    // Headline figure: best account plus best card, independent of how the bundles paired up.
    let expected_net_monthly_profit = accounts.first().map_or(0, |a| a.expected_monthly_benefit)
        + cards.first().map_or(0, |c| c.expected_monthly_benefit);

    RecommendationRun {
        run_id,
        priority: derive_legacy_priority(&profile),
        expected_net_monthly_profit,
        profile,
        accounts,
        cards,
        bundles,
        created_at,
    }
}
