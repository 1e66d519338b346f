//! Scoring engine: maps a profile and a catalog snapshot to ranked, explained items.
//!
//! Everything here is pure and synchronous. An empty product list ranks to an empty list.

pub mod account;
pub mod benefit;
pub mod card;
pub mod category;
pub mod reason;
pub mod text;
pub mod weights;

use crate::domain::product::{AccountProduct, CardProduct, Product, ProductType};
use crate::domain::profile::Profile;
use crate::domain::recommendation::RankedItem;
use weights::ScoringWeights;

pub const MAX_RANKED_ITEMS: usize = 3;

/// Ranks the products of one kind. Products of the other kind are ignored.
pub fn rank(
    products: &[Product],
    profile: &Profile,
    kind: ProductType,
    weights: &ScoringWeights,
) -> Vec<RankedItem> {
    let scored = products
        .iter()
        .filter(|p| p.product_type() == kind && !p.is_stat_only())
        .map(|p| match p {
            Product::Account(a) => account::score(a, profile, weights),
            Product::Card(c) => card::score(c, profile, weights),
        })
        .collect();
    assign_ranks(scored)
}

pub fn rank_accounts(
    products: &[AccountProduct],
    profile: &Profile,
    weights: &ScoringWeights,
) -> Vec<RankedItem> {
    let scored = products
        .iter()
        .filter(|p| !is_stat_only(&p.tags))
        .map(|p| account::score(p, profile, weights))
        .collect();
    assign_ranks(scored)
}

pub fn rank_cards(
    products: &[CardProduct],
    profile: &Profile,
    weights: &ScoringWeights,
) -> Vec<RankedItem> {
    let scored = products
        .iter()
        .filter(|p| !is_stat_only(&p.tags))
        .map(|p| card::score(p, profile, weights))
        .collect();
    assign_ranks(scored)
}

fn is_stat_only(tags: &std::collections::BTreeSet<String>) -> bool {
    tags.iter().any(|t| {
        t.trim()
            .eq_ignore_ascii_case(crate::domain::product::STAT_ONLY_TAG)
    })
}

/// Stable sort by score, so equal scores keep catalog order; then dense 1-based ranks.
fn assign_ranks(mut scored: Vec<RankedItem>) -> Vec<RankedItem> {
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(MAX_RANKED_ITEMS);
    for (i, item) in scored.iter_mut().enumerate() {
        item.rank = i as u32 + 1;
    }
    scored
}
