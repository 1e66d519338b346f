//! Pairs the i-th ranked account with the i-th ranked card.

use crate::domain::recommendation::{BenefitComponent, Bundle, RankedItem};
use crate::engine::benefit;
use crate::engine::category;
use crate::engine::text::format_won;
use crate::engine::weights::SynergyWeights;

pub const MAX_BUNDLES: usize = 3;

const GROUP_SUFFIXES: [&str; 3] = ["은행", "카드", "뱅크"];

/// Financial group of a provider: the name without its bank/card suffix ("KB국민은행" → "KB국민").
pub fn provider_group(provider: &str) -> String {
    let compact: String = provider.chars().filter(|c| !c.is_whitespace()).collect();
    let mut name = compact.as_str();
    for suffix in GROUP_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped;
            break;
        }
    }
    name.to_lowercase()
}

fn synergies(account: &RankedItem, card: &RankedItem, weights: &SynergyWeights) -> Vec<BenefitComponent> {
    let mut out = Vec::new();

    let group = provider_group(&account.provider);
    if !group.is_empty() && group == provider_group(&card.provider) {
        out.push(benefit::conditional(
            "synergy_same_group",
            "같은 금융그룹 연계",
            format!("{} 계좌와 카드 동시 이용", account.provider),
            weights.same_group_won,
            true,
        ));
    }

    if account.has_signal(category::SALARY)
        && (card.has_signal("cashback") || card.has_signal(category::DAILY))
    {
        out.push(benefit::conditional(
            "synergy_salary_cashback",
            "급여계좌 + 생활 캐시백 카드",
            "급여이체 계좌를 카드 결제계좌로 지정",
            weights.salary_cashback_won,
            true,
        ));
    }

    if account.has_signal(category::GLOBAL) && card.has_signal(category::TRAVEL) {
        out.push(benefit::conditional(
            "synergy_global_travel",
            "외화계좌 + 여행 카드",
            "해외 결제/환전 시 함께 이용",
            weights.global_travel_won,
            true,
        ));
    }

    out
}

fn reason(account: &RankedItem, card: &RankedItem, synergy: &[BenefitComponent], synergy_won: i64) -> String {
    let mut parts = vec![format!(
        "계좌 {}순위 + 카드 {}순위 조합",
        account.rank, card.rank
    )];
    if let Some(r) = account.top_reason() {
        parts.push(format!("계좌: {}", r.text));
    }
    if let Some(r) = card.top_reason() {
        parts.push(format!("카드: {}", r.text));
    }
    if synergy_won > 0 {
        let labels: Vec<&str> = synergy.iter().map(|c| c.label.as_str()).collect();
        parts.push(format!(
            "조합 보너스 {} ({})",
            format_won(synergy_won),
            labels.join(", ")
        ));
    }
    parts.join(" · ")
}

pub fn synthesize(
    accounts: &[RankedItem],
    cards: &[RankedItem],
    weights: &SynergyWeights,
) -> Vec<Bundle> {
    accounts
        .iter()
        .zip(cards.iter())
        .take(MAX_BUNDLES)
        .enumerate()
        .map(|(i, (account, card))| {
            let synergy = synergies(account, card, weights);
            let synergy_won: i64 = synergy.iter().map(|c| c.amount_won_per_month).sum();
            let reason = reason(account, card, &synergy, synergy_won);

            let mut components = account.benefit_components.clone();
            components.extend(card.benefit_components.iter().cloned());
            components.extend(synergy);

            Bundle {
                rank: i as u32 + 1,
                account_product_id: account.product_id.clone(),
                account_label: account.label(),
                card_product_id: card.product_id.clone(),
                card_label: card.label(),
                min_extra_monthly_benefit: account.min_expected_monthly_benefit
                    + card.min_expected_monthly_benefit,
                expected_extra_monthly_benefit: account.expected_monthly_benefit
                    + card.expected_monthly_benefit
                    + synergy_won,
                max_extra_monthly_benefit: account.max_expected_monthly_benefit
                    + card.max_expected_monthly_benefit
                    + synergy_won,
                account_expected_extra_monthly_benefit: account.expected_monthly_benefit,
                card_expected_extra_monthly_benefit: card.expected_monthly_benefit,
                synergy_extra_monthly_benefit: synergy_won,
                benefit_components: components,
                reason,
            }
        })
        .collect()
}
