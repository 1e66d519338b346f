use crate::domain::product::{CardProduct, ProductType};
use crate::domain::profile::{CardPriority, Profile, TravelLevel};
use crate::domain::recommendation::{RankedItem, RuleId};
use crate::engine::account::travel_share;
use crate::engine::benefit::{self, BenefitEstimate};
use crate::engine::category;
use crate::engine::reason::ScoreSheet;
use crate::engine::text::{self, format_percent, format_won};
use crate::engine::weights::{BenefitAssumptions, ScoringWeights};
use std::collections::BTreeSet;

/// Canonical spend categories a card rewards, read from its categories, tags, name and summary.
pub fn categories(product: &CardProduct) -> BTreeSet<String> {
    let mut out = category::canonicalize_all(&product.categories.iter().collect::<Vec<_>>());
    out.extend(category::canonicalize_all(&product.tags.iter().collect::<Vec<_>>()));
    out.extend(category::extract_from_text(&product.name));
    out.extend(category::extract_from_text(&product.summary));

    for tag in product.tags.iter().map(|t| t.trim().to_lowercase()) {
        match tag.as_str() {
            "travel" | "mileage" => {
                out.insert(category::TRAVEL.to_string());
            }
            "starter" | "no-fee" | "nofee" => {
                out.insert(category::STARTER.to_string());
            }
            "daily" | "cashback" => {
                out.insert(category::DAILY.to_string());
            }
            _ => {}
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeLevel {
    pub won: Option<i64>,
    pub low: bool,
    pub high: bool,
}

pub fn fee_level(product: &CardProduct, high_threshold_won: i64) -> FeeLevel {
    let parsed = text::parse_annual_fee(&product.annual_fee_text);
    let won = product.annual_fee_won.or(parsed.estimated_won);
    let low = match product.annual_fee_won {
        Some(w) => w <= 0,
        None => parsed.low_fee,
    };
    FeeLevel {
        won,
        low,
        high: !low && won.is_some_and(|w| w >= high_threshold_won),
    }
}

pub fn score(product: &CardProduct, profile: &Profile, weights: &ScoringWeights) -> RankedItem {
    let w = &weights.card;
    let categories = categories(product);
    let mut signals: BTreeSet<String> = product
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    signals.extend(categories.iter().cloned());
    let has = |s: &str| signals.contains(s);

    let mut sheet = ScoreSheet::new(w.base_score);

    let matched: Vec<&String> = profile
        .card_categories
        .iter()
        .filter(|c| categories.contains(c.as_str()))
        .collect();
    if !matched.is_empty() {
        sheet.add(
            RuleId::CategoryOverlap,
            w.category_overlap * matched.len() as i32,
            format!(
                "소비 카테고리 {}개 일치: {}",
                matched.len(),
                category::labels_of(matched.iter().copied())
            ),
        );
    }

    match profile.card_priority {
        CardPriority::Cashback
            if has(category::DAILY) || has(category::ONLINE) || has("cashback") =>
        {
            sheet.add(
                RuleId::Priority,
                w.priority_cashback,
                "생활 할인/캐시백 우선순위와 일치",
            )
        }
        CardPriority::Travel if has(category::TRAVEL) => sheet.add(
            RuleId::Priority,
            w.priority_travel,
            "여행/해외결제 우선순위 반영",
        ),
        CardPriority::Starter if has(category::STARTER) => sheet.add(
            RuleId::Priority,
            w.priority_starter,
            "연회비 부담 최소 선호와 일치",
        ),
        CardPriority::Savings if has(category::DAILY) || has(category::ONLINE) => sheet.add(
            RuleId::Priority,
            w.priority_savings,
            "고정비/생활비 절감형으로 저축 우선순위에 맞음",
        ),
        _ => {}
    }

    if profile.travel_level == TravelLevel::Often && has(category::TRAVEL) {
        sheet.add(
            RuleId::TravelOften,
            w.travel_often,
            "해외 이용 빈도에 유리한 혜택 구성",
        );
    }

    if profile.monthly_spend >= w.daily_spend_threshold
        && (has(category::DAILY) || category::has_lifestyle(&categories))
    {
        sheet.add(
            RuleId::DailySpend,
            w.daily_spend,
            "전월 실적 달성 가능성이 높은 소비 패턴",
        );
    }

    let fee_text = text::normalize_annual_fee_text(&product.annual_fee_text);
    let fee = fee_level(product, w.high_annual_fee_threshold_won);
    if fee.low {
        sheet.add(
            RuleId::LowAnnualFee,
            w.low_annual_fee_bonus,
            format!("연회비 부담이 낮음 ({fee_text})"),
        );
    } else if fee.high {
        sheet.add(
            RuleId::HighAnnualFee,
            -w.high_annual_fee_penalty,
            format!("연회비 수준 고려 필요 ({fee_text})"),
        );
    } else {
        sheet.note(RuleId::AnnualFee, format!("연회비 정보 반영 ({fee_text})"));
    }

    if profile.card_priority == CardPriority::AnnualFee {
        if fee.low {
            sheet.add(
                RuleId::AnnualFeePriority,
                w.priority_annual_fee,
                "연회비 절감 우선순위와 일치",
            );
        } else if fee.high {
            sheet.add(
                RuleId::AnnualFeePriority,
                -w.annual_fee_priority_penalty(),
                "연회비 절감 우선순위 대비 비용 부담이 큼",
            );
        }
    }

    if product.cashback_rate_percent > 0.0 {
        let cap = product
            .monthly_cashback_cap_won
            .map(|c| format!(", 월 최대 {}", format_won(c)))
            .unwrap_or_default();
        sheet.note(
            RuleId::BenefitHighlight,
            format!(
                "카테고리 캐시백 {}%{cap}",
                format_percent(product.cashback_rate_percent)
            ),
        );
    }

    let (score, reasons) = sheet.finish();
    let estimate = estimate(product, profile, &categories, fee.won, &weights.benefit);

    RankedItem {
        rank: 0,
        product_type: ProductType::Card,
        product_id: product.id.clone(),
        provider: product.provider.clone(),
        name: product.name.clone(),
        summary: product.summary.clone(),
        official_url: product.official_url.clone(),
        score,
        reasons,
        signals: signals.iter().cloned().collect(),
        category_keys: categories
            .iter()
            .filter(|c| category::is_known(c))
            .cloned()
            .collect(),
        min_expected_monthly_benefit: estimate.min,
        expected_monthly_benefit: estimate.expected,
        max_expected_monthly_benefit: estimate.max,
        benefit_components: estimate.components,
    }
}

pub fn estimate(
    product: &CardProduct,
    profile: &Profile,
    categories: &BTreeSet<String>,
    annual_fee_won: Option<i64>,
    assumptions: &BenefitAssumptions,
) -> BenefitEstimate {
    let spend = profile.monthly_spend_won() as f64;
    let matched = profile
        .card_categories
        .iter()
        .filter(|c| categories.contains(c.as_str()))
        .count();
    let share = (matched as f64 * assumptions.category_share_percent)
        .min(assumptions.category_share_cap_percent);
    let category_spend = spend * share / 100.0;

    let mut components = Vec::new();

    if product.base_reward_rate_percent > 0.0 {
        components.push(benefit::base(
            "card_base_reward",
            format!("기본 적립 {}%", format_percent(product.base_reward_rate_percent)),
            benefit::percent_of(spend - category_spend, product.base_reward_rate_percent),
        ));
    }

    if matched > 0 && product.cashback_rate_percent > 0.0 {
        let mut amount = benefit::percent_of(category_spend, product.cashback_rate_percent);
        if let Some(cap) = product.monthly_cashback_cap_won {
            amount = amount.min(cap);
        }
        let condition = if product.min_monthly_spend_won > 0 {
            format!("전월 실적 {} 이상", format_won(product.min_monthly_spend_won))
        } else {
            "전월 실적 조건 없음".to_string()
        };
        components.push(benefit::conditional(
            "card_category_cashback",
            format!(
                "카테고리 캐시백 {}%",
                format_percent(product.cashback_rate_percent)
            ),
            condition,
            amount,
            profile.monthly_spend_won() >= product.min_monthly_spend_won,
        ));
    }

    if categories.contains(category::TRAVEL) {
        let overseas = spend * travel_share(profile.travel_level, assumptions) / 100.0;
        components.push(benefit::conditional(
            "card_travel_reward",
            "해외/여행 적립",
            "해외 결제 이용",
            benefit::percent_of(overseas, assumptions.travel_reward_percent),
            profile.travel_level.travels(),
        ));
    }

    if let Some(fee) = annual_fee_won.filter(|f| *f > 0) {
        components.push(benefit::cost(
            "card_annual_fee",
            format!("연회비 {} 월 환산", format_won(fee)),
            (fee as f64 / 12.0).round() as i64,
        ));
    }

    BenefitEstimate::from_components(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{AccountPriority, SalaryTransfer};
    use crate::domain::recommendation::ComponentKind;

    fn profile() -> Profile {
        Profile {
            age: 29,
            income: 300,
            monthly_spend: 120,
            account_priority: AccountPriority::Savings,
            card_priority: CardPriority::Cashback,
            salary_transfer: SalaryTransfer::Yes,
            travel_level: TravelLevel::None,
            account_categories: BTreeSet::new(),
            card_categories: ["online", "grocery", "subscription"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    fn card(categories: &[&str], tags: &[&str], fee_text: &str) -> CardProduct {
        CardProduct {
            id: "card".to_string(),
            provider: "테스트카드".to_string(),
            name: "테스트 카드".to_string(),
            summary: String::new(),
            official_url: "https://card.example".to_string(),
            annual_fee_text: fee_text.to_string(),
            annual_fee_won: None,
            cashback_rate_percent: 5.0,
            base_reward_rate_percent: 0.5,
            monthly_cashback_cap_won: Some(20_000),
            min_monthly_spend_won: 300_000,
            tags: tags.iter().map(|s| s.to_string()).collect(),
            categories: categories.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn category_overlap_counts_each_match() {
        let product = card(&["online", "grocery"], &["cashback"], "1만원");
        let item = score(&product, &profile(), &ScoringWeights::default());

        // base 45 + 2 × 9 overlap + cashback priority 24 + daily spend 10
        assert_eq!(item.score, 45 + 18 + 24 + 10);
        let overlap = item
            .reasons
            .iter()
            .find(|r| r.rule == RuleId::CategoryOverlap)
            .unwrap();
        assert_eq!(overlap.points, 18);
        assert!(overlap.text.contains("2개"));
    }

    #[test]
    fn annual_fee_focus_rewards_free_cards_and_penalizes_expensive_ones() {
        let mut p = profile();
        p.card_priority = CardPriority::AnnualFee;
        p.card_categories.clear();
        p.monthly_spend = 10;
        let w = ScoringWeights::default();

        let free = score(&card(&[], &[], "없음"), &p, &w);
        assert_eq!(free.score, 45 + 8 + 26);

        let no_fee = score(&card(&[], &[], "무연회비"), &p, &w);
        assert_eq!(no_fee.score, 45 + 8 + 26);
        assert!(no_fee.reasons.iter().any(|r| r.rule == RuleId::LowAnnualFee));
        assert!(no_fee.reasons.iter().any(|r| r.rule == RuleId::AnnualFeePriority));

        let pricey = score(&card(&[], &[], "30,000원"), &p, &w);
        assert_eq!(pricey.score, 45 - 6 - 13);

        let middling = score(&card(&[], &[], "15,000원"), &p, &w);
        assert_eq!(middling.score, 45);
        assert!(middling.reasons.iter().any(|r| r.rule == RuleId::AnnualFee));
    }

    #[test]
    fn cashback_is_capped_and_conditional_on_previous_month_spend() {
        let product = card(&["online", "grocery", "subscription"], &[], "1만2천원");
        let categories = categories(&product);
        let annual_fee = fee_level(&product, 30_000).won;
        assert_eq!(annual_fee, Some(12_000));
        let mut p = profile();

        // 1,200,000 × 60% × 5% = 36,000, capped at 20,000
        let e = estimate(&product, &p, &categories, annual_fee, &BenefitAssumptions::default());
        let cashback = e
            .components
            .iter()
            .find(|c| c.key == "card_category_cashback")
            .unwrap();
        assert_eq!(cashback.amount_won_per_month, 20_000);
        assert!(cashback.applied);
        // 480,000 × 0.5%
        let base = e.components.iter().find(|c| c.key == "card_base_reward").unwrap();
        assert_eq!(base.amount_won_per_month, 2_400);
        let fee = e.components.iter().find(|c| c.key == "card_annual_fee").unwrap();
        assert_eq!(fee.kind, ComponentKind::Cost);
        assert_eq!(fee.amount_won_per_month, -1_000);
        assert_eq!(e.expected, 21_400);

        p.monthly_spend = 20;
        let e = estimate(&product, &p, &categories, annual_fee, &BenefitAssumptions::default());
        assert!(!e.components[1].applied);
        assert!(e.min <= e.expected && e.expected <= e.max);
    }

    #[test]
    fn unknown_profile_category_earns_no_overlap() {
        let mut p = profile();
        p.card_categories = category::canonicalize_all(&["lottery", "LOTTE"]);
        assert!(p.card_categories.is_empty());

        let product = card(&["subscription"], &[], "1만원");
        let item = score(&product, &p, &ScoringWeights::default());
        assert!(item.reasons.iter().all(|r| r.rule != RuleId::CategoryOverlap));
    }

    #[test]
    fn travel_tags_imply_travel_category() {
        let product = card(&[], &["mileage"], "");
        assert!(categories(&product).contains("travel"));

        let mut p = profile();
        p.card_priority = CardPriority::Travel;
        p.travel_level = TravelLevel::Often;
        let item = score(&product, &p, &ScoringWeights::default());
        assert!(item.reasons.iter().any(|r| r.rule == RuleId::TravelOften));
        assert!(item.reasons.iter().any(|r| r.rule == RuleId::Priority));
    }
}
