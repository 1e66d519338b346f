use crate::domain::product::{AccountKind, AccountProduct, ProductType};
use crate::domain::profile::{AccountPriority, Profile, TravelLevel};
use crate::domain::recommendation::{RankedItem, RuleId};
use crate::engine::benefit::{self, BenefitEstimate};
use crate::engine::category;
use crate::engine::reason::ScoreSheet;
use crate::engine::text::{self, format_percent};
use crate::engine::weights::{BenefitAssumptions, ScoringWeights};
use std::collections::BTreeSet;

/// Semantic signals of an account: raw tags, canonical keys from tags, categories, name and
/// summary, plus what the account kind implies.
pub fn signals(product: &AccountProduct) -> BTreeSet<String> {
    let mut out: BTreeSet<String> = product
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.extend(category::canonicalize_all(&product.tags.iter().collect::<Vec<_>>()));
    out.extend(category::canonicalize_all(
        &product.categories.iter().collect::<Vec<_>>(),
    ));
    out.extend(category::extract_from_text(&product.name));
    out.extend(category::extract_from_text(&product.summary));

    match product.kind {
        AccountKind::Savings => {
            out.insert(category::SAVINGS.to_string());
        }
        AccountKind::ForeignCurrency => {
            out.insert(category::GLOBAL.to_string());
            out.insert(category::TRAVEL.to_string());
        }
        AccountKind::Checking => {
            out.insert(category::DAILY.to_string());
        }
    }
    out
}

fn rates(product: &AccountProduct) -> (Option<f64>, Option<f64>) {
    let parsed = text::extract_rates(&product.summary);
    (
        product.base_rate_percent.or(parsed.base_rate_percent),
        product.max_rate_percent.or(parsed.max_rate_percent),
    )
}

pub fn score(product: &AccountProduct, profile: &Profile, weights: &ScoringWeights) -> RankedItem {
    let w = &weights.account;
    let signals = signals(product);
    let has = |s: &str| signals.contains(s);
    let (base_rate, max_rate) = rates(product);

    let mut sheet = ScoreSheet::new(w.base_score);

    if let Some(max) = max_rate {
        if max >= w.high_rate_threshold_percent {
            sheet.add(
                RuleId::HighRate,
                w.high_rate_bonus,
                format!("최고 금리 {}%로 고금리 구간", format_percent(max)),
            );
        } else {
            sheet.note(RuleId::MaxRate, format!("최고 금리 {}%", format_percent(max)));
        }
    }
    if let Some(base) = base_rate {
        sheet.note(RuleId::BaseRate, format!("기본 금리 {}%", format_percent(base)));
    }

    if profile.transfers_salary() && has(category::SALARY) {
        sheet.add(
            RuleId::SalaryTransfer,
            w.salary_transfer,
            "급여이체 조건 충족 시 우대 혜택 가능",
        );
    }

    match profile.account_priority {
        AccountPriority::Savings if has(category::SAVINGS) => sheet.add(
            RuleId::Priority,
            w.priority_savings,
            "저축/금리 우선순위와 상품 성격 일치",
        ),
        AccountPriority::Salary if has(category::SALARY) => sheet.add(
            RuleId::Priority,
            w.priority_salary,
            "급여이체/주거래 우선순위와 일치",
        ),
        AccountPriority::Starter if has(category::STARTER) => sheet.add(
            RuleId::Priority,
            w.priority_starter,
            "초기 이용자 친화 조건과 일치",
        ),
        AccountPriority::Travel if has(category::TRAVEL) || has(category::GLOBAL) => sheet.add(
            RuleId::Priority,
            w.priority_travel,
            "여행/외화 중심 우선순위 반영",
        ),
        AccountPriority::Cashback if has(category::DAILY) || has(category::SALARY) => sheet.add(
            RuleId::Priority,
            w.priority_cashback,
            "생활소비 연동형 계좌 조건과 맞음",
        ),
        _ => {}
    }

    if profile.travel_level == TravelLevel::Often && (has(category::GLOBAL) || has(category::TRAVEL))
    {
        sheet.add(
            RuleId::TravelOften,
            w.travel_often,
            "해외 이용 빈도에 적합한 외화/여행 혜택",
        );
    }

    if profile.age <= w.young_age_max && has("young") {
        sheet.add(RuleId::YoungAge, w.young_age, "연령 구간에 맞는 우대 조건");
    }

    if profile.monthly_spend >= w.daily_spend_threshold && has(category::DAILY) {
        sheet.add(RuleId::DailySpend, w.daily_spend, "생활비 흐름과 연결되는 계좌");
    }

    let matched: Vec<&String> = profile
        .account_categories
        .iter()
        .filter(|c| signals.contains(c.as_str()))
        .collect();
    if !matched.is_empty() {
        sheet.add(
            RuleId::CategoryOverlap,
            w.category_overlap * matched.len() as i32,
            format!(
                "일치 카테고리 {}개: {}",
                matched.len(),
                category::labels_of(matched.iter().copied())
            ),
        );
    }

    let (score, reasons) = sheet.finish();
    let estimate = estimate(product, profile, &signals, &weights.benefit);

    RankedItem {
        rank: 0,
        product_type: ProductType::Account,
        product_id: product.id.clone(),
        provider: product.provider.clone(),
        name: product.name.clone(),
        summary: product.summary.clone(),
        official_url: product.official_url.clone(),
        score,
        reasons,
        category_keys: signals
            .iter()
            .filter(|s| category::is_known(s))
            .cloned()
            .collect(),
        signals: signals.into_iter().collect(),
        min_expected_monthly_benefit: estimate.min,
        expected_monthly_benefit: estimate.expected,
        max_expected_monthly_benefit: estimate.max,
        benefit_components: estimate.components,
    }
}

pub fn estimate(
    product: &AccountProduct,
    profile: &Profile,
    signals: &BTreeSet<String>,
    assumptions: &BenefitAssumptions,
) -> BenefitEstimate {
    let (base_rate, max_rate) = rates(product);
    let surplus = profile.monthly_surplus_won();
    let balance = (surplus * assumptions.balance_months) as f64;
    let salary_linked = signals.contains(category::SALARY);

    let mut components = Vec::new();

    let base_rate = base_rate.unwrap_or(0.0);
    if base_rate > 0.0 {
        components.push(benefit::base(
            "account_base_interest",
            format!("기본 금리 {}% 이자", format_percent(base_rate)),
            benefit::percent_of(balance, base_rate) / 12,
        ));
    }

    if let Some(max) = max_rate.filter(|m| *m > base_rate) {
        let uplift = benefit::percent_of(balance, max - base_rate) / 12;
        let (condition, applied) = if salary_linked {
            ("급여이체 실적 유지", profile.transfers_salary())
        } else {
            ("월 여유자금 적립", surplus > 0)
        };
        components.push(benefit::conditional(
            "account_preferential_rate",
            format!("우대 금리 최고 {}%", format_percent(max)),
            condition,
            uplift,
            applied,
        ));
    }

    if product.monthly_fee_waiver_won > 0 {
        if salary_linked {
            components.push(benefit::conditional(
                "account_fee_waiver",
                "수수료 면제",
                "급여이체 실적 유지",
                product.monthly_fee_waiver_won,
                profile.transfers_salary(),
            ));
        } else {
            components.push(benefit::base(
                "account_fee_waiver",
                "수수료 면제",
                product.monthly_fee_waiver_won,
            ));
        }
    }

    if signals.contains(category::GLOBAL) {
        let share = travel_share(profile.travel_level, assumptions);
        let overseas = profile.monthly_spend_won() as f64 * share / 100.0;
        components.push(benefit::conditional(
            "account_fx_saving",
            "환전 우대",
            "해외 결제/환전 이용",
            benefit::percent_of(overseas, assumptions.fx_saving_percent),
            profile.travel_level.travels(),
        ));
    }

    BenefitEstimate::from_components(components)
}

/// Share of spend assumed abroad; a non-traveller is priced at the occasional rate so that the
/// optimistic bound still shows what the benefit would be worth.
pub(crate) fn travel_share(level: TravelLevel, assumptions: &BenefitAssumptions) -> f64 {
    match level {
        TravelLevel::Often => assumptions.travel_share_often_percent,
        TravelLevel::Sometimes | TravelLevel::None => assumptions.travel_share_sometimes_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{CardPriority, SalaryTransfer};
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
            account_categories: ["savings", "salary"].iter().map(|s| s.to_string()).collect(),
            card_categories: BTreeSet::new(),
        }
    }

    fn account(tags: &[&str], kind: AccountKind, summary: &str) -> AccountProduct {
        AccountProduct {
            id: "acc".to_string(),
            provider: "테스트은행".to_string(),
            name: "테스트 통장".to_string(),
            kind,
            summary: summary.to_string(),
            official_url: "https://bank.example".to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            categories: BTreeSet::new(),
            base_rate_percent: None,
            max_rate_percent: None,
            monthly_fee_waiver_won: 0,
        }
    }

    #[test]
    fn salary_savings_account_collects_expected_rules() {
        let product = account(&["salary", "savings"], AccountKind::Savings, "기본 2.0% 최고 3.8%");
        let item = score(&product, &profile(), &ScoringWeights::default());

        // base 45 + high rate 8 + salary transfer 30 + savings priority 35 + 2 categories × 6
        assert_eq!(item.score, 45 + 8 + 30 + 35 + 12);
        let rules: Vec<_> = item.reasons.iter().map(|r| r.rule).collect();
        assert_eq!(
            rules,
            vec![
                RuleId::Priority,
                RuleId::SalaryTransfer,
                RuleId::CategoryOverlap,
                RuleId::HighRate
            ]
        );
        assert!(item.category_keys.contains(&"salary".to_string()));
    }

    #[test]
    fn young_bonus_needs_the_young_tag_and_age() {
        let product = account(&["young"], AccountKind::Checking, "");
        let w = ScoringWeights::default();

        let mut p = profile();
        p.account_categories.clear();
        let young = score(&product, &p, &w);
        p.age = 35;
        let older = score(&product, &p, &w);

        assert_eq!(young.score - older.score, 20);
        assert!(young.reasons.iter().any(|r| r.rule == RuleId::YoungAge));
    }

    #[test]
    fn fx_saving_is_conditional_on_travel() {
        let product = account(&[], AccountKind::ForeignCurrency, "환전 우대");
        let mut p = profile();
        let signals = signals(&product);

        let estimate = estimate(&product, &p, &signals, &BenefitAssumptions::default());
        let fx = estimate
            .components
            .iter()
            .find(|c| c.key == "account_fx_saving")
            .unwrap();
        assert_eq!(fx.kind, ComponentKind::Conditional);
        assert!(!fx.applied);
        // 1,200,000 × 5% × 1%
        assert_eq!(fx.amount_won_per_month, 600);
        assert_eq!(estimate.expected, 0);
        assert_eq!(estimate.max, 600);

        p.travel_level = TravelLevel::Often;
        let estimate = estimate_for(&product, &p);
        assert_eq!(estimate.expected, 1_800);
    }

    fn estimate_for(product: &AccountProduct, p: &Profile) -> BenefitEstimate {
        estimate(product, p, &signals(product), &BenefitAssumptions::default())
    }

    #[test]
    fn interest_uses_six_months_of_surplus() {
        let product = account(&["salary"], AccountKind::Savings, "기본 2.4% 최고 3.6%");
        let mut p = profile();
        // surplus 1,800,000 won → balance 10,800,000 won
        let e = estimate_for(&product, &p);
        let base = e.components.iter().find(|c| c.key == "account_base_interest").unwrap();
        assert_eq!(base.amount_won_per_month, 21_600);
        let uplift = e
            .components
            .iter()
            .find(|c| c.key == "account_preferential_rate")
            .unwrap();
        assert_eq!(uplift.amount_won_per_month, 10_800);
        assert!(uplift.applied);

        p.salary_transfer = SalaryTransfer::No;
        let e = estimate_for(&product, &p);
        assert_eq!(e.expected, 21_600);
        assert_eq!(e.max, 32_400);
        assert!(e.min <= e.expected && e.expected <= e.max);
    }
}
