use crate::domain::recommendation::{BenefitComponent, ComponentKind};

/// Itemized monthly benefit of one product, in won.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BenefitEstimate {
    pub min: i64,
    pub expected: i64,
    pub max: i64,
    pub components: Vec<BenefitComponent>,
}

impl BenefitEstimate {
    /// expected sums the applied components; min keeps only base and cost; max adds every
    /// conditional bonus whether or not it is currently met. All three are floored at 0.
    pub fn from_components(components: Vec<BenefitComponent>) -> Self {
        let mut min = 0;
        let mut expected = 0;
        let mut max = 0;
        for c in &components {
            let amount = c.amount_won_per_month;
            match c.kind {
                ComponentKind::Base | ComponentKind::Cost => {
                    min += amount;
                    expected += amount;
                    max += amount;
                }
                ComponentKind::Conditional => {
                    if c.applied {
                        expected += amount;
                    }
                    max += amount;
                }
            }
        }
        Self {
            min: min.max(0),
            expected: expected.max(0),
            max: max.max(0),
            components,
        }
    }
}

pub fn base(key: &str, label: impl Into<String>, amount: i64) -> BenefitComponent {
    BenefitComponent {
        key: key.to_string(),
        label: label.into(),
        condition: "항상 적용".to_string(),
        amount_won_per_month: amount.max(0),
        applied: true,
        kind: ComponentKind::Base,
    }
}

pub fn conditional(
    key: &str,
    label: impl Into<String>,
    condition: impl Into<String>,
    amount: i64,
    applied: bool,
) -> BenefitComponent {
    BenefitComponent {
        key: key.to_string(),
        label: label.into(),
        condition: condition.into(),
        amount_won_per_month: amount.max(0),
        applied,
        kind: ComponentKind::Conditional,
    }
}

/// A recurring cost; `amount` is the positive size of the cost.
pub fn cost(key: &str, label: impl Into<String>, amount: i64) -> BenefitComponent {
    BenefitComponent {
        key: key.to_string(),
        label: label.into(),
        condition: "비용 반영".to_string(),
        amount_won_per_month: -amount.abs(),
        applied: true,
        kind: ComponentKind::Cost,
    }
}

/// `amount × percent / 100`, rounded to the won.
pub fn percent_of(amount: f64, percent: f64) -> i64 {
    (amount * percent / 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmet_conditions_count_toward_max_only() {
        let estimate = BenefitEstimate::from_components(vec![
            base("interest", "기본 이자", 1_000),
            conditional("uplift", "우대 금리", "급여이체", 2_000, false),
            conditional("waiver", "수수료 면제", "급여이체", 500, true),
            cost("fee", "연회비", 300),
        ]);
        assert_eq!(estimate.min, 700);
        assert_eq!(estimate.expected, 1_200);
        assert_eq!(estimate.max, 3_200);
    }

    #[test]
    fn costs_larger_than_benefits_floor_at_zero() {
        let estimate = BenefitEstimate::from_components(vec![
            base("reward", "기본 적립", 100),
            conditional("cashback", "캐시백", "전월실적", 1_500, true),
            cost("fee", "연회비", 2_500),
        ]);
        assert_eq!(estimate.min, 0);
        assert_eq!(estimate.expected, 0);
        assert_eq!(estimate.max, 0);
        assert!(estimate.min <= estimate.expected && estimate.expected <= estimate.max);
    }

    #[test]
    fn conditional_amounts_are_never_negative() {
        let c = conditional("x", "x", "x", -50, true);
        assert_eq!(c.amount_won_per_month, 0);
        assert_eq!(cost("fee", "연회비", -40).amount_won_per_month, -40);
    }
}
