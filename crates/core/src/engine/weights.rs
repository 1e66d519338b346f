use serde::{Deserialize, Serialize};
use std::fmt;

/// Named preset that scales the baseline weight tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringProfile {
    #[default]
    Balanced,
    Conservative,
    Aggressive,
}

impl ScoringProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Conservative => "conservative",
            Self::Aggressive => "aggressive",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "balanced" => Some(Self::Balanced),
            "conservative" => Some(Self::Conservative),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }
}

impl fmt::Display for ScoringProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn scale(value: i32, factor: f64) -> i32 {
    ((f64::from(value) * factor).round() as i32).max(1)
}

fn scale_won(value: i64, factor: f64) -> i64 {
    ((value as f64 * factor).round() as i64).max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountWeights {
    pub base_score: i32,
    pub high_rate_threshold_percent: f64,
    pub high_rate_bonus: i32,
    pub salary_transfer: i32,
    pub priority_savings: i32,
    pub priority_salary: i32,
    pub priority_starter: i32,
    pub priority_travel: i32,
    pub priority_cashback: i32,
    pub travel_often: i32,
    pub young_age_max: u32,
    pub young_age: i32,
    pub daily_spend_threshold: u32,
    pub daily_spend: i32,
    pub category_overlap: i32,
}

impl Default for AccountWeights {
    fn default() -> Self {
        Self {
            base_score: 45,
            high_rate_threshold_percent: 3.5,
            high_rate_bonus: 8,
            salary_transfer: 30,
            priority_savings: 35,
            priority_salary: 30,
            priority_starter: 24,
            priority_travel: 22,
            priority_cashback: 14,
            travel_often: 28,
            young_age_max: 34,
            young_age: 20,
            daily_spend_threshold: 100,
            daily_spend: 10,
            category_overlap: 6,
        }
    }
}

impl AccountWeights {
    fn scaled(&self, profile: ScoringProfile) -> Self {
        let (priority, travel, salary, young, daily, overlap) = match profile {
            ScoringProfile::Balanced => return self.clone(),
            ScoringProfile::Conservative => (0.85, 0.85, 0.90, 0.90, 0.85, 0.80),
            ScoringProfile::Aggressive => (1.20, 1.20, 1.15, 1.10, 1.15, 1.20),
        };
        Self {
            high_rate_bonus: scale(self.high_rate_bonus, priority),
            salary_transfer: scale(self.salary_transfer, salary),
            priority_savings: scale(self.priority_savings, priority),
            priority_salary: scale(self.priority_salary, priority),
            priority_starter: scale(self.priority_starter, priority),
            priority_travel: scale(self.priority_travel, priority),
            priority_cashback: scale(self.priority_cashback, priority),
            travel_often: scale(self.travel_often, travel),
            young_age: scale(self.young_age, young),
            daily_spend: scale(self.daily_spend, daily),
            category_overlap: scale(self.category_overlap, overlap),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardWeights {
    pub base_score: i32,
    pub category_overlap: i32,
    pub priority_cashback: i32,
    pub priority_travel: i32,
    pub priority_starter: i32,
    pub priority_savings: i32,
    /// Bonus for a free card under the annual-fee focus; a high fee costs half of it.
    pub priority_annual_fee: i32,
    pub travel_often: i32,
    pub daily_spend_threshold: u32,
    pub daily_spend: i32,
    pub low_annual_fee_bonus: i32,
    pub high_annual_fee_penalty: i32,
    pub high_annual_fee_threshold_won: i64,
}

impl Default for CardWeights {
    fn default() -> Self {
        Self {
            base_score: 45,
            category_overlap: 9,
            priority_cashback: 24,
            priority_travel: 22,
            priority_starter: 24,
            priority_savings: 14,
            priority_annual_fee: 26,
            travel_often: 28,
            daily_spend_threshold: 80,
            daily_spend: 10,
            low_annual_fee_bonus: 8,
            high_annual_fee_penalty: 6,
            high_annual_fee_threshold_won: 20_000,
        }
    }
}

impl CardWeights {
    pub fn annual_fee_priority_penalty(&self) -> i32 {
        (self.priority_annual_fee / 2).max(1)
    }

    fn scaled(&self, profile: ScoringProfile) -> Self {
        let (main, low_fee, high_fee_penalty, high_fee_threshold) = match profile {
            ScoringProfile::Balanced => return self.clone(),
            ScoringProfile::Conservative => (0.85, 0.90, 1.20, 0.90),
            ScoringProfile::Aggressive => (1.20, 1.15, 0.80, 1.20),
        };
        Self {
            category_overlap: scale(self.category_overlap, main),
            priority_cashback: scale(self.priority_cashback, main),
            priority_travel: scale(self.priority_travel, main),
            priority_starter: scale(self.priority_starter, main),
            priority_savings: scale(self.priority_savings, main),
            priority_annual_fee: scale(self.priority_annual_fee, main),
            travel_often: scale(self.travel_often, main),
            daily_spend: scale(self.daily_spend, main),
            low_annual_fee_bonus: scale(self.low_annual_fee_bonus, low_fee),
            high_annual_fee_penalty: scale(self.high_annual_fee_penalty, high_fee_penalty),
            high_annual_fee_threshold_won: scale_won(
                self.high_annual_fee_threshold_won,
                high_fee_threshold,
            ),
            ..self.clone()
        }
    }
}

/// Assumptions behind the monetary estimate. Independent of the score weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitAssumptions {
    /// Balance assumed to sit in an account: this many months of surplus.
    pub balance_months: i64,
    pub fx_saving_percent: f64,
    /// Share of monthly spend assumed to go abroad, per travel level.
    pub travel_share_sometimes_percent: f64,
    pub travel_share_often_percent: f64,
    /// Share of monthly spend attributed to each matched card category.
    pub category_share_percent: f64,
    pub category_share_cap_percent: f64,
    pub travel_reward_percent: f64,
}

impl Default for BenefitAssumptions {
    fn default() -> Self {
        Self {
            balance_months: 6,
            fx_saving_percent: 1.0,
            travel_share_sometimes_percent: 5.0,
            travel_share_often_percent: 15.0,
            category_share_percent: 20.0,
            category_share_cap_percent: 60.0,
            travel_reward_percent: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynergyWeights {
    pub same_group_won: i64,
    pub salary_cashback_won: i64,
    pub global_travel_won: i64,
}

impl Default for SynergyWeights {
    fn default() -> Self {
        Self {
            same_group_won: 3_000,
            salary_cashback_won: 2_500,
            global_travel_won: 2_800,
        }
    }
}

/// All tunable numbers of the engine in one place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub profile: ScoringProfile,
    pub account: AccountWeights,
    pub card: CardWeights,
    pub benefit: BenefitAssumptions,
    pub synergy: SynergyWeights,
}

impl ScoringWeights {
    pub fn for_profile(profile: ScoringProfile) -> Self {
        let base = Self::default();
        Self {
            profile,
            account: base.account.scaled(profile),
            card: base.card.scaled(profile),
            ..base
        }
    }
}
