use crate::domain::product::ProductType;
use crate::domain::profile::{LegacyPriority, Profile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of the scoring rule that produced a [`Reason`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    HighRate,
    MaxRate,
    BaseRate,
    SalaryTransfer,
    Priority,
    TravelOften,
    YoungAge,
    DailySpend,
    CategoryOverlap,
    LowAnnualFee,
    HighAnnualFee,
    AnnualFee,
    AnnualFeePriority,
    BenefitHighlight,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighRate => "high_rate",
            Self::MaxRate => "max_rate",
            Self::BaseRate => "base_rate",
            Self::SalaryTransfer => "salary_transfer",
            Self::Priority => "priority",
            Self::TravelOften => "travel_often",
            Self::YoungAge => "young_age",
            Self::DailySpend => "daily_spend",
            Self::CategoryOverlap => "category_overlap",
            Self::LowAnnualFee => "low_annual_fee",
            Self::HighAnnualFee => "high_annual_fee",
            Self::AnnualFee => "annual_fee",
            Self::AnnualFeePriority => "annual_fee_priority",
            Self::BenefitHighlight => "benefit_highlight",
        }
    }
}

/// One scoring rule that fired. Informational reasons carry 0 points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub rule: RuleId,
    pub points: i32,
    pub text: String,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.points == 0 {
            write!(f, "{}", self.text)
        } else {
            write!(f, "{} ({:+}점)", self.text, self.points)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Received unconditionally.
    Base,
    /// Received only while a qualification condition holds.
    Conditional,
    /// Negative amount (annual fee and similar).
    Cost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitComponent {
    pub key: String,
    pub label: String,
    pub condition: String,
    pub amount_won_per_month: i64,
    pub applied: bool,
    pub kind: ComponentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub rank: u32,
    pub product_type: ProductType,
    pub product_id: String,
    pub provider: String,
    pub name: String,
    pub summary: String,
    pub official_url: String,
    pub score: u32,
    pub reasons: Vec<Reason>,
    pub signals: Vec<String>,
    pub category_keys: Vec<String>,
    pub min_expected_monthly_benefit: i64,
    pub expected_monthly_benefit: i64,
    pub max_expected_monthly_benefit: i64,
    pub benefit_components: Vec<BenefitComponent>,
}

impl RankedItem {
    pub fn label(&self) -> String {
        format!("{} · {}", self.provider, self.name)
    }

    pub fn top_reason(&self) -> Option<&Reason> {
        self.reasons.first()
    }

    pub fn has_signal(&self, signal: &str) -> bool {
        self.signals.iter().any(|s| s == signal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub rank: u32,
    pub account_product_id: String,
    pub account_label: String,
    pub card_product_id: String,
    pub card_label: String,
    pub min_extra_monthly_benefit: i64,
    pub expected_extra_monthly_benefit: i64,
    pub max_extra_monthly_benefit: i64,
    pub account_expected_extra_monthly_benefit: i64,
    pub card_expected_extra_monthly_benefit: i64,
    pub synergy_extra_monthly_benefit: i64,
    pub benefit_components: Vec<BenefitComponent>,
    pub reason: String,
}

/// An immutable record of one simulation. Created once, persisted, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRun {
    pub run_id: Uuid,
    pub priority: LegacyPriority,
    pub expected_net_monthly_profit: i64,
    pub profile: Profile,
    pub accounts: Vec<RankedItem>,
    pub cards: Vec<RankedItem>,
    pub bundles: Vec<Bundle>,
    pub created_at: DateTime<Utc>,
}

impl RecommendationRun {
    pub fn items(&self) -> impl Iterator<Item = &RankedItem> {
        self.accounts.iter().chain(self.cards.iter())
    }

    pub fn item_count(&self) -> usize {
        self.accounts.len() + self.cards.len()
    }

    pub fn find_item(&self, product_type: ProductType, product_id: &str) -> Option<&RankedItem> {
        let list = match product_type {
            ProductType::Account => &self.accounts,
            ProductType::Card => &self.cards,
        };
        list.iter().find(|item| item.product_id == product_id)
    }

    pub fn summary(&self, redirect_count: u64) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            priority: self.priority,
            expected_net_monthly_profit: self.expected_net_monthly_profit,
            top_account: self.accounts.first().map(RankedItem::label),
            top_card: self.cards.first().map(RankedItem::label),
            item_count: self.item_count() as u32,
            redirect_count,
            created_at: self.created_at,
        }
    }
}

/// A history row: the headline numbers of a run plus how often its links were followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub priority: LegacyPriority,
    pub expected_net_monthly_profit: i64,
    pub top_account: Option<String>,
    pub top_card: Option<String>,
    pub item_count: u32,
    pub redirect_count: u64,
    pub created_at: DateTime<Utc>,
}
