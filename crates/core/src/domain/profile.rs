use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Profile money amounts are expressed in 만원 (10,000 KRW).
pub const WON_PER_PROFILE_UNIT: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountPriority {
    Savings,
    Salary,
    Starter,
    Travel,
    Cashback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPriority {
    Cashback,
    #[serde(rename = "annualfee")]
    AnnualFee,
    Travel,
    Starter,
    Savings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelLevel {
    None,
    Sometimes,
    Often,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryTransfer {
    Yes,
    No,
}

/// Single-valued summary of the two richer priorities, kept for older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyPriority {
    Cashback,
    Savings,
    Travel,
    Starter,
}

impl LegacyPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cashback => "cashback",
            Self::Savings => "savings",
            Self::Travel => "travel",
            Self::Starter => "starter",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cashback" => Some(Self::Cashback),
            "savings" => Some(Self::Savings),
            "travel" => Some(Self::Travel),
            "starter" => Some(Self::Starter),
            _ => None,
        }
    }
}

impl fmt::Display for LegacyPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AccountPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::Salary => "salary",
            Self::Starter => "starter",
            Self::Travel => "travel",
            Self::Cashback => "cashback",
        }
    }
}

impl CardPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cashback => "cashback",
            Self::AnnualFee => "annualfee",
            Self::Travel => "travel",
            Self::Starter => "starter",
            Self::Savings => "savings",
        }
    }
}

impl TravelLevel {
    pub fn travels(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A validated profile. Built only through
/// [`crate::domain::contract::SimulateRequest::validate_and_into_profile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub age: u32,
    pub income: u32,
    pub monthly_spend: u32,
    pub account_priority: AccountPriority,
    pub card_priority: CardPriority,
    pub salary_transfer: SalaryTransfer,
    pub travel_level: TravelLevel,
    pub account_categories: BTreeSet<String>,
    pub card_categories: BTreeSet<String>,
}

impl Profile {
    pub fn transfers_salary(&self) -> bool {
        matches!(self.salary_transfer, SalaryTransfer::Yes)
    }

    pub fn monthly_spend_won(&self) -> i64 {
        i64::from(self.monthly_spend) * WON_PER_PROFILE_UNIT
    }

    /// Income left after spending, never negative.
    pub fn monthly_surplus_won(&self) -> i64 {
        (i64::from(self.income) - i64::from(self.monthly_spend)).max(0) * WON_PER_PROFILE_UNIT
    }
}
