use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Tag that keeps a catalog entry out of recommendations (it only feeds statistics).
pub const STAT_ONLY_TAG: &str = "stat-only";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Account,
    Card,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "ACCOUNT",
            Self::Card => "CARD",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACCOUNT" => Some(Self::Account),
            "CARD" => Some(Self::Card),
            _ => None,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    ForeignCurrency,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::ForeignCurrency => "foreign_currency",
        }
    }

    /// Accepts the stored spelling as well as the Korean product-kind labels (입출금, 예금, 적금, 외화).
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim().to_lowercase();
        match token.as_str() {
            "checking" => return Some(Self::Checking),
            "savings" => return Some(Self::Savings),
            "foreign_currency" => return Some(Self::ForeignCurrency),
            _ => {}
        }
        if token.contains("외화") {
            Some(Self::ForeignCurrency)
        } else if token.contains("예금") || token.contains("적금") {
            Some(Self::Savings)
        } else if token.contains("입출금") {
            Some(Self::Checking)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Checking => "입출금",
            Self::Savings => "예적금",
            Self::ForeignCurrency => "외화",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProduct {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub kind: AccountKind,
    pub summary: String,
    pub official_url: String,
    pub tags: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    /// Missing rates are read from the summary text ("기본 x%", "최고 y%").
    pub base_rate_percent: Option<f64>,
    pub max_rate_percent: Option<f64>,
    pub monthly_fee_waiver_won: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardProduct {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub summary: String,
    pub official_url: String,
    pub annual_fee_text: String,
    /// Parsed from `annual_fee_text` when absent.
    pub annual_fee_won: Option<i64>,
    pub cashback_rate_percent: f64,
    pub base_reward_rate_percent: f64,
    pub monthly_cashback_cap_won: Option<i64>,
    pub min_monthly_spend_won: i64,
    pub tags: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "product_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Product {
    Account(AccountProduct),
    Card(CardProduct),
}

impl Product {
    pub fn product_type(&self) -> ProductType {
        match self {
            Self::Account(_) => ProductType::Account,
            Self::Card(_) => ProductType::Card,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Account(a) => &a.id,
            Self::Card(c) => &c.id,
        }
    }

    pub fn official_url(&self) -> &str {
        match self {
            Self::Account(a) => &a.official_url,
            Self::Card(c) => &c.official_url,
        }
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        match self {
            Self::Account(a) => &a.tags,
            Self::Card(c) => &c.tags,
        }
    }

    pub fn is_stat_only(&self) -> bool {
        self.tags()
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(STAT_ONLY_TAG))
    }
}

/// One consistent read of the catalog; a run is scored against exactly one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub accounts: Vec<AccountProduct>,
    pub cards: Vec<CardProduct>,
}

impl CatalogSnapshot {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_kind_accepts_korean_labels() {
        assert_eq!(AccountKind::parse("외화예금"), Some(AccountKind::ForeignCurrency));
        assert_eq!(AccountKind::parse("정기적금"), Some(AccountKind::Savings));
        assert_eq!(AccountKind::parse("수시입출금"), Some(AccountKind::Checking));
        assert_eq!(AccountKind::parse("foreign_currency"), Some(AccountKind::ForeignCurrency));
        assert_eq!(AccountKind::parse("brokerage"), None);
    }

    #[test]
    fn product_type_round_trips_through_text() {
        assert_eq!(ProductType::parse(" card "), Some(ProductType::Card));
        assert_eq!(ProductType::Account.to_string(), "ACCOUNT");
        assert_eq!(ProductType::parse("loan"), None);
    }
}
