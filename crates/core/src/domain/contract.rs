use crate::domain::profile::{
    AccountPriority, CardPriority, Profile, SalaryTransfer, TravelLevel,
};
use crate::engine::category;
use crate::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize};

pub const MIN_AGE: i64 = 19;
pub const MAX_AGE: i64 = 100;

/// Wire shape of a simulation request.
///
/// Numeric fields accept numbers or numeric strings; anything malformed reads as 0 and is then
/// validated. `priority` and `categories` are the older single-valued fields and only fill in
/// the account/card specific ones when those are absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulateRequest {
    #[serde(default, deserialize_with = "lenient_number")]
    pub age: i64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub income: i64,
    #[serde(default, alias = "monthlySpend", deserialize_with = "lenient_number")]
    pub monthly_spend: i64,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, alias = "accountPriority")]
    pub account_priority: Option<String>,
    #[serde(default, alias = "cardPriority")]
    pub card_priority: Option<String>,
    #[serde(default, alias = "salaryTransfer")]
    pub salary_transfer: Option<String>,
    #[serde(default, alias = "travelLevel")]
    pub travel_level: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, alias = "accountCategories")]
    pub account_categories: Vec<String>,
    #[serde(default, alias = "cardCategories")]
    pub card_categories: Vec<String>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(parse_lenient_number).unwrap_or(0))
}

fn parse_lenient_number(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => {
            let trimmed = s.trim().replace(',', "");
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.round() as i64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Maps a priority token (English or Korean) onto its canonical spelling.
pub fn normalize_priority_token(raw: &str) -> Option<&'static str> {
    let token = raw.trim().to_lowercase();
    let canonical = match token.as_str() {
        "cashback" | "캐시백" | "할인" | "생활" => "cashback",
        "savings" | "저축" | "금리" | "rate" => "savings",
        "travel" | "여행" | "해외" => "travel",
        "starter" | "초보" | "저비용" => "starter",
        "salary" | "급여" | "주거래" => "salary",
        "annualfee" | "연회비" | "fee" => "annualfee",
        _ => return None,
    };
    Some(canonical)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl SimulateRequest {
    pub fn validate_and_into_profile(self) -> Result<Profile, ValidationError> {
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(ValidationError::new(
                "age",
                format!("must be between {MIN_AGE} and {MAX_AGE} (got {})", self.age),
            ));
        }
        let income = non_negative("income", self.income)?;
        let monthly_spend = non_negative("monthly_spend", self.monthly_spend)?;

        let account_priority = self.resolve_account_priority()?;
        let card_priority = self.resolve_card_priority()?;

        let salary_transfer = match non_blank(&self.salary_transfer).map(str::to_lowercase) {
            Some(v) if v == "yes" => SalaryTransfer::Yes,
            Some(v) if v == "no" => SalaryTransfer::No,
            Some(v) => {
                return Err(ValidationError::new(
                    "salary_transfer",
                    format!("expected yes or no (got {v})"),
                ))
            }
            None => return Err(ValidationError::new("salary_transfer", "is required")),
        };

        let travel_level = match non_blank(&self.travel_level).map(str::to_lowercase) {
            Some(v) if v == "none" => TravelLevel::None,
            Some(v) if v == "sometimes" => TravelLevel::Sometimes,
            Some(v) if v == "often" => TravelLevel::Often,
            Some(v) => {
                return Err(ValidationError::new(
                    "travel_level",
                    format!("expected none, sometimes or often (got {v})"),
                ))
            }
            None => return Err(ValidationError::new("travel_level", "is required")),
        };

        let account_categories = if self.account_categories.is_empty() {
            category::canonicalize_all(&self.categories)
        } else {
            category::canonicalize_all(&self.account_categories)
        };
        let card_categories = if self.card_categories.is_empty() {
            category::canonicalize_all(&self.categories)
        } else {
            category::canonicalize_all(&self.card_categories)
        };

        Ok(Profile {
            age: self.age as u32,
            income,
            monthly_spend,
            account_priority,
            card_priority,
            salary_transfer,
            travel_level,
            account_categories,
            card_categories,
        })
    }

    fn priority_token(
        &self,
        field: &'static str,
        specific: &Option<String>,
    ) -> Result<&'static str, ValidationError> {
        let (field, raw) = match non_blank(specific) {
            Some(raw) => (field, raw),
            None => match non_blank(&self.priority) {
                Some(raw) => ("priority", raw),
                None => return Err(ValidationError::new(field, "is required")),
            },
        };
        normalize_priority_token(raw)
            .ok_or_else(|| ValidationError::new(field, format!("unknown priority: {raw}")))
    }

    fn resolve_account_priority(&self) -> Result<AccountPriority, ValidationError> {
        let token = self.priority_token("account_priority", &self.account_priority)?;
        Ok(match token {
            "savings" => AccountPriority::Savings,
            "salary" => AccountPriority::Salary,
            "travel" => AccountPriority::Travel,
            "cashback" => AccountPriority::Cashback,
            // Accounts carry no annual fee; cost sensitivity reads as the starter focus.
            _ => AccountPriority::Starter,
        })
    }

    fn resolve_card_priority(&self) -> Result<CardPriority, ValidationError> {
        let token = self.priority_token("card_priority", &self.card_priority)?;
        Ok(match token {
            "annualfee" => CardPriority::AnnualFee,
            "travel" => CardPriority::Travel,
            "starter" => CardPriority::Starter,
            "savings" => CardPriority::Savings,
            // salary has no card meaning; it falls back to everyday cashback.
            _ => CardPriority::Cashback,
        })
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::new(field, format!("must not be negative (got {value})")));
    }
    u32::try_from(value).map_err(|_| ValidationError::new(field, format!("too large: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> SimulateRequest {
        SimulateRequest {
            age: 29,
            income: 300,
            monthly_spend: 120,
            account_priority: Some("savings".to_string()),
            card_priority: Some("cashback".to_string()),
            salary_transfer: Some("yes".to_string()),
            travel_level: Some("none".to_string()),
            account_categories: vec!["savings".to_string(), "salary".to_string()],
            card_categories: vec!["online".to_string(), "grocery".to_string()],
            ..SimulateRequest::default()
        }
    }

    #[test]
    fn parses_camel_case_and_string_numbers() {
        let raw = r#"{
            "age": "29",
            "income": 300,
            "monthlySpend": "120",
            "accountPriority": "저축",
            "cardPriority": "연회비",
            "salaryTransfer": "YES",
            "travelLevel": "often",
            "cardCategories": ["쇼핑", "마트", "unknown"]
        }"#;
        let request: SimulateRequest = serde_json::from_str(raw).unwrap();
        let profile = request.validate_and_into_profile().unwrap();

        assert_eq!(profile.age, 29);
        assert_eq!(profile.monthly_spend, 120);
        assert_eq!(profile.account_priority, AccountPriority::Savings);
        assert_eq!(profile.card_priority, CardPriority::AnnualFee);
        assert_eq!(profile.salary_transfer, SalaryTransfer::Yes);
        assert_eq!(profile.travel_level, TravelLevel::Often);
        assert_eq!(
            profile.card_categories.iter().cloned().collect::<Vec<_>>(),
            vec!["grocery".to_string(), "online".to_string()]
        );
    }

    #[test]
    fn malformed_number_reads_as_zero_then_fails_age_range() {
        let raw = r#"{"age": "twenty", "salaryTransfer": "no", "travelLevel": "none", "priority": "cashback"}"#;
        let request: SimulateRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.age, 0);

        let err = request.validate_and_into_profile().unwrap_err();
        assert_eq!(err.field, "age");
    }

    #[test]
    fn rejects_out_of_range_and_unknown_values() {
        let mut too_old = base_request();
        too_old.age = 101;
        assert_eq!(too_old.validate_and_into_profile().unwrap_err().field, "age");

        let mut negative = base_request();
        negative.income = -1;
        assert_eq!(negative.validate_and_into_profile().unwrap_err().field, "income");

        let mut bad_travel = base_request();
        bad_travel.travel_level = Some("always".to_string());
        assert_eq!(
            bad_travel.validate_and_into_profile().unwrap_err().field,
            "travel_level"
        );

        let mut bad_priority = base_request();
        bad_priority.card_priority = Some("lottery".to_string());
        assert_eq!(
            bad_priority.validate_and_into_profile().unwrap_err().field,
            "card_priority"
        );
    }

    #[test]
    fn legacy_priority_fills_missing_fields_with_cross_mapping() {
        let mut annualfee = base_request();
        annualfee.account_priority = None;
        annualfee.card_priority = None;
        annualfee.priority = Some("annualfee".to_string());
        let profile = annualfee.validate_and_into_profile().unwrap();
        assert_eq!(profile.account_priority, AccountPriority::Starter);
        assert_eq!(profile.card_priority, CardPriority::AnnualFee);

        let mut salary = base_request();
        salary.account_priority = None;
        salary.card_priority = None;
        salary.priority = Some("급여".to_string());
        let profile = salary.validate_and_into_profile().unwrap();
        assert_eq!(profile.account_priority, AccountPriority::Salary);
        assert_eq!(profile.card_priority, CardPriority::Cashback);
    }

    #[test]
    fn legacy_categories_fill_empty_scoped_categories() {
        let mut request = base_request();
        request.account_categories.clear();
        request.card_categories.clear();
        request.categories = vec!["travel".to_string(), "카페".to_string()];

        let profile = request.validate_and_into_profile().unwrap();
        assert!(profile.account_categories.contains("travel"));
        assert!(profile.card_categories.contains("cafe"));
    }

    #[test]
    fn missing_priorities_are_rejected() {
        let mut request = base_request();
        request.account_priority = None;
        let err = request.validate_and_into_profile().unwrap_err();
        assert_eq!(err.field, "account_priority");
    }
}
