//! Reading rates and fees out of catalog text.

use once_cell::sync::Lazy;
use regex::Regex;

static MAX_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"최고\s*([0-9]+(?:\.[0-9]+)?)\s*%").expect("max rate regex"));
static BASE_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"기본\s*([0-9]+(?:\.[0-9]+)?)\s*%").expect("base rate regex"));
// "1.2만원", "1만2천원", "5천원"
static FEE_MAN_WON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([0-9]+(?:\.[0-9]+)?)\s*만\s*)?(?:([0-9]+)\s*천\s*)?원")
        .expect("man-won fee regex")
});
static FEE_WON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,3}(?:,[0-9]{3})+|[0-9]{4,7})\s*원?").expect("won fee regex")
});
// A bare "0원" that is not the tail of a larger amount such as "15,000원".
static FREE_ZERO_WON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9,.])0\s*원").expect("zero fee regex"));

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateInfo {
    pub max_rate_percent: Option<f64>,
    pub base_rate_percent: Option<f64>,
}

pub fn extract_rates(summary: &str) -> RateInfo {
    RateInfo {
        max_rate_percent: capture_f64(&MAX_RATE, summary),
        base_rate_percent: capture_f64(&BASE_RATE, summary),
    }
}

fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnualFee {
    /// Free, waived, or not stated.
    pub low_fee: bool,
    pub estimated_won: Option<i64>,
}

pub fn parse_annual_fee(text: &str) -> AnnualFee {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return AnnualFee {
            low_fee: true,
            estimated_won: None,
        };
    }

    if ["없음", "면제", "무료", "무연회비"]
        .iter()
        .any(|k| text.contains(k))
        || FREE_ZERO_WON.is_match(&text)
    {
        return AnnualFee {
            low_fee: true,
            estimated_won: Some(0),
        };
    }

    if let Some(won) = korean_unit_won(&text) {
        return AnnualFee {
            low_fee: won <= 0,
            estimated_won: Some(won),
        };
    }

    if let Some(won) = FEE_WON
        .captures(&text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<i64>().ok())
    {
        return AnnualFee {
            low_fee: won <= 0,
            estimated_won: Some(won),
        };
    }

    AnnualFee {
        low_fee: false,
        estimated_won: None,
    }
}

/// Amounts spelled with 만/천 units; `None` when neither unit appears.
fn korean_unit_won(text: &str) -> Option<i64> {
    FEE_MAN_WON.captures_iter(text).find_map(|c| {
        let man = c.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
        let cheon = c.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        if man.is_none() && cheon.is_none() {
            return None;
        }
        let won = man.unwrap_or(0.0) * 10_000.0 + cheon.unwrap_or(0.0) * 1_000.0;
        Some(won.round() as i64)
    })
}

/// Display form of a fee text: blank reads as unknown, the free spellings collapse to one.
pub fn normalize_annual_fee_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "연회비 정보 없음".to_string();
    }
    match trimmed.to_lowercase().as_str() {
        "없음" | "면제" | "무료" | "0원" | "무연회비" => "연회비 없음".to_string(),
        _ => trimmed.to_string(),
    }
}

/// `3.0` → "3", `2.15` → "2.15", `2.10` → "2.1".
pub fn format_percent(value: f64) -> String {
    if (value - value.round()).abs() < 1e-5 {
        return format!("{value:.0}");
    }
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_won(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}원")
    } else {
        format!("{grouped}원")
    }
}
