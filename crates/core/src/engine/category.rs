//! Canonical category keys and the alias/keyword tables that map free text onto them.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};

pub const ONLINE: &str = "online";
pub const GROCERY: &str = "grocery";
pub const TRANSPORT: &str = "transport";
pub const DINING: &str = "dining";
pub const CAFE: &str = "cafe";
pub const SUBSCRIPTION: &str = "subscription";
pub const TRAVEL: &str = "travel";
pub const SALARY: &str = "salary";
pub const SAVINGS: &str = "savings";
pub const STARTER: &str = "starter";
pub const DAILY: &str = "daily";
pub const GLOBAL: &str = "global";

/// Canonical keys with their display labels, in display order.
pub const LABELS: &[(&str, &str)] = &[
    (ONLINE, "온라인쇼핑"),
    (GROCERY, "장보기/마트"),
    (TRANSPORT, "교통/모빌리티"),
    (DINING, "외식"),
    (CAFE, "카페"),
    (SUBSCRIPTION, "구독"),
    (TRAVEL, "여행/해외"),
    (SALARY, "급여/이체"),
    (SAVINGS, "저축/금리"),
    (STARTER, "초보자/저비용"),
    (DAILY, "생활소비"),
    (GLOBAL, "외화/글로벌"),
];

const ALIASES: &[(&str, &[&str])] = &[
    (ONLINE, &["online", "ecommerce", "shopping", "쇼핑", "온라인", "간편결제", "pay", "모바일결제"]),
    (GROCERY, &["grocery", "mart", "supermarket", "장보기", "마트", "식자재"]),
    (TRANSPORT, &["transport", "traffic", "transit", "mobility", "교통", "지하철", "버스", "택시", "주유", "모빌리티"]),
    (DINING, &["dining", "food", "restaurant", "외식", "식당", "배달", "푸드"]),
    (CAFE, &["cafe", "coffee", "카페", "커피"]),
    (SUBSCRIPTION, &["subscription", "sub", "ott", "streaming", "구독", "스트리밍"]),
    (TRAVEL, &["travel", "trip", "airline", "hotel", "여행", "해외", "항공", "숙박"]),
    (SALARY, &["salary", "급여", "월급", "급여이체"]),
    (SAVINGS, &["savings", "saving", "save", "저축", "금리", "예금", "적금"]),
    (STARTER, &["starter", "beginner", "초보", "저비용", "무연회비"]),
    (DAILY, &["daily", "생활", "일상", "cashback", "할인"]),
    (GLOBAL, &["global", "외화", "글로벌"]),
];

/// Keyword rules for free text (product names, summaries). Hangul keywords match anywhere,
/// ASCII ones only as whole words.
const KEYWORDS: &[(&str, &[&str])] = &[
    (ONLINE, &["온라인", "쇼핑", "간편결제", "ecommerce", "shopping", "오픈마켓"]),
    (GROCERY, &["마트", "장보기", "슈퍼", "식자재", "생필품"]),
    (TRANSPORT, &["교통", "지하철", "버스", "택시", "주유", "모빌리티"]),
    (DINING, &["외식", "식당", "배달", "푸드", "레스토랑"]),
    (CAFE, &["카페", "커피"]),
    (SUBSCRIPTION, &["구독", "ott", "스트리밍", "멤버십"]),
    (TRAVEL, &["여행", "해외", "항공", "마일", "숙박"]),
    (SALARY, &["급여", "월급", "급여이체"]),
    (SAVINGS, &["저축", "금리", "적금", "예금", "복리", "우대금리"]),
    (STARTER, &["초보", "무연회비", "저비용", "신규"]),
    (DAILY, &["생활", "일상", "캐시백", "할인"]),
    (GLOBAL, &["외화", "글로벌", "환전"]),
];

const LIFESTYLE: &[&str] = &[ONLINE, GROCERY, TRANSPORT, DINING, CAFE, SUBSCRIPTION, DAILY];

static ALIAS_INDEX: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for (canonical, variants) in ALIASES {
        for variant in *variants {
            index.insert(normalize_token(variant), *canonical);
        }
    }
    index
});

/// Lowercases and keeps only ASCII alphanumerics and Hangul syllables.
pub fn normalize_token(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || ('가'..='힣').contains(c))
        .collect()
}

pub fn label(key: &str) -> &str {
    LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, l)| *l)
        .unwrap_or(key)
}

pub fn labels_of<'a>(keys: impl IntoIterator<Item = &'a String>) -> String {
    keys.into_iter()
        .map(|k| label(k))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonical keys for one raw value: the whole token, each `,|/`-separated part, then keywords.
pub fn canonicalize(raw: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return out;
    }

    if let Some(key) = ALIAS_INDEX.get(&normalize_token(trimmed)) {
        out.insert((*key).to_string());
    }
    for part in trimmed.split(|c: char| c == ',' || c == '|' || c == '/' || c.is_whitespace()) {
        if let Some(key) = ALIAS_INDEX.get(&normalize_token(part)) {
            out.insert((*key).to_string());
        }
    }
    out.extend(extract_from_text(trimmed));
    out
}

pub fn canonicalize_all<S: AsRef<str>>(values: &[S]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for value in values {
        out.extend(canonicalize(value.as_ref()));
    }
    out
}

pub fn extract_from_text(text: &str) -> BTreeSet<String> {
    let normalized = normalize_token(text);
    if normalized.is_empty() {
        return BTreeSet::new();
    }
    let lowered = text.to_lowercase();
    let words: BTreeSet<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let matches = |keyword: &str| {
        if keyword.is_ascii() {
            words.contains(keyword)
        } else {
            normalized.contains(keyword)
        }
    };
    KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| matches(k)))
        .map(|(key, _)| (*key).to_string())
        .collect()
}

pub fn is_known(key: &str) -> bool {
    LABELS.iter().any(|(k, _)| *k == key)
}

pub fn is_lifestyle(key: &str) -> bool {
    LIFESTYLE.contains(&key)
}

pub fn has_lifestyle<'a>(keys: impl IntoIterator<Item = &'a String>) -> bool {
    keys.into_iter().any(|k| is_lifestyle(k))
}
