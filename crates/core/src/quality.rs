//! Offline quality loop: per-category click-through over recent runs and a bounded tuning hint.

use crate::domain::analytics::RedirectEvent;
use crate::domain::product::ProductType;
use crate::domain::quality::{QualityCategoryMetric, QualitySnapshot, SuggestedAction};
use crate::domain::recommendation::{RankedItem, RecommendationRun};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityOptions {
    pub window_days: u32,
    /// Categories recommended fewer times than this always get `HOLD`.
    pub min_recommended: u32,
    pub low_ctr_percent: u32,
    pub high_ctr_percent: u32,
    pub low_cvr_percent: u32,
    pub high_cvr_percent: u32,
    pub max_weight_delta_percent: u32,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            window_days: 14,
            min_recommended: 20,
            low_ctr_percent: 5,
            high_ctr_percent: 18,
            low_cvr_percent: 3,
            high_cvr_percent: 12,
            max_weight_delta_percent: 20,
        }
    }
}

fn env_u32(key: &str, slot: &mut u32) {
    if let Ok(s) = std::env::var(key) {
        if let Ok(n) = s.trim().parse::<u32>() {
            *slot = n;
        }
    }
}

impl QualityOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();
        env_u32("QUALITY_WINDOW_DAYS", &mut out.window_days);
        env_u32("QUALITY_MIN_RECOMMENDED", &mut out.min_recommended);
        env_u32("QUALITY_LOW_CTR", &mut out.low_ctr_percent);
        env_u32("QUALITY_HIGH_CTR", &mut out.high_ctr_percent);
        env_u32("QUALITY_LOW_CVR", &mut out.low_cvr_percent);
        env_u32("QUALITY_HIGH_CVR", &mut out.high_cvr_percent);
        env_u32("QUALITY_MAX_WEIGHT_DELTA", &mut out.max_weight_delta_percent);
        out
    }

    /// `[end - window_days, end]`, at least one day wide.
    pub fn window_ending(&self, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (end - Duration::days(i64::from(self.window_days.max(1))), end)
    }
}

pub fn suggest(recommended: u32, ctr: u32, cvr: u32, opts: &QualityOptions) -> (SuggestedAction, i32) {
    if recommended < opts.min_recommended {
        return (SuggestedAction::Hold, 0);
    }

    let bounded = |gap: i64| -> i32 {
        let delta = (gap / 2).max(5).min(i64::from(opts.max_weight_delta_percent));
        delta as i32
    };
    let (ctr, cvr) = (i64::from(ctr), i64::from(cvr));
    let (low_ctr, high_ctr) = (i64::from(opts.low_ctr_percent), i64::from(opts.high_ctr_percent));
    let (low_cvr, high_cvr) = (i64::from(opts.low_cvr_percent), i64::from(opts.high_cvr_percent));

    if ctr >= high_ctr && cvr >= high_cvr {
        let gap = (ctr - high_ctr) + (cvr - high_cvr);
        return (SuggestedAction::Up, bounded(gap));
    }
    if ctr <= low_ctr || cvr <= low_cvr {
        let gap = (low_ctr - ctr).max(0) + (low_cvr - cvr).max(0);
        return (SuggestedAction::Down, -bounded(gap));
    }
    (SuggestedAction::Hold, 0)
}

fn contains_any(signals: &BTreeSet<&str>, candidates: &[&str]) -> bool {
    candidates.iter().any(|c| signals.contains(c))
}

/// Coarse bucket used for tuning. Each item lands in exactly one.
pub fn classify(item: &RankedItem) -> &'static str {
    let signals: BTreeSet<&str> = item
        .signals
        .iter()
        .chain(item.category_keys.iter())
        .map(String::as_str)
        .collect();

    match item.product_type {
        ProductType::Account => {
            if contains_any(&signals, &["savings", "goal", "auto"]) {
                "savings"
            } else if contains_any(&signals, &["travel", "global", "fx"]) {
                "travel"
            } else if contains_any(&signals, &["starter", "young", "low-fee"]) {
                "starter"
            } else if contains_any(&signals, &["salary", "daily", "cashback"]) {
                "salary"
            } else {
                "other"
            }
        }
        ProductType::Card => {
            if contains_any(&signals, &["travel", "mileage"]) {
                "travel"
            } else if contains_any(&signals, &["starter", "no-fee"]) {
                "starter"
            } else if contains_any(&signals, &["online", "subscription"]) {
                "online"
            } else if contains_any(&signals, &["grocery", "transport", "dining", "cafe", "daily"]) {
                "lifestyle"
            } else {
                "other"
            }
        }
    }
}

pub fn bucket_label(key: &str) -> &'static str {
    match key {
        "savings" => "저축/금리",
        "salary" => "급여/생활비",
        "travel" => "여행/해외",
        "online" => "온라인/구독",
        "lifestyle" => "생활소비",
        "starter" => "초보자/저비용",
        _ => "기타",
    }
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).round() as u32
}

#[derive(Default)]
struct Bucket {
    recommended: u32,
    redirects: u32,
    clicked: BTreeSet<(ProductType, String)>,
}

/// Builds a snapshot from the runs created inside the window and their redirect events.
/// Events for products that were not part of their run are ignored.
pub fn compute(
    runs: &[RecommendationRun],
    events: &[RedirectEvent],
    window: (DateTime<Utc>, DateTime<Utc>),
    trigger_source: &str,
    opts: &QualityOptions,
) -> QualitySnapshot {
    let (window_start_at, window_end_at) = window;
    let trigger_source = match trigger_source.trim() {
        "" => "manual".to_string(),
        s => s.to_string(),
    };

    let mut snapshot = QualitySnapshot {
        id: Some(Uuid::new_v4()),
        trigger_source,
        generated_at: window_end_at,
        window_start_at,
        window_end_at,
        ..QualitySnapshot::empty(window_end_at)
    };

    if runs.is_empty() {
        snapshot.notes = "분석 기간 내 추천 실행 이력이 없습니다.".to_string();
        return snapshot;
    }

    let mut buckets: HashMap<&'static str, Bucket> = HashMap::new();
    let mut bucket_of: HashMap<(Uuid, ProductType, &str), &'static str> = HashMap::new();
    let mut total_items = 0u32;

    for run in runs {
        for item in run.items() {
            let key = classify(item);
            bucket_of.insert((run.run_id, item.product_type, item.product_id.as_str()), key);
            buckets.entry(key).or_default().recommended += 1;
            total_items += 1;
        }
    }

    let mut total_redirects = 0u32;
    let mut unique_clicked: BTreeSet<(ProductType, String)> = BTreeSet::new();
    for e in events {
        let Some(key) = bucket_of.get(&(e.run_id, e.product_type, e.product_id.as_str())) else {
            continue;
        };
        let bucket = buckets.entry(*key).or_default();
        bucket.redirects += 1;
        bucket.clicked.insert((e.product_type, e.product_id.clone()));
        total_redirects += 1;
        unique_clicked.insert((e.product_type, e.product_id.clone()));
    }

    let mut metrics: Vec<QualityCategoryMetric> = buckets
        .into_iter()
        .map(|(key, b)| {
            let unique = b.clicked.len() as u32;
            let ctr = percent(b.redirects, b.recommended);
            let cvr = percent(unique, b.recommended);
            let (action, delta) = suggest(b.recommended, ctr, cvr, opts);
            QualityCategoryMetric {
                category_key: key.to_string(),
                category_label: bucket_label(key).to_string(),
                recommended_products: b.recommended,
                total_redirects: b.redirects,
                unique_clicked_products: unique,
                ctr_percent: ctr,
                cvr_percent: cvr,
                suggested_action: action,
                suggested_weight_delta_percent: delta,
                evidence: format!(
                    "추천 {}건, 클릭 {}건(CTR {ctr}%), 고유 클릭 {unique}건(CVR {cvr}%)",
                    b.recommended, b.redirects
                ),
            }
        })
        .collect();
    metrics.sort_by(|a, b| {
        b.total_redirects
            .cmp(&a.total_redirects)
            .then_with(|| b.recommended_products.cmp(&a.recommended_products))
            .then_with(|| a.category_key.cmp(&b.category_key))
    });

    let unique = unique_clicked.len() as u32;
    snapshot.total_runs = runs.len() as u32;
    snapshot.total_recommendation_items = total_items;
    snapshot.total_redirects = total_redirects;
    snapshot.unique_clicked_products = unique;
    snapshot.overall_ctr_percent = percent(total_redirects, total_items);
    snapshot.overall_cvr_percent = percent(unique, total_items);
    snapshot.notes = format!(
        "최근 {}일 추천 {}건 기준 자동 집계",
        opts.window_days,
        runs.len()
    );
    snapshot.category_metrics = metrics;
    snapshot
}
