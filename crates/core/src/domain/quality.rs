use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedAction {
    Up,
    Down,
    Hold,
}

impl SuggestedAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Hold => "HOLD",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            "HOLD" => Some(Self::Hold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCategoryMetric {
    pub category_key: String,
    pub category_label: String,
    pub recommended_products: u32,
    pub total_redirects: u32,
    pub unique_clicked_products: u32,
    pub ctr_percent: u32,
    pub cvr_percent: u32,
    pub suggested_action: SuggestedAction,
    /// Signed; negative for `DOWN`, zero for `HOLD`.
    pub suggested_weight_delta_percent: i32,
    pub evidence: String,
}

/// Click-through quality over a trailing window of runs. `id` is `None` only for the
/// placeholder returned before anything was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySnapshot {
    pub id: Option<Uuid>,
    pub trigger_source: String,
    pub generated_at: DateTime<Utc>,
    pub window_start_at: DateTime<Utc>,
    pub window_end_at: DateTime<Utc>,
    pub total_runs: u32,
    pub total_recommendation_items: u32,
    pub total_redirects: u32,
    pub unique_clicked_products: u32,
    pub overall_ctr_percent: u32,
    pub overall_cvr_percent: u32,
    pub notes: String,
    pub category_metrics: Vec<QualityCategoryMetric>,
}

impl QualitySnapshot {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            trigger_source: "none".to_string(),
            generated_at: now,
            window_start_at: now,
            window_end_at: now,
            total_runs: 0,
            total_recommendation_items: 0,
            total_redirects: 0,
            unique_clicked_products: 0,
            overall_ctr_percent: 0,
            overall_cvr_percent: 0,
            notes: "아직 저장된 품질 집계가 없습니다.".to_string(),
            category_metrics: Vec::new(),
        }
    }
}
