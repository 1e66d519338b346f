use crate::domain::product::ProductType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request metadata captured alongside a click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
}

/// One followed link. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectEvent {
    pub id: Uuid,
    pub run_id: Uuid,
    pub product_type: ProductType,
    pub product_id: String,
    pub official_url: String,
    pub clicked_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Only products that were clicked at least once.
    #[default]
    ClickedOnly,
    /// Every recommended product, unclicked ones with a zero count.
    IncludeUnclicked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickStat {
    pub product_type: ProductType,
    pub product_id: String,
    pub name: String,
    pub rank: u32,
    pub click_count: u64,
    pub last_clicked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category_key: String,
    pub category_label: String,
    pub recommended_products: u64,
    pub total_redirects: u64,
    pub unique_clicked_products: u64,
    pub click_rate_percent: f64,
    pub conversion_rate_percent: f64,
}

/// Derived on demand from a run and its redirect events; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub run_id: Uuid,
    pub total_redirects: u64,
    pub unique_clicked_products: u64,
    pub unique_click_rate_percent: f64,
    pub top_clicked_products: Vec<ClickStat>,
    pub category_stats: Vec<CategoryStat>,
}
