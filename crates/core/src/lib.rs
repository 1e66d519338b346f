pub mod analytics;
pub mod bundle;
pub mod catalog;
pub mod domain;
pub mod engine;
pub mod error;
pub mod quality;
pub mod run;
pub mod service;
pub mod storage;

pub mod config {
    use anyhow::Context;

    use crate::engine::weights::ScoringProfile;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub scoring_profile: ScoringProfile,
        pub analytics_dedup_window_secs: u64,
        pub product_url_overrides_path: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let scoring_profile = match std::env::var("SCORING_PROFILE") {
                Ok(raw) => ScoringProfile::parse(&raw)
                    .with_context(|| format!("unknown SCORING_PROFILE: {raw}"))?,
                Err(_) => ScoringProfile::default(),
            };

            let analytics_dedup_window_secs = std::env::var("ANALYTICS_DEDUP_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                scoring_profile,
                analytics_dedup_window_secs,
                product_url_overrides_path: std::env::var("PRODUCT_URL_OVERRIDES_PATH")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }
    }
}
