use crate::analytics::{self, AnalyticsOptions};
use crate::catalog::{self, seed, UrlOverrides};
use crate::config::Settings;
use crate::domain::analytics::{AnalyticsReport, RedirectContext, RedirectEvent, ReportMode};
use crate::domain::contract::SimulateRequest;
use crate::domain::product::{CatalogSnapshot, ProductType};
use crate::domain::quality::QualitySnapshot;
use crate::domain::recommendation::{RecommendationRun, RunSummary};
use crate::engine::weights::ScoringWeights;
use crate::error::{ServiceError, ServiceResult};
use crate::quality::{self, QualityOptions};
use crate::run::build_run;
use crate::storage::{CatalogStore, QualitySnapshotStore, RedirectLog, RunRepository};
use anyhow::Context;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 30;

/// Tunables the service reads once at startup.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub weights: ScoringWeights,
    pub overrides: UrlOverrides,
    pub dedup_window_secs: u64,
    pub quality: QualityOptions,
}

impl ServiceOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let overrides = settings
            .product_url_overrides_path
            .as_deref()
            .map(|p| UrlOverrides::load(Path::new(p)))
            .unwrap_or_default();

        Self {
            weights: ScoringWeights::for_profile(settings.scoring_profile),
            overrides,
            dedup_window_secs: settings.analytics_dedup_window_secs,
            quality: QualityOptions::from_env(),
        }
    }
}

/// Everything the HTTP surface and the worker do, over pluggable stores.
#[derive(Clone)]
pub struct RecommendationService {
    catalog: Arc<dyn CatalogStore>,
    runs: Arc<dyn RunRepository>,
    redirects: Arc<dyn RedirectLog>,
    snapshots: Arc<dyn QualitySnapshotStore>,
    options: Arc<ServiceOptions>,
}

impl RecommendationService {
    pub fn new<S>(store: Arc<S>, options: ServiceOptions) -> Self
    where
        S: CatalogStore + RunRepository + RedirectLog + QualitySnapshotStore + 'static,
    {
        Self {
            catalog: store.clone(),
            runs: store.clone(),
            redirects: store.clone(),
            snapshots: store,
            options: Arc::new(options),
        }
    }

    pub fn from_parts(
        catalog: Arc<dyn CatalogStore>,
        runs: Arc<dyn RunRepository>,
        redirects: Arc<dyn RedirectLog>,
        snapshots: Arc<dyn QualitySnapshotStore>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            catalog,
            runs,
            redirects,
            snapshots,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    async fn catalog_snapshot(&self) -> ServiceResult<CatalogSnapshot> {
        let (accounts, cards) = tokio::try_join!(self.catalog.list_accounts(), self.catalog.list_cards())
            .map_err(ServiceError::upstream)?;
        Ok(catalog::apply_overrides(
            CatalogSnapshot { accounts, cards },
            &self.options.overrides,
        ))
    }

    /// Validates the request, scores one catalog snapshot and stores the run.
    pub async fn simulate(&self, request: SimulateRequest) -> ServiceResult<RecommendationRun> {
        let profile = request.validate_and_into_profile()?;
        let snapshot = self.catalog_snapshot().await?;
        if snapshot.is_empty() {
            tracing::warn!("catalog is empty; run will carry no recommendations");
        }

        let run = build_run(
            profile,
            &snapshot,
            &self.options.weights,
            Uuid::new_v4(),
            Utc::now(),
        );
        self.runs.save(&run).await.map_err(ServiceError::upstream)?;

        tracing::info!(
            run_id = %run.run_id,
            priority = run.priority.as_str(),
            accounts_len = run.accounts.len(),
            cards_len = run.cards.len(),
            bundles_len = run.bundles.len(),
            expected_net_monthly_profit = run.expected_net_monthly_profit,
            "recommendation run stored"
        );
        Ok(run)
    }

    pub async fn get_run(&self, run_id: Uuid) -> ServiceResult<RecommendationRun> {
        self.runs
            .get(run_id)
            .await
            .map_err(ServiceError::upstream)?
            .ok_or_else(|| ServiceError::NotFound(format!("recommendation run {run_id}")))
    }

    /// Newest runs first. `limit` defaults to 10 and is clamped to 1..=30.
    pub async fn recent_runs(&self, limit: Option<usize>) -> ServiceResult<Vec<RunSummary>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let runs = self
            .runs
            .list_recent(limit)
            .await
            .map_err(ServiceError::upstream)?;

        let mut out = Vec::with_capacity(runs.len());
        for run in &runs {
            let redirects = self
                .redirects
                .count_for(run.run_id)
                .await
                .map_err(ServiceError::upstream)?;
            out.push(run.summary(redirects));
        }
        Ok(out)
    }

    pub async fn get_analytics(&self, run_id: Uuid, mode: ReportMode) -> ServiceResult<AnalyticsReport> {
        let run = self.get_run(run_id).await?;
        let events = self
            .redirects
            .list_for(run_id)
            .await
            .map_err(ServiceError::upstream)?;

        let options = AnalyticsOptions {
            mode,
            dedup_window_secs: self.options.dedup_window_secs,
        };
        Ok(analytics::aggregate(&run, &events, &options))
    }

    /// Logs the click and returns the official page to send the user to.
    pub async fn record_redirect(
        &self,
        run_id: Uuid,
        product_type: ProductType,
        product_id: &str,
        context: RedirectContext,
    ) -> ServiceResult<String> {
        let run = self.get_run(run_id).await?;
        let item = run.find_item(product_type, product_id).ok_or_else(|| {
            ServiceError::NotFound(format!("{product_type} {product_id} is not part of run {run_id}"))
        })?;

        let catalog_url = self
            .catalog
            .find_official_url(product_type, product_id)
            .await
            .map_err(ServiceError::upstream)?
            .unwrap_or_else(|| item.official_url.clone());
        let url = self.options.overrides.resolve(
            &item.product_id,
            product_type,
            &item.provider,
            &item.name,
            &catalog_url,
        );

        let event = RedirectEvent {
            id: Uuid::new_v4(),
            run_id,
            product_type,
            product_id: item.product_id.clone(),
            official_url: url.clone(),
            clicked_at: Utc::now(),
            user_agent: context.user_agent,
            ip_address: context.ip_address,
            referrer: context.referrer,
        };
        self.redirects
            .append(&event)
            .await
            .map_err(ServiceError::upstream)?;

        tracing::info!(%run_id, %product_type, product_id, "redirect recorded");
        Ok(url)
    }

    /// Latest stored quality snapshot, or an empty placeholder before the first one.
    pub async fn latest_quality(&self) -> ServiceResult<QualitySnapshot> {
        let latest = self
            .snapshots
            .latest_snapshot()
            .await
            .map_err(ServiceError::upstream)?;
        Ok(latest.unwrap_or_else(|| QualitySnapshot::empty(Utc::now())))
    }

    /// Recomputes the quality snapshot over the trailing window ending now. With `persist` unset
    /// the snapshot is returned but not stored.
    pub async fn recompute_quality(&self, trigger_source: &str, persist: bool) -> anyhow::Result<QualitySnapshot> {
        let opts = &self.options.quality;
        let window = opts.window_ending(Utc::now());

        let runs = self
            .runs
            .list_created_between(window.0, window.1)
            .await
            .context("load runs for quality window failed")?;
        let run_ids: Vec<Uuid> = runs.iter().map(|r| r.run_id).collect();
        let events = self
            .redirects
            .list_for_runs(&run_ids)
            .await
            .context("load redirects for quality window failed")?;

        let snapshot = quality::compute(&runs, &events, window, trigger_source, opts);
        if persist {
            self.snapshots
                .save_snapshot(&snapshot)
                .await
                .context("store quality snapshot failed")?;
        }

        tracing::info!(
            trigger_source = %snapshot.trigger_source,
            total_runs = snapshot.total_runs,
            total_redirects = snapshot.total_redirects,
            categories = snapshot.category_metrics.len(),
            persist,
            "quality snapshot computed"
        );
        Ok(snapshot)
    }

    /// Writes the built-in catalog when the store has no products (or always, with `force`).
    /// Returns the number of rows written, `None` when seeding was skipped.
    pub async fn seed_catalog(&self, force: bool) -> anyhow::Result<Option<u64>> {
        if !force {
            let (accounts, cards) =
                tokio::try_join!(self.catalog.list_accounts(), self.catalog.list_cards())
                    .context("read catalog before seeding failed")?;
            if !accounts.is_empty() || !cards.is_empty() {
                tracing::info!(
                    accounts_len = accounts.len(),
                    cards_len = cards.len(),
                    "catalog already populated; skipping seed"
                );
                return Ok(None);
            }
        }
        let written = self.catalog.upsert_catalog(&seed::catalog()).await?;
        Ok(Some(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::{AccountProduct, CardProduct};
    use crate::storage::MemoryStore;

    fn request() -> SimulateRequest {
        SimulateRequest {
            age: 29,
            income: 300,
            monthly_spend: 120,
            account_priority: Some("savings".to_string()),
            card_priority: Some("cashback".to_string()),
            salary_transfer: Some("yes".to_string()),
            travel_level: Some("none".to_string()),
            card_categories: vec!["online".to_string(), "grocery".to_string()],
            ..SimulateRequest::default()
        }
    }

    fn seeded() -> (Arc<MemoryStore>, RecommendationService) {
        let store = Arc::new(MemoryStore::with_catalog(seed::catalog()));
        let service = RecommendationService::new(store.clone(), ServiceOptions::default());
        (store, service)
    }

    struct FailingCatalog;

    #[async_trait::async_trait]
    impl CatalogStore for FailingCatalog {
        async fn list_accounts(&self) -> anyhow::Result<Vec<AccountProduct>> {
            anyhow::bail!("connection refused")
        }

        async fn list_cards(&self) -> anyhow::Result<Vec<CardProduct>> {
            anyhow::bail!("connection refused")
        }

        async fn find_official_url(&self, _: ProductType, _: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("connection refused")
        }

        async fn upsert_catalog(&self, _: &CatalogSnapshot) -> anyhow::Result<u64> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn simulate_stores_the_run() {
        let (_, service) = seeded();
        let run = service.simulate(request()).await.unwrap();

        assert!(!run.accounts.is_empty());
        assert!(!run.cards.is_empty());
        assert_eq!(service.get_run(run.run_id).await.unwrap(), run);
    }

    #[tokio::test]
    async fn simulate_twice_gives_new_ids_and_same_scores() {
        let (_, service) = seeded();
        let a = service.simulate(request()).await.unwrap();
        let b = service.simulate(request()).await.unwrap();

        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.accounts, b.accounts);
        assert_eq!(a.cards, b.cards);
        assert_eq!(a.bundles, b.bundles);
    }

    #[tokio::test]
    async fn invalid_profile_is_a_validation_error() {
        let (store, service) = seeded();
        let err = service
            .simulate(SimulateRequest {
                age: 12,
                ..request()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_catalog_is_a_valid_empty_run() {
        let service = RecommendationService::new(Arc::new(MemoryStore::new()), ServiceOptions::default());
        let run = service.simulate(request()).await.unwrap();
        assert!(run.accounts.is_empty());
        assert!(run.bundles.is_empty());
    }

    #[tokio::test]
    async fn catalog_failure_is_upstream_unavailable_not_an_empty_run() {
        let store = Arc::new(MemoryStore::new());
        let service = RecommendationService::from_parts(
            Arc::new(FailingCatalog),
            store.clone(),
            store.clone(),
            store.clone(),
            ServiceOptions::default(),
        );

        let err = service.simulate(request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UpstreamUnavailable(_)));
        assert!(store.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_run_is_not_found() {
        let (_, service) = seeded();
        let err = service.get_run(Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
        let err = service
            .get_analytics(Uuid::new_v4(), ReportMode::ClickedOnly)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn redirect_logs_and_feeds_analytics() {
        let (store, service) = seeded();
        let run = service.simulate(request()).await.unwrap();
        let card = run.cards[0].clone();

        let context = RedirectContext {
            user_agent: Some("test-agent".to_string()),
            ip_address: Some("203.0.113.7".to_string()),
            referrer: None,
        };
        let url = service
            .record_redirect(run.run_id, ProductType::Card, &card.product_id, context)
            .await
            .unwrap();
        assert_eq!(url, card.official_url);

        let events = store.list_for(run.run_id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ip_address.as_deref(), Some("203.0.113.7"));

        let report = service
            .get_analytics(run.run_id, ReportMode::ClickedOnly)
            .await
            .unwrap();
        assert_eq!(report.total_redirects, 1);
        assert_eq!(report.top_clicked_products[0].product_id, card.product_id);
    }

    #[tokio::test]
    async fn redirect_for_product_outside_run_is_not_found() {
        let (store, service) = seeded();
        let run = service.simulate(request()).await.unwrap();

        let err = service
            .record_redirect(run.run_id, ProductType::Card, "no-such-card", RedirectContext::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.count_for(run.run_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn redirect_prefers_override_over_catalog_url() {
        let (store, plain) = seeded();
        let run = plain.simulate(request()).await.unwrap();
        let card = run.cards.first().expect("run recommends a card").clone();

        let options = ServiceOptions {
            overrides: UrlOverrides::parse(&format!("{}=cards.example.com/landing", card.product_id)),
            ..ServiceOptions::default()
        };
        let service = RecommendationService::new(store.clone(), options);
        assert!(run.find_item(ProductType::Card, &card.product_id).is_some());

        let url = service
            .record_redirect(run.run_id, ProductType::Card, &card.product_id, RedirectContext::default())
            .await
            .unwrap();
        assert_eq!(url, "https://cards.example.com/landing");
        assert_ne!(url, card.official_url);
        assert_eq!(store.count_for(run.run_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn history_is_clamped_and_counts_redirects() {
        let (_, service) = seeded();
        let first = service.simulate(request()).await.unwrap();
        service.simulate(request()).await.unwrap();
        let item = first.accounts[0].clone();
        service
            .record_redirect(first.run_id, ProductType::Account, &item.product_id, RedirectContext::default())
            .await
            .unwrap();

        let one = service.recent_runs(Some(0)).await.unwrap();
        assert_eq!(one.len(), 1);

        let all = service.recent_runs(Some(500)).await.unwrap();
        assert_eq!(all.len(), 2);
        let summary = all.iter().find(|s| s.run_id == first.run_id).unwrap();
        assert_eq!(summary.redirect_count, 1);
    }

    #[tokio::test]
    async fn quality_latest_falls_back_to_placeholder_then_stored() {
        let (_, service) = seeded();
        let placeholder = service.latest_quality().await.unwrap();
        assert_eq!(placeholder.id, None);
        assert_eq!(placeholder.trigger_source, "none");

        let run = service.simulate(request()).await.unwrap();
        let card = run.cards[0].clone();
        service
            .record_redirect(run.run_id, ProductType::Card, &card.product_id, RedirectContext::default())
            .await
            .unwrap();

        let dry = service.recompute_quality("test", false).await.unwrap();
        assert_eq!(dry.total_runs, 1);
        assert_eq!(service.latest_quality().await.unwrap().id, None);

        let stored = service.recompute_quality("test", true).await.unwrap();
        let latest = service.latest_quality().await.unwrap();
        assert_eq!(latest.id, stored.id);
        assert_eq!(latest.total_redirects, 1);
    }

    #[tokio::test]
    async fn seed_catalog_only_when_empty_unless_forced() {
        let store = Arc::new(MemoryStore::new());
        let service = RecommendationService::new(store.clone(), ServiceOptions::default());

        let written = service.seed_catalog(false).await.unwrap();
        assert_eq!(written, Some((seed::accounts().len() + seed::cards().len()) as u64));
        assert_eq!(service.seed_catalog(false).await.unwrap(), None);
        assert!(service.seed_catalog(true).await.unwrap().is_some());
        assert_eq!(store.list_accounts().await.unwrap().len(), seed::accounts().len());
    }
}
