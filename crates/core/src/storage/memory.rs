use super::{CatalogStore, QualitySnapshotStore, RedirectLog, RunRepository};
use crate::domain::analytics::RedirectEvent;
use crate::domain::product::{AccountProduct, CardProduct, CatalogSnapshot, ProductType};
use crate::domain::quality::QualitySnapshot;
use crate::domain::recommendation::RecommendationRun;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local implementation of every store, for tests and runs without `DATABASE_URL`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<CatalogSnapshot>,
    runs: RwLock<Vec<RecommendationRun>>,
    redirects: RwLock<Vec<RedirectEvent>>,
    snapshots: RwLock<Vec<QualitySnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: CatalogSnapshot) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            ..Self::default()
        }
    }
}

fn upsert_by_id<T: Clone>(existing: &mut Vec<T>, incoming: &[T], id: impl Fn(&T) -> &str) -> u64 {
    for item in incoming {
        match existing.iter_mut().find(|e| id(e) == id(item)) {
            Some(slot) => *slot = item.clone(),
            None => existing.push(item.clone()),
        }
    }
    incoming.len() as u64
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn list_accounts(&self) -> anyhow::Result<Vec<AccountProduct>> {
        Ok(self.catalog.read().await.accounts.clone())
    }

    async fn list_cards(&self) -> anyhow::Result<Vec<CardProduct>> {
        Ok(self.catalog.read().await.cards.clone())
    }

    async fn find_official_url(
        &self,
        product_type: ProductType,
        product_id: &str,
    ) -> anyhow::Result<Option<String>> {
        let catalog = self.catalog.read().await;
        let url = match product_type {
            ProductType::Account => catalog
                .accounts
                .iter()
                .find(|a| a.id == product_id)
                .map(|a| a.official_url.clone()),
            ProductType::Card => catalog
                .cards
                .iter()
                .find(|c| c.id == product_id)
                .map(|c| c.official_url.clone()),
        };
        Ok(url.filter(|u| !u.trim().is_empty()))
    }

    async fn upsert_catalog(&self, snapshot: &CatalogSnapshot) -> anyhow::Result<u64> {
        let mut catalog = self.catalog.write().await;
        let accounts = upsert_by_id(&mut catalog.accounts, &snapshot.accounts, |a| a.id.as_str());
        let cards = upsert_by_id(&mut catalog.cards, &snapshot.cards, |c| c.id.as_str());
        Ok(accounts + cards)
    }
}

#[async_trait::async_trait]
impl RunRepository for MemoryStore {
    async fn save(&self, run: &RecommendationRun) -> anyhow::Result<()> {
        let mut runs = self.runs.write().await;
        anyhow::ensure!(
            runs.iter().all(|r| r.run_id != run.run_id),
            "run {} already stored",
            run.run_id
        );
        runs.push(run.clone());
        Ok(())
    }

    async fn get(&self, run_id: Uuid) -> anyhow::Result<Option<RecommendationRun>> {
        Ok(self
            .runs
            .read()
            .await
            .iter()
            .find(|r| r.run_id == run_id)
            .cloned())
    }

    async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<RecommendationRun>> {
        let mut runs = self.runs.read().await.clone();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(limit);
        Ok(runs)
    }

    async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RecommendationRun>> {
        let mut runs: Vec<RecommendationRun> = self
            .runs
            .read()
            .await
            .iter()
            .filter(|r| r.created_at >= start && r.created_at <= end)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }
}

#[async_trait::async_trait]
impl RedirectLog for MemoryStore {
    async fn append(&self, event: &RedirectEvent) -> anyhow::Result<()> {
        self.redirects.write().await.push(event.clone());
        Ok(())
    }

    async fn list_for(&self, run_id: Uuid) -> anyhow::Result<Vec<RedirectEvent>> {
        self.list_for_runs(&[run_id]).await
    }

    async fn count_for(&self, run_id: Uuid) -> anyhow::Result<u64> {
        Ok(self
            .redirects
            .read()
            .await
            .iter()
            .filter(|e| e.run_id == run_id)
            .count() as u64)
    }

    async fn list_for_runs(&self, run_ids: &[Uuid]) -> anyhow::Result<Vec<RedirectEvent>> {
        let mut events: Vec<RedirectEvent> = self
            .redirects
            .read()
            .await
            .iter()
            .filter(|e| run_ids.contains(&e.run_id))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.clicked_at);
        Ok(events)
    }
}

#[async_trait::async_trait]
impl QualitySnapshotStore for MemoryStore {
    async fn save_snapshot(&self, snapshot: &QualitySnapshot) -> anyhow::Result<()> {
        anyhow::ensure!(snapshot.id.is_some(), "quality snapshot must carry an id");
        self.snapshots.write().await.push(snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self) -> anyhow::Result<Option<QualitySnapshot>> {
        Ok(self
            .snapshots
            .read()
            .await
            .iter()
            .max_by_key(|s| s.generated_at)
            .cloned())
    }
}
