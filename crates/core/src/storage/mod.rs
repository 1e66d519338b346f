pub mod catalog;
pub mod lock;
pub mod memory;
pub mod quality;
pub mod redirects;
pub mod runs;

use crate::domain::analytics::RedirectEvent;
use crate::domain::product::{AccountProduct, CardProduct, CatalogSnapshot, ProductType};
use crate::domain::quality::QualitySnapshot;
use crate::domain::recommendation::RecommendationRun;
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Active catalog products. Every read is a fresh snapshot.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_accounts(&self) -> anyhow::Result<Vec<AccountProduct>>;

    async fn list_cards(&self) -> anyhow::Result<Vec<CardProduct>>;

    async fn find_official_url(
        &self,
        product_type: ProductType,
        product_id: &str,
    ) -> anyhow::Result<Option<String>>;

    /// Inserts or refreshes products by id; returns the number of rows written.
    async fn upsert_catalog(&self, snapshot: &CatalogSnapshot) -> anyhow::Result<u64>;
}

#[async_trait::async_trait]
pub trait RunRepository: Send + Sync {
    async fn save(&self, run: &RecommendationRun) -> anyhow::Result<()>;

    async fn get(&self, run_id: Uuid) -> anyhow::Result<Option<RecommendationRun>>;

    /// Newest first.
    async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<RecommendationRun>>;

    async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RecommendationRun>>;
}

/// Append-only click log.
#[async_trait::async_trait]
pub trait RedirectLog: Send + Sync {
    async fn append(&self, event: &RedirectEvent) -> anyhow::Result<()>;

    async fn list_for(&self, run_id: Uuid) -> anyhow::Result<Vec<RedirectEvent>>;

    async fn count_for(&self, run_id: Uuid) -> anyhow::Result<u64>;

    async fn list_for_runs(&self, run_ids: &[Uuid]) -> anyhow::Result<Vec<RedirectEvent>>;
}

#[async_trait::async_trait]
pub trait QualitySnapshotStore: Send + Sync {
    async fn save_snapshot(&self, snapshot: &QualitySnapshot) -> anyhow::Result<()>;

    async fn latest_snapshot(&self) -> anyhow::Result<Option<QualitySnapshot>>;
}

/// Postgres-backed implementation of every store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}
