use super::{PgStore, RunRepository};
use crate::domain::product::ProductType;
use crate::domain::profile::{LegacyPriority, Profile};
use crate::domain::recommendation::{BenefitComponent, Bundle, RankedItem, Reason, RecommendationRun};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    priority: String,
    expected_net_monthly_profit: i64,
    profile: Json<Profile>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    run_id: Uuid,
    product_type: String,
    rank: i32,
    product_id: String,
    provider: String,
    name: String,
    summary: String,
    official_url: String,
    score: i32,
    reasons: Json<Vec<Reason>>,
    signals: Vec<String>,
    category_keys: Vec<String>,
    min_expected_monthly_benefit: i64,
    expected_monthly_benefit: i64,
    max_expected_monthly_benefit: i64,
    benefit_components: Json<Vec<BenefitComponent>>,
}

impl TryFrom<ItemRow> for RankedItem {
    type Error = anyhow::Error;

    fn try_from(row: ItemRow) -> anyhow::Result<Self> {
        let product_type = ProductType::parse(&row.product_type)
            .with_context(|| format!("run {}: unknown product type {:?}", row.run_id, row.product_type))?;
        Ok(Self {
            rank: u32::try_from(row.rank).context("negative item rank")?,
            product_type,
            product_id: row.product_id,
            provider: row.provider,
            name: row.name,
            summary: row.summary,
            official_url: row.official_url,
            score: u32::try_from(row.score).context("negative item score")?,
            reasons: row.reasons.0,
            signals: row.signals,
            category_keys: row.category_keys,
            min_expected_monthly_benefit: row.min_expected_monthly_benefit,
            expected_monthly_benefit: row.expected_monthly_benefit,
            max_expected_monthly_benefit: row.max_expected_monthly_benefit,
            benefit_components: row.benefit_components.0,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BundleRow {
    run_id: Uuid,
    rank: i32,
    account_product_id: String,
    account_label: String,
    card_product_id: String,
    card_label: String,
    min_extra_monthly_benefit: i64,
    expected_extra_monthly_benefit: i64,
    max_extra_monthly_benefit: i64,
    account_expected_extra_monthly_benefit: i64,
    card_expected_extra_monthly_benefit: i64,
    synergy_extra_monthly_benefit: i64,
    benefit_components: Json<Vec<BenefitComponent>>,
    reason: String,
}

impl From<BundleRow> for Bundle {
    fn from(row: BundleRow) -> Self {
        Self {
            rank: row.rank.max(0) as u32,
            account_product_id: row.account_product_id,
            account_label: row.account_label,
            card_product_id: row.card_product_id,
            card_label: row.card_label,
            min_extra_monthly_benefit: row.min_extra_monthly_benefit,
            expected_extra_monthly_benefit: row.expected_extra_monthly_benefit,
            max_extra_monthly_benefit: row.max_extra_monthly_benefit,
            account_expected_extra_monthly_benefit: row.account_expected_extra_monthly_benefit,
            card_expected_extra_monthly_benefit: row.card_expected_extra_monthly_benefit,
            synergy_extra_monthly_benefit: row.synergy_extra_monthly_benefit,
            benefit_components: row.benefit_components.0,
            reason: row.reason,
        }
    }
}

async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: Uuid,
    item: &RankedItem,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO recommendation_items (run_id, product_type, rank, product_id, provider, name, summary, \
         official_url, score, reasons, signals, category_keys, min_expected_monthly_benefit, \
         expected_monthly_benefit, max_expected_monthly_benefit, benefit_components) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .persistent(false)
    .bind(run_id)
    .bind(item.product_type.as_str())
    .bind(item.rank as i32)
    .bind(&item.product_id)
    .bind(&item.provider)
    .bind(&item.name)
    .bind(&item.summary)
    .bind(&item.official_url)
    .bind(item.score as i32)
    .bind(Json(&item.reasons))
    .bind(&item.signals)
    .bind(&item.category_keys)
    .bind(item.min_expected_monthly_benefit)
    .bind(item.expected_monthly_benefit)
    .bind(item.max_expected_monthly_benefit)
    .bind(Json(&item.benefit_components))
    .execute(&mut **tx)
    .await
    .with_context(|| format!("insert recommendation_items failed ({})", item.product_id))?;
    Ok(())
}

async fn insert_bundle(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: Uuid,
    bundle: &Bundle,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO recommendation_bundles (run_id, rank, account_product_id, account_label, card_product_id, \
         card_label, min_extra_monthly_benefit, expected_extra_monthly_benefit, max_extra_monthly_benefit, \
         account_expected_extra_monthly_benefit, card_expected_extra_monthly_benefit, \
         synergy_extra_monthly_benefit, benefit_components, reason) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .persistent(false)
    .bind(run_id)
    .bind(bundle.rank as i32)
    .bind(&bundle.account_product_id)
    .bind(&bundle.account_label)
    .bind(&bundle.card_product_id)
    .bind(&bundle.card_label)
    .bind(bundle.min_extra_monthly_benefit)
    .bind(bundle.expected_extra_monthly_benefit)
    .bind(bundle.max_extra_monthly_benefit)
    .bind(bundle.account_expected_extra_monthly_benefit)
    .bind(bundle.card_expected_extra_monthly_benefit)
    .bind(bundle.synergy_extra_monthly_benefit)
    .bind(Json(&bundle.benefit_components))
    .bind(&bundle.reason)
    .execute(&mut **tx)
    .await
    .context("insert recommendation_bundles failed")?;
    Ok(())
}

const SELECT_RUNS: &str =
    "SELECT id, priority, expected_net_monthly_profit, profile, created_at FROM recommendation_runs";

impl PgStore {
    /// Attaches items and bundles to run rows, keeping the row order.
    async fn hydrate(&self, rows: Vec<RunRow>) -> anyhow::Result<Vec<RecommendationRun>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let items: Vec<ItemRow> = sqlx::query_as(
            "SELECT run_id, product_type, rank, product_id, provider, name, summary, official_url, score, \
                    reasons, signals, category_keys, min_expected_monthly_benefit, expected_monthly_benefit, \
                    max_expected_monthly_benefit, benefit_components \
             FROM recommendation_items WHERE run_id = ANY($1) ORDER BY run_id, product_type, rank",
        )
        .persistent(false)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .context("select recommendation_items failed")?;

        let bundles: Vec<BundleRow> = sqlx::query_as(
            "SELECT run_id, rank, account_product_id, account_label, card_product_id, card_label, \
                    min_extra_monthly_benefit, expected_extra_monthly_benefit, max_extra_monthly_benefit, \
                    account_expected_extra_monthly_benefit, card_expected_extra_monthly_benefit, \
                    synergy_extra_monthly_benefit, benefit_components, reason \
             FROM recommendation_bundles WHERE run_id = ANY($1) ORDER BY run_id, rank",
        )
        .persistent(false)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .context("select recommendation_bundles failed")?;

        let mut items_by_run: HashMap<Uuid, Vec<RankedItem>> = HashMap::new();
        for row in items {
            let run_id = row.run_id;
            items_by_run
                .entry(run_id)
                .or_default()
                .push(RankedItem::try_from(row)?);
        }
        let mut bundles_by_run: HashMap<Uuid, Vec<Bundle>> = HashMap::new();
        for row in bundles {
            bundles_by_run.entry(row.run_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let priority = LegacyPriority::parse(&row.priority)
                    .with_context(|| format!("run {}: unknown priority {:?}", row.id, row.priority))?;
                let (accounts, cards): (Vec<RankedItem>, Vec<RankedItem>) = items_by_run
                    .remove(&row.id)
                    .unwrap_or_default()
                    .into_iter()
                    .partition(|i| i.product_type == ProductType::Account);
                Ok(RecommendationRun {
                    run_id: row.id,
                    priority,
                    expected_net_monthly_profit: row.expected_net_monthly_profit,
                    profile: row.profile.0,
                    accounts,
                    cards,
                    bundles: bundles_by_run.remove(&row.id).unwrap_or_default(),
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl RunRepository for PgStore {
    async fn save(&self, run: &RecommendationRun) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        sqlx::query(
            "INSERT INTO recommendation_runs (id, priority, expected_net_monthly_profit, profile, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .persistent(false)
        .bind(run.run_id)
        .bind(run.priority.as_str())
        .bind(run.expected_net_monthly_profit)
        .bind(Json(&run.profile))
        .bind(run.created_at)
        .execute(&mut *tx)
        .await
        .context("insert recommendation_runs failed")?;

        for item in run.items() {
            insert_item(&mut tx, run.run_id, item).await?;
        }
        for bundle in &run.bundles {
            insert_bundle(&mut tx, run.run_id, bundle).await?;
        }

        tx.commit().await.context("commit transaction failed")?;
        Ok(())
    }

    async fn get(&self, run_id: Uuid) -> anyhow::Result<Option<RecommendationRun>> {
        let row: Option<RunRow> = sqlx::query_as(&format!("{SELECT_RUNS} WHERE id = $1"))
            .persistent(false)
            .bind(run_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("select recommendation_runs failed (run_id={run_id})"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<RecommendationRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!("{SELECT_RUNS} ORDER BY created_at DESC LIMIT $1"))
            .persistent(false)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .context("select recent recommendation_runs failed")?;
        self.hydrate(rows).await
    }

    async fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<RecommendationRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            "{SELECT_RUNS} WHERE created_at BETWEEN $1 AND $2 ORDER BY created_at DESC"
        ))
        .persistent(false)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("select windowed recommendation_runs failed")?;
        self.hydrate(rows).await
    }
}
