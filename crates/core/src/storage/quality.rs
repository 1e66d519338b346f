use super::{PgStore, QualitySnapshotStore};
use crate::domain::quality::{QualityCategoryMetric, QualitySnapshot, SuggestedAction};
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    trigger_source: String,
    generated_at: DateTime<Utc>,
    window_start_at: DateTime<Utc>,
    window_end_at: DateTime<Utc>,
    total_runs: i32,
    total_recommendation_items: i32,
    total_redirects: i32,
    unique_clicked_products: i32,
    overall_ctr_percent: i32,
    overall_cvr_percent: i32,
    notes: String,
}

#[derive(sqlx::FromRow)]
struct MetricRow {
    category_key: String,
    category_label: String,
    recommended_products: i32,
    total_redirects: i32,
    unique_clicked_products: i32,
    ctr_percent: i32,
    cvr_percent: i32,
    suggested_action: String,
    suggested_weight_delta_percent: i32,
    evidence: String,
}

fn non_negative(v: i32) -> u32 {
    v.max(0) as u32
}

impl TryFrom<MetricRow> for QualityCategoryMetric {
    type Error = anyhow::Error;

    fn try_from(row: MetricRow) -> anyhow::Result<Self> {
        let suggested_action = SuggestedAction::parse(&row.suggested_action)
            .with_context(|| format!("unknown suggested action {:?}", row.suggested_action))?;
        Ok(Self {
            category_key: row.category_key,
            category_label: row.category_label,
            recommended_products: non_negative(row.recommended_products),
            total_redirects: non_negative(row.total_redirects),
            unique_clicked_products: non_negative(row.unique_clicked_products),
            ctr_percent: non_negative(row.ctr_percent),
            cvr_percent: non_negative(row.cvr_percent),
            suggested_action,
            suggested_weight_delta_percent: row.suggested_weight_delta_percent,
            evidence: row.evidence,
        })
    }
}

#[async_trait::async_trait]
impl QualitySnapshotStore for PgStore {
    async fn save_snapshot(&self, snapshot: &QualitySnapshot) -> anyhow::Result<()> {
        let id = snapshot.id.context("quality snapshot must carry an id")?;
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        sqlx::query(
            "INSERT INTO recommendation_quality_snapshots (id, trigger_source, generated_at, window_start_at, \
             window_end_at, total_runs, total_recommendation_items, total_redirects, unique_clicked_products, \
             overall_ctr_percent, overall_cvr_percent, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .persistent(false)
        .bind(id)
        .bind(&snapshot.trigger_source)
        .bind(snapshot.generated_at)
        .bind(snapshot.window_start_at)
        .bind(snapshot.window_end_at)
        .bind(snapshot.total_runs as i32)
        .bind(snapshot.total_recommendation_items as i32)
        .bind(snapshot.total_redirects as i32)
        .bind(snapshot.unique_clicked_products as i32)
        .bind(snapshot.overall_ctr_percent as i32)
        .bind(snapshot.overall_cvr_percent as i32)
        .bind(&snapshot.notes)
        .execute(&mut *tx)
        .await
        .context("insert recommendation_quality_snapshots failed")?;

        if !snapshot.category_metrics.is_empty() {
            let mut qb = sqlx::QueryBuilder::new(
                "INSERT INTO recommendation_quality_category_metrics (snapshot_id, position, category_key, \
                 category_label, recommended_products, total_redirects, unique_clicked_products, ctr_percent, \
                 cvr_percent, suggested_action, suggested_weight_delta_percent, evidence) ",
            );
            qb.push_values(snapshot.category_metrics.iter().enumerate(), |mut b, (i, m)| {
                b.push_bind(id)
                    .push_bind(i as i32)
                    .push_bind(&m.category_key)
                    .push_bind(&m.category_label)
                    .push_bind(m.recommended_products as i32)
                    .push_bind(m.total_redirects as i32)
                    .push_bind(m.unique_clicked_products as i32)
                    .push_bind(m.ctr_percent as i32)
                    .push_bind(m.cvr_percent as i32)
                    .push_bind(m.suggested_action.as_str())
                    .push_bind(m.suggested_weight_delta_percent)
                    .push_bind(&m.evidence);
            });
            qb.build()
                .persistent(false)
                .execute(&mut *tx)
                .await
                .context("insert recommendation_quality_category_metrics failed")?;
        }

        tx.commit().await.context("commit transaction failed")?;
        Ok(())
    }

    async fn latest_snapshot(&self) -> anyhow::Result<Option<QualitySnapshot>> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            "SELECT id, trigger_source, generated_at, window_start_at, window_end_at, total_runs, \
                    total_recommendation_items, total_redirects, unique_clicked_products, overall_ctr_percent, \
                    overall_cvr_percent, notes \
             FROM recommendation_quality_snapshots ORDER BY generated_at DESC LIMIT 1",
        )
        .persistent(false)
        .fetch_optional(&self.pool)
        .await
        .context("select latest recommendation_quality_snapshots failed")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let metrics: Vec<MetricRow> = sqlx::query_as(
            "SELECT category_key, category_label, recommended_products, total_redirects, \
                    unique_clicked_products, ctr_percent, cvr_percent, suggested_action, \
                    suggested_weight_delta_percent, evidence \
             FROM recommendation_quality_category_metrics WHERE snapshot_id = $1 ORDER BY position",
        )
        .persistent(false)
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .context("select recommendation_quality_category_metrics failed")?;

        Ok(Some(QualitySnapshot {
            id: Some(row.id),
            trigger_source: row.trigger_source,
            generated_at: row.generated_at,
            window_start_at: row.window_start_at,
            window_end_at: row.window_end_at,
            total_runs: non_negative(row.total_runs),
            total_recommendation_items: non_negative(row.total_recommendation_items),
            total_redirects: non_negative(row.total_redirects),
            unique_clicked_products: non_negative(row.unique_clicked_products),
            overall_ctr_percent: non_negative(row.overall_ctr_percent),
            overall_cvr_percent: non_negative(row.overall_cvr_percent),
            notes: row.notes,
            category_metrics: metrics
                .into_iter()
                .map(QualityCategoryMetric::try_from)
                .collect::<anyhow::Result<_>>()?,
        }))
    }
}
