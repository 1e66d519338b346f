use super::{PgStore, RedirectLog};
use crate::domain::analytics::RedirectEvent;
use crate::domain::product::ProductType;
use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    run_id: Uuid,
    product_type: String,
    product_id: String,
    official_url: String,
    clicked_at: DateTime<Utc>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    referrer: Option<String>,
}

impl TryFrom<EventRow> for RedirectEvent {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> anyhow::Result<Self> {
        let product_type = ProductType::parse(&row.product_type)
            .with_context(|| format!("redirect {}: unknown product type {:?}", row.id, row.product_type))?;
        Ok(Self {
            id: row.id,
            run_id: row.run_id,
            product_type,
            product_id: row.product_id,
            official_url: row.official_url,
            clicked_at: row.clicked_at,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            referrer: row.referrer,
        })
    }
}

const SELECT_EVENTS: &str = "SELECT id, run_id, product_type, product_id, official_url, clicked_at, \
                             user_agent, ip_address, referrer FROM recommendation_redirect_events";

#[async_trait::async_trait]
impl RedirectLog for PgStore {
    async fn append(&self, event: &RedirectEvent) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO recommendation_redirect_events \
             (id, run_id, product_type, product_id, official_url, clicked_at, user_agent, ip_address, referrer) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .persistent(false)
        .bind(event.id)
        .bind(event.run_id)
        .bind(event.product_type.as_str())
        .bind(&event.product_id)
        .bind(&event.official_url)
        .bind(event.clicked_at)
        .bind(&event.user_agent)
        .bind(&event.ip_address)
        .bind(&event.referrer)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert recommendation_redirect_events failed (run_id={})", event.run_id))?;
        Ok(())
    }

    async fn list_for(&self, run_id: Uuid) -> anyhow::Result<Vec<RedirectEvent>> {
        self.list_for_runs(&[run_id]).await
    }

    async fn count_for(&self, run_id: Uuid) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM recommendation_redirect_events WHERE run_id = $1",
        )
        .persistent(false)
        .bind(run_id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("count recommendation_redirect_events failed (run_id={run_id})"))?;
        Ok(count.max(0) as u64)
    }

    async fn list_for_runs(&self, run_ids: &[Uuid]) -> anyhow::Result<Vec<RedirectEvent>> {
        if run_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{SELECT_EVENTS} WHERE run_id = ANY($1) ORDER BY clicked_at, id"
        ))
        .persistent(false)
        .bind(run_ids)
        .fetch_all(&self.pool)
        .await
        .context("select recommendation_redirect_events failed")?;

        rows.into_iter().map(RedirectEvent::try_from).collect()
    }
}
