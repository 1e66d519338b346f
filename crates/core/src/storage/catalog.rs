use super::{CatalogStore, PgStore};
use crate::domain::product::{AccountKind, AccountProduct, CardProduct, CatalogSnapshot, ProductType};
use anyhow::Context;

const UPSERT_BATCH: usize = 200;

#[derive(sqlx::FromRow)]
struct AccountRow {
    product_id: String,
    provider: String,
    name: String,
    kind: String,
    summary: String,
    official_url: String,
    tags: Vec<String>,
    categories: Vec<String>,
    base_rate_percent: Option<f64>,
    max_rate_percent: Option<f64>,
    monthly_fee_waiver_won: i64,
}

impl TryFrom<AccountRow> for AccountProduct {
    type Error = anyhow::Error;

    fn try_from(row: AccountRow) -> anyhow::Result<Self> {
        let kind = AccountKind::parse(&row.kind)
            .with_context(|| format!("account {}: unknown kind {:?}", row.product_id, row.kind))?;
        Ok(Self {
            id: row.product_id,
            provider: row.provider,
            name: row.name,
            kind,
            summary: row.summary,
            official_url: row.official_url,
            tags: row.tags.into_iter().collect(),
            categories: row.categories.into_iter().collect(),
            base_rate_percent: row.base_rate_percent,
            max_rate_percent: row.max_rate_percent,
            monthly_fee_waiver_won: row.monthly_fee_waiver_won,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CardRow {
    product_id: String,
    provider: String,
    name: String,
    summary: String,
    official_url: String,
    annual_fee_text: String,
    annual_fee_won: Option<i64>,
    cashback_rate_percent: f64,
    base_reward_rate_percent: f64,
    monthly_cashback_cap_won: Option<i64>,
    min_monthly_spend_won: i64,
    tags: Vec<String>,
    categories: Vec<String>,
}

impl From<CardRow> for CardProduct {
    fn from(row: CardRow) -> Self {
        Self {
            id: row.product_id,
            provider: row.provider,
            name: row.name,
            summary: row.summary,
            official_url: row.official_url,
            annual_fee_text: row.annual_fee_text,
            annual_fee_won: row.annual_fee_won,
            cashback_rate_percent: row.cashback_rate_percent,
            base_reward_rate_percent: row.base_reward_rate_percent,
            monthly_cashback_cap_won: row.monthly_cashback_cap_won,
            min_monthly_spend_won: row.min_monthly_spend_won,
            tags: row.tags.into_iter().collect(),
            categories: row.categories.into_iter().collect(),
        }
    }
}

fn to_vec(set: &std::collections::BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

async fn upsert_accounts(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    accounts: &[AccountProduct],
) -> anyhow::Result<u64> {
    let mut affected = 0;
    for (batch_idx, chunk) in accounts.chunks(UPSERT_BATCH).enumerate() {
        let offset = batch_idx * UPSERT_BATCH;
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO account_catalog (product_id, provider, name, kind, summary, official_url, tags, \
             categories, base_rate_percent, max_rate_percent, monthly_fee_waiver_won, position, active) ",
        );
        qb.push_values(chunk.iter().enumerate(), |mut b, (i, a)| {
            b.push_bind(a.id.trim())
                .push_bind(a.provider.trim())
                .push_bind(a.name.trim())
                .push_bind(a.kind.as_str())
                .push_bind(&a.summary)
                .push_bind(&a.official_url)
                .push_bind(to_vec(&a.tags))
                .push_bind(to_vec(&a.categories))
                .push_bind(a.base_rate_percent)
                .push_bind(a.max_rate_percent)
                .push_bind(a.monthly_fee_waiver_won)
                .push_bind((offset + i) as i32)
                .push_bind(true);
        });
        qb.push(
            " ON CONFLICT (product_id) DO UPDATE \
               SET provider = EXCLUDED.provider, name = EXCLUDED.name, kind = EXCLUDED.kind, \
                   summary = EXCLUDED.summary, official_url = EXCLUDED.official_url, tags = EXCLUDED.tags, \
                   categories = EXCLUDED.categories, base_rate_percent = EXCLUDED.base_rate_percent, \
                   max_rate_percent = EXCLUDED.max_rate_percent, \
                   monthly_fee_waiver_won = EXCLUDED.monthly_fee_waiver_won, position = EXCLUDED.position, \
                   active = TRUE, updated_at = now()",
        );
        let res = qb
            .build()
            .persistent(false)
            .execute(&mut **tx)
            .await
            .context("batch upsert account_catalog failed")?;
        affected += res.rows_affected();
        tracing::debug!(batch_idx, batch_size = chunk.len(), "account_catalog batch upsert");
    }
    Ok(affected)
}

async fn upsert_cards(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cards: &[CardProduct],
) -> anyhow::Result<u64> {
    let mut affected = 0;
    for (batch_idx, chunk) in cards.chunks(UPSERT_BATCH).enumerate() {
        let offset = batch_idx * UPSERT_BATCH;
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO card_catalog (product_id, provider, name, summary, official_url, annual_fee_text, \
             annual_fee_won, cashback_rate_percent, base_reward_rate_percent, monthly_cashback_cap_won, \
             min_monthly_spend_won, tags, categories, position, active) ",
        );
        qb.push_values(chunk.iter().enumerate(), |mut b, (i, c)| {
            b.push_bind(c.id.trim())
                .push_bind(c.provider.trim())
                .push_bind(c.name.trim())
                .push_bind(&c.summary)
                .push_bind(&c.official_url)
                .push_bind(&c.annual_fee_text)
                .push_bind(c.annual_fee_won)
                .push_bind(c.cashback_rate_percent)
                .push_bind(c.base_reward_rate_percent)
                .push_bind(c.monthly_cashback_cap_won)
                .push_bind(c.min_monthly_spend_won)
                .push_bind(to_vec(&c.tags))
                .push_bind(to_vec(&c.categories))
                .push_bind((offset + i) as i32)
                .push_bind(true);
        });
        qb.push(
            " ON CONFLICT (product_id) DO UPDATE \
               SET provider = EXCLUDED.provider, name = EXCLUDED.name, summary = EXCLUDED.summary, \
                   official_url = EXCLUDED.official_url, annual_fee_text = EXCLUDED.annual_fee_text, \
                   annual_fee_won = EXCLUDED.annual_fee_won, \
                   cashback_rate_percent = EXCLUDED.cashback_rate_percent, \
                   base_reward_rate_percent = EXCLUDED.base_reward_rate_percent, \
                   monthly_cashback_cap_won = EXCLUDED.monthly_cashback_cap_won, \
                   min_monthly_spend_won = EXCLUDED.min_monthly_spend_won, tags = EXCLUDED.tags, \
                   categories = EXCLUDED.categories, position = EXCLUDED.position, active = TRUE, \
                   updated_at = now()",
        );
        let res = qb
            .build()
            .persistent(false)
            .execute(&mut **tx)
            .await
            .context("batch upsert card_catalog failed")?;
        affected += res.rows_affected();
        tracing::debug!(batch_idx, batch_size = chunk.len(), "card_catalog batch upsert");
    }
    Ok(affected)
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn list_accounts(&self) -> anyhow::Result<Vec<AccountProduct>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            "SELECT product_id, provider, name, kind, summary, official_url, tags, categories, \
                    base_rate_percent, max_rate_percent, monthly_fee_waiver_won \
             FROM account_catalog WHERE active ORDER BY position, product_id",
        )
        .persistent(false)
        .fetch_all(&self.pool)
        .await
        .context("select account_catalog failed")?;

        rows.into_iter().map(AccountProduct::try_from).collect()
    }

    async fn list_cards(&self) -> anyhow::Result<Vec<CardProduct>> {
        let rows: Vec<CardRow> = sqlx::query_as(
            "SELECT product_id, provider, name, summary, official_url, annual_fee_text, annual_fee_won, \
                    cashback_rate_percent, base_reward_rate_percent, monthly_cashback_cap_won, \
                    min_monthly_spend_won, tags, categories \
             FROM card_catalog WHERE active ORDER BY position, product_id",
        )
        .persistent(false)
        .fetch_all(&self.pool)
        .await
        .context("select card_catalog failed")?;

        Ok(rows.into_iter().map(CardProduct::from).collect())
    }

    async fn find_official_url(
        &self,
        product_type: ProductType,
        product_id: &str,
    ) -> anyhow::Result<Option<String>> {
        let sql = match product_type {
            ProductType::Account => "SELECT official_url FROM account_catalog WHERE product_id = $1 AND active",
            ProductType::Card => "SELECT official_url FROM card_catalog WHERE product_id = $1 AND active",
        };
        let url: Option<String> = sqlx::query_scalar(sql)
            .persistent(false)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("lookup official url failed ({product_type} {product_id})"))?;
        Ok(url.filter(|u| !u.trim().is_empty()))
    }

    async fn upsert_catalog(&self, snapshot: &CatalogSnapshot) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;
        let mut affected = upsert_accounts(&mut tx, &snapshot.accounts).await?;
        affected += upsert_cards(&mut tx, &snapshot.cards).await?;
        tx.commit().await.context("commit transaction failed")?;

        tracing::info!(
            accounts_len = snapshot.accounts.len(),
            cards_len = snapshot.cards.len(),
            affected,
            "catalog upserted"
        );
        Ok(affected)
    }
}
