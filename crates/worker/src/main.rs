use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finpick_core::catalog::seed;
use finpick_core::config::Settings;
use finpick_core::service::{RecommendationService, ServiceOptions};
use finpick_core::storage::lock::{self, Job};
use finpick_core::storage::PgStore;

#[derive(Debug, Parser)]
#[command(name = "finpick_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the built-in account and card catalog.
    SeedCatalog {
        /// Upsert even when the catalog already has products.
        #[arg(long)]
        force: bool,

        /// Report what would be written without touching the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Recompute per-category click quality over the trailing window and store a snapshot.
    QualityReport {
        /// Label stored with the snapshot.
        #[arg(long, default_value = "worker")]
        trigger: String,

        /// Compute and print the snapshot without storing it.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::SeedCatalog { dry_run: true, .. } => {
            let catalog = seed::catalog();
            tracing::info!(
                dry_run = true,
                accounts_len = catalog.accounts.len(),
                cards_len = catalog.cards.len(),
                "seed catalog (dry-run)"
            );
            Ok(())
        }
        Command::SeedCatalog { force, dry_run: false } => {
            run_locked(&settings, Job::SeedCatalog, |service| async move {
                match service.seed_catalog(force).await? {
                    Some(written) => tracing::info!(written, force, "catalog seeded"),
                    None => tracing::info!("catalog already populated; nothing written"),
                }
                Ok::<(), anyhow::Error>(())
            })
            .await
        }
        Command::QualityReport { trigger, dry_run } => {
            run_locked(&settings, Job::QualityReport, |service| async move {
                let snapshot = service.recompute_quality(&trigger, !dry_run).await?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&snapshot).context("serialize quality snapshot failed")?
                );
                Ok::<(), anyhow::Error>(())
            })
            .await
        }
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "worker job failed");
    }
    result
}

/// Connects, migrates and runs `job` while holding its advisory lock. A held lock means another
/// worker is already on it; that is logged and treated as success.
async fn run_locked<F, Fut>(settings: &Settings, job: Job, f: F) -> anyhow::Result<()>
where
    F: FnOnce(RecommendationService) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    finpick_core::storage::migrate(&pool).await?;

    let acquired = lock::try_acquire_job_lock(&pool, job).await?;
    if !acquired {
        tracing::warn!(?job, "job lock not acquired; another run in progress");
        return Ok(());
    }

    let service = RecommendationService::new(
        Arc::new(PgStore::new(pool.clone())),
        ServiceOptions::from_settings(settings),
    );
    let result = f(service).await;

    if let Err(e) = lock::release_job_lock(&pool, job).await {
        tracing::warn!(?job, error = %e, "failed to release job lock");
    }
    result
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from(["finpick_worker", "quality-report", "--dry-run"]).unwrap();
        match args.command {
            Command::QualityReport { trigger, dry_run } => {
                assert_eq!(trigger, "worker");
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let args = Args::try_parse_from(["finpick_worker", "seed-catalog", "--force"]).unwrap();
        assert!(matches!(
            args.command,
            Command::SeedCatalog {
                force: true,
                dry_run: false
            }
        ));
    }
}
