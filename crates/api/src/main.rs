mod routes;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finpick_core::catalog::seed;
use finpick_core::config::Settings;
use finpick_core::service::{RecommendationService, ServiceOptions};
use finpick_core::storage::{MemoryStore, PgStore};

use routes::AppState;

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

    let options = ServiceOptions::from_settings(&settings);
    tracing::info!(
        scoring_profile = %settings.scoring_profile,
        url_overrides = options.overrides.len(),
        dedup_window_secs = options.dedup_window_secs,
        "service options loaded"
    );

    let service = build_service(&settings, options).await;
    let app = routes::router(AppState { service });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Without `DATABASE_URL` the API serves from process memory over the built-in catalog. With
/// one it must reach Postgres; otherwise it starts in degraded mode and answers 503.
async fn build_service(settings: &Settings, options: ServiceOptions) -> Option<RecommendationService> {
    let Some(db_url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL missing; serving from in-memory stores with the built-in catalog");
        let store = Arc::new(MemoryStore::with_catalog(seed::catalog()));
        return Some(RecommendationService::new(store, options));
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
            return None;
        }
    };

    if let Err(e) = finpick_core::storage::migrate(&pool).await {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
        return None;
    }

    let service = RecommendationService::new(Arc::new(PgStore::new(pool)), options);
    match service.seed_catalog(false).await {
        Ok(Some(written)) => tracing::info!(written, "seeded empty catalog"),
        Ok(None) => {}
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::warn!(error = %e, "catalog seed check failed");
        }
    }
    Some(service)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
