//! News Batch Router: binary entrypoint.
//! Boots the Axum HTTP server: config, alias table, metrics, routes.
//!
//! See `README.md` for quickstart.

use anyhow::Context;
use news_batch_router::{
    api::{create_router, AppState},
    metrics::Metrics,
    relevance::ENV_DEV_LOG,
    NewsRouter, RouterConfig,
};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - ROUTER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var(ENV_DEV_LOG).ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("router=info,ingest=info,relevance=info,api=info,warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = RouterConfig::load_default().context("loading router config")?;
    let metrics = Metrics::init(&cfg)?;
    let router = NewsRouter::from_config(cfg).context("loading ticker aliases")?;
    tracing::info!(
        target: "router",
        commands = ?router.commands().names(),
        fixture = %router.config().fixture_path.display(),
        "router ready"
    );

    let app = create_router(AppState::new(router)).merge(metrics.router());

    Ok(app.into())
}
