// =============================================================================
// CryptoDash Gateway — Main Entry Point
// =============================================================================
//
// Single-binary HTTP backend for the CryptoDash dashboard: market-data proxy
// endpoints (ticker / OHLC / search) with in-memory caching and bounded retry,
// portfolio holdings CRUD, and a hosted-checkout donation flow.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod market;
mod payments;
mod portfolio;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        CryptoDash Gateway — Starting Up                 ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = AppConfig::load("gateway_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    config.apply_env_overrides();

    if config.stripe_secret_key.is_empty() {
        warn!("STRIPE_SECRET_KEY is not set — donation checkout will be rejected upstream");
    }

    info!(
        market_api = %config.market_api_base,
        catalog_api = %config.catalog_api_base,
        ticker_ttl_secs = config.ticker_cache_ttl_secs,
        catalog_ttl_secs = config.catalog_cache_ttl_secs,
        "Gateway configured"
    );

    // ── 2. Build shared state & router ───────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config));
    let app = api::rest::router(state);

    // ── 3. Serve ─────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("CryptoDash Gateway shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    } else {
        warn!("Shutdown signal received — stopping gracefully");
    }
}
