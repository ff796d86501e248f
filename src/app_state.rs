// =============================================================================
// Central Application State — CryptoDash Gateway
// =============================================================================
//
// Everything the request handlers share: configuration, upstream clients, the
// response/catalog caches, and the portfolio store. Wrapped in `Arc` and
// handed to the router as axum state. The caches use parking_lot locks; no
// cross-request ordering is guaranteed beyond "written within the last TTL
// window".
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::api::auth::AuthClient;
use crate::config::AppConfig;
use crate::market::cache::{CatalogCache, ResponseCache};
use crate::market::catalog::CatalogClient;
use crate::market::client::MarketClient;
use crate::payments::checkout::CheckoutClient;
use crate::portfolio::store::{MemoryStore, PortfolioStore};

/// Shared state for all request handlers.
pub struct AppState {
    pub config: AppConfig,

    // ── Upstream clients ────────────────────────────────────────────────
    pub market: MarketClient,
    pub catalog: CatalogClient,
    pub auth: AuthClient,
    pub checkout: CheckoutClient,

    // ── Caches ──────────────────────────────────────────────────────────
    pub response_cache: ResponseCache,
    pub catalog_cache: CatalogCache,

    // ── Persistence seam ────────────────────────────────────────────────
    pub portfolio: Arc<dyn PortfolioStore>,
}

impl AppState {
    /// Construct state with the default in-memory portfolio store.
    pub fn new(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Construct state with an explicit portfolio store (used by tests and by
    /// deployments that wire in a remote store).
    pub fn with_store(config: AppConfig, portfolio: Arc<dyn PortfolioStore>) -> Self {
        let market = MarketClient::new(&config.market_api_base);
        let catalog = CatalogClient::new(&config.catalog_api_base);
        let auth = AuthClient::new(&config.auth_api_base);
        let checkout = CheckoutClient::new(&config.checkout_api_base, &config.stripe_secret_key);
        let response_cache = ResponseCache::new(Duration::from_secs(config.ticker_cache_ttl_secs));
        let catalog_cache = CatalogCache::new(Duration::from_secs(config.catalog_cache_ttl_secs));

        Self {
            config,
            market,
            catalog,
            auth,
            checkout,
            response_cache,
            catalog_cache,
            portfolio,
        }
    }
}
