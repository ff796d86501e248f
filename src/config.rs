// =============================================================================
// Gateway Configuration — JSON file with env-var overrides
// =============================================================================
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file. Secrets (Stripe keys) are never read from or
// written to the config file; they come from the environment only.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_market_api_base() -> String {
    "https://api.kraken.com".to_string()
}

fn default_catalog_api_base() -> String {
    "https://api.coingecko.com".to_string()
}

fn default_auth_api_base() -> String {
    "https://auth.cryptodash.app".to_string()
}

fn default_checkout_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_public_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_ticker_cache_ttl_secs() -> u64 {
    60
}

fn default_catalog_cache_ttl_secs() -> u64 {
    3600
}

// =============================================================================
// AppConfig
// =============================================================================

/// Gateway settings. Loaded once at startup; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket address the API server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the upstream market-data provider (ticker + OHLC).
    #[serde(default = "default_market_api_base")]
    pub market_api_base: String,

    /// Base URL of the upstream asset-catalog provider (search).
    #[serde(default = "default_catalog_api_base")]
    pub catalog_api_base: String,

    /// Base URL of the hosted auth service that verifies session tokens.
    #[serde(default = "default_auth_api_base")]
    pub auth_api_base: String,

    /// Base URL of the hosted payment processor.
    #[serde(default = "default_checkout_api_base")]
    pub checkout_api_base: String,

    /// Public origin of the dashboard UI, used for checkout redirect URLs.
    #[serde(default = "default_public_origin")]
    pub public_origin: String,

    /// TTL for cached ticker / OHLC responses.
    #[serde(default = "default_ticker_cache_ttl_secs")]
    pub ticker_cache_ttl_secs: u64,

    /// TTL for the cached asset-catalog snapshot.
    #[serde(default = "default_catalog_cache_ttl_secs")]
    pub catalog_cache_ttl_secs: u64,

    /// Payment processor secret key (env only, never persisted).
    #[serde(skip)]
    pub stripe_secret_key: String,

    /// Webhook signing secret (env only, never persisted).
    #[serde(skip)]
    pub stripe_webhook_secret: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            market_api_base: default_market_api_base(),
            catalog_api_base: default_catalog_api_base(),
            auth_api_base: default_auth_api_base(),
            checkout_api_base: default_checkout_api_base(),
            public_origin: default_public_origin(),
            ticker_cache_ttl_secs: default_ticker_cache_ttl_secs(),
            catalog_cache_ttl_secs: default_catalog_cache_ttl_secs(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// defaults; a missing file is an error the caller may recover from.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment-variable overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CRYPTODASH_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Ok(v) = std::env::var("CRYPTODASH_MARKET_API") {
            self.market_api_base = v;
        }
        if let Ok(v) = std::env::var("CRYPTODASH_CATALOG_API") {
            self.catalog_api_base = v;
        }
        if let Ok(v) = std::env::var("AUTH_SERVICE_URL") {
            self.auth_api_base = v;
        }
        if let Ok(v) = std::env::var("STRIPE_API_BASE") {
            self.checkout_api_base = v;
        }
        if let Ok(v) = std::env::var("CRYPTODASH_PUBLIC_ORIGIN") {
            self.public_origin = v;
        }
        if let Ok(v) = std::env::var("STRIPE_SECRET_KEY") {
            self.stripe_secret_key = v;
        }
        if let Ok(v) = std::env::var("STRIPE_WEBHOOK_SECRET") {
            self.stripe_webhook_secret = v;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.ticker_cache_ttl_secs, 60);
        assert_eq!(config.catalog_cache_ttl_secs, 3600);
        assert!(config.market_api_base.starts_with("https://"));
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let config: AppConfig =
            serde_json::from_str(r#"{"bind_addr": "127.0.0.1:9999"}"#).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9999");
        assert_eq!(config.ticker_cache_ttl_secs, 60);
    }

    #[test]
    fn secrets_never_serialized() {
        let mut config = AppConfig::default();
        config.stripe_secret_key = "sk_test_secret".to_string();
        let out = serde_json::to_string(&config).unwrap();
        assert!(!out.contains("sk_test_secret"));
    }
}
