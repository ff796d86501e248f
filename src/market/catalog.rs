// =============================================================================
// Asset Catalog Client — upstream coin list used by search
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::market::types::CatalogCoin;

/// Client for the upstream asset-catalog endpoint. The catalog is large and
/// slow-moving; callers cache the snapshot and treat fetch failures as an
/// empty catalog rather than a request error.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("CryptoDash/1.0")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Fetch the full asset catalog. No retry: a miss degrades search for one
    /// request, and the catalog is re-fetched on the next query anyway.
    #[instrument(skip(self), name = "catalog::fetch_coins")]
    pub async fn fetch_coins(&self) -> Result<Vec<CatalogCoin>> {
        let url = format!(
            "{}/api/v3/coins/list?include_platform=false",
            self.base_url
        );

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("catalog request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("catalog upstream returned {status}");
        }

        let coins: Vec<CatalogCoin> = resp
            .json()
            .await
            .context("failed to parse catalog response")?;

        debug!(count = coins.len(), "asset catalog fetched");
        Ok(coins)
    }
}
