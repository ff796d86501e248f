// =============================================================================
// Market Data Client — upstream ticker/OHLC provider
// =============================================================================
//
// Wraps the provider's public REST API. The provider wraps every response in
// `{ "error": [...], "result": {...} }`; a non-empty error array on an HTTP
// 200 indicates a non-transient problem (e.g. unknown pair) and fails
// immediately without consuming retry budget. Transport-level 429/5xx go
// through the shared retry policy in `market::retry`.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::market::pairs::{self, match_upstream_key};
use crate::market::retry::get_json_with_retry;
use crate::market::types::{CandlePoint, TickerSnapshot};

/// Client for the upstream market-data provider's public endpoints.
#[derive(Debug, Clone)]
pub struct MarketClient {
    base_url: String,
    client: reqwest::Client,
}

impl MarketClient {
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

    // -------------------------------------------------------------------------
    // URL builders (the full URL doubles as the cache key)
    // -------------------------------------------------------------------------

    pub fn ticker_url(&self, pairs: &[String]) -> String {
        format!("{}/0/public/Ticker?pair={}", self.base_url, pairs.join(","))
    }

    pub fn ohlc_url(&self, pair: &str, interval: u32, since: i64) -> String {
        format!(
            "{}/0/public/OHLC?pair={}&interval={}&since={}",
            self.base_url, pair, interval, since
        )
    }

    // -------------------------------------------------------------------------
    // Ticker
    // -------------------------------------------------------------------------

    /// Fetch and normalize live tickers for `requested` pairs.
    ///
    /// Output preserves request order; pairs with no matching upstream record
    /// are dropped, never defaulted to another market.
    #[instrument(skip(self, requested), name = "market::fetch_tickers")]
    pub async fn fetch_tickers(
        &self,
        url: &str,
        requested: &[String],
    ) -> Result<Vec<TickerSnapshot>> {
        let result = self.fetch_result(url).await?;
        let records = result
            .as_object()
            .context("upstream ticker result is not an object")?;
        let keys: Vec<String> = records.keys().cloned().collect();

        let mut snapshots = Vec::with_capacity(requested.len());
        for pair in requested {
            let Some(key) = match_upstream_key(pair, &keys) else {
                warn!(pair = %pair, "no upstream ticker record for requested pair — dropping");
                continue;
            };
            let record = &records[key];

            let last = num_at(record, "c", 0);
            let open = num(&record["o"]);
            let change_pct = if open > 0.0 {
                (last - open) / open * 100.0
            } else {
                0.0
            };

            let (id, symbol, name) = pairs::pair_metadata(pair);
            snapshots.push(TickerSnapshot {
                id,
                symbol,
                name,
                pair: pair.clone(),
                current_price: last,
                price_change_percentage_24h: change_pct,
                high_24h: num_at(record, "h", 1),
                low_24h: num_at(record, "l", 1),
                volume_24h: num_at(record, "v", 1),
            });
        }

        debug!(requested = requested.len(), matched = snapshots.len(), "tickers normalized");
        Ok(snapshots)
    }

    // -------------------------------------------------------------------------
    // OHLC
    // -------------------------------------------------------------------------

    /// Fetch and normalize OHLC candles for one pair.
    ///
    /// Upstream rows are `[time_s, "open", "high", "low", "close", "vwap",
    /// "volume", count]`; we keep the first five fields, convert seconds to
    /// milliseconds, sort ascending, and drop duplicate timestamps. When
    /// `limit` is set the output is truncated to the last N points.
    #[instrument(skip(self), name = "market::fetch_ohlc")]
    pub async fn fetch_ohlc(
        &self,
        url: &str,
        pair: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CandlePoint>> {
        let result = self.fetch_result(url).await?;
        let records = result
            .as_object()
            .context("upstream OHLC result is not an object")?;

        // Exact pair key first; the upstream is inconsistent about key casing
        // and prefixing, so fall back to the first array-valued key. The
        // non-array "last" cursor field never matches.
        let rows = match records.get(pair).and_then(|v| v.as_array()) {
            Some(v) => v,
            None => records
                .values()
                .find_map(|v| v.as_array())
                .context("upstream OHLC result contains no candle array")?,
        };

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(fields) = row.as_array() else {
                warn!("skipping non-array OHLC row");
                continue;
            };
            if fields.len() < 5 {
                warn!(len = fields.len(), "skipping malformed OHLC row");
                continue;
            }
            let ts_ms = (num(&fields[0]) as i64) * 1000;
            candles.push(CandlePoint(
                ts_ms,
                num(&fields[1]),
                num(&fields[2]),
                num(&fields[3]),
                num(&fields[4]),
            ));
        }

        candles.sort_by_key(|c| c.timestamp_ms());
        candles.dedup_by_key(|c| c.timestamp_ms());

        if let Some(n) = limit {
            if candles.len() > n {
                candles.drain(..candles.len() - n);
            }
        }

        debug!(pair, count = candles.len(), "OHLC candles normalized");
        Ok(candles)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// GET `url` with retry and unwrap the provider envelope. A non-empty
    /// provider-level `error` array is fatal immediately — it signals a
    /// non-transient issue like an invalid pair name.
    async fn fetch_result(&self, url: &str) -> Result<serde_json::Value> {
        let body = get_json_with_retry(&self.client, url).await?;

        if let Some(errors) = body.get("error").and_then(|v| v.as_array()) {
            if !errors.is_empty() {
                anyhow::bail!("upstream provider error: {errors:?}");
            }
        }

        body.get("result")
            .cloned()
            .context("upstream response missing 'result' object")
    }
}

/// Parse a JSON value that may be either a string or a number into `f64`,
/// falling back to 0.0 for anything missing or non-numeric.
fn num(val: &serde_json::Value) -> f64 {
    let parsed = if let Some(s) = val.as_str() {
        s.parse::<f64>().unwrap_or(0.0)
    } else {
        val.as_f64().unwrap_or(0.0)
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// `record[field][idx]` as f64, NaN-safe.
fn num_at(record: &serde_json::Value, field: &str, idx: usize) -> f64 {
    num(&record[field][idx])
}

// =============================================================================
// Tests
// =============================================================================
