// =============================================================================
// Wire types served by the market-data gateway
// =============================================================================

use serde::{Deserialize, Serialize};

/// Normalized live ticker for one trading pair. Built fresh per upstream
/// fetch or served verbatim from cache; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    /// Canonical asset identifier (e.g. "bitcoin").
    pub id: String,
    /// Display ticker, uppercase (e.g. "BTC").
    pub symbol: String,
    /// Display name (e.g. "Bitcoin").
    pub name: String,
    /// The upstream trading-pair code this snapshot was requested as.
    pub pair: String,
    pub current_price: f64,
    pub price_change_percentage_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
}

/// One OHLC candle: `(timestamp_ms, open, high, low, close)`.
///
/// Serializes as a JSON array of five numbers, which is the wire shape the
/// chart components consume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint(pub i64, pub f64, pub f64, pub f64, pub f64);

impl CandlePoint {
    pub fn timestamp_ms(&self) -> i64 {
        self.0
    }
}

/// One entry of the upstream asset catalog (search corpus).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// Search result: a catalog entry enriched with a best-effort trading pair.
/// Assets without a known pair mapping omit the field entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
}
