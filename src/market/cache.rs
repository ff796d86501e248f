// =============================================================================
// In-memory response caches
// =============================================================================
//
// Two caches back the gateway:
//   - `ResponseCache`: short-TTL map keyed by the full upstream request URL,
//     shared by the ticker and OHLC endpoints. Entries are overwritten on
//     refresh and never explicitly deleted; eviction happens by key reuse.
//   - `CatalogCache`: a single snapshot of the upstream asset catalog,
//     refreshed at most once per TTL window regardless of query volume.
//
// Both are injected through `AppState` rather than living as module globals,
// so tests control their lifetime and TTL. Concurrent misses may double-fetch
// and double-write the same key; the writes are idempotent overwrites of
// equivalent data, which is accepted.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::market::types::{CandlePoint, CatalogCoin, TickerSnapshot};

/// Payload stored by [`ResponseCache`]. Ticker and OHLC responses share one
/// map, keyed by URL, so the payload carries its own discriminant.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    Tickers(Vec<TickerSnapshot>),
    Candles(Vec<CandlePoint>),
}

struct CacheEntry {
    captured_at: Instant,
    payload: CachedPayload,
}

/// URL-keyed TTL cache for normalized upstream responses.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return a clone of the cached payload while the entry is fresh.
    /// Expired entries are left in place; the next insert overwrites them.
    pub fn get(&self, key: &str) -> Option<CachedPayload> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.captured_at.elapsed() < self.ttl {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    /// Store a payload under `key`, silently superseding any previous entry.
    pub fn insert(&self, key: impl Into<String>, payload: CachedPayload) {
        let mut entries = self.entries.write();
        entries.insert(
            key.into(),
            CacheEntry {
                captured_at: Instant::now(),
                payload,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CatalogSnapshot {
    fetched_at: Instant,
    coins: Vec<CatalogCoin>,
}

/// Single-slot cache for the upstream asset catalog.
pub struct CatalogCache {
    ttl: Duration,
    snapshot: RwLock<Option<CatalogSnapshot>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            snapshot: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Vec<CatalogCoin>> {
        let snapshot = self.snapshot.read();
        let snap = snapshot.as_ref()?;
        if snap.fetched_at.elapsed() < self.ttl {
            Some(snap.coins.clone())
        } else {
            None
        }
    }

    pub fn store(&self, coins: Vec<CatalogCoin>) {
        *self.snapshot.write() = Some(CatalogSnapshot {
            fetched_at: Instant::now(),
            coins,
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(pair: &str) -> TickerSnapshot {
        TickerSnapshot {
            id: "bitcoin".into(),
            symbol: "BTC".into(),
            name: "Bitcoin".into(),
            pair: pair.into(),
            current_price: 50_000.0,
            price_change_percentage_24h: 1.5,
            high_24h: 51_000.0,
            low_24h: 49_000.0,
            volume_24h: 1234.5,
        }
    }

    #[test]
    fn fresh_entry_is_served() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("url-a", CachedPayload::Tickers(vec![ticker("XBTUSD")]));
        match cache.get("url-a") {
            Some(CachedPayload::Tickers(snaps)) => assert_eq!(snaps[0].pair, "XBTUSD"),
            other => panic!("unexpected cache result: {other:?}"),
        }
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("url-a", CachedPayload::Candles(vec![CandlePoint(1, 1.0, 1.0, 1.0, 1.0)]));
        assert!(cache.get("url-a").is_none());
        // The stale entry stays in the map until overwritten.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn insert_supersedes_previous_entry() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("url-a", CachedPayload::Tickers(vec![ticker("XBTUSD")]));
        cache.insert("url-a", CachedPayload::Tickers(vec![ticker("ETHUSD")]));
        assert_eq!(cache.len(), 1);
        match cache.get("url-a") {
            Some(CachedPayload::Tickers(snaps)) => assert_eq!(snaps[0].pair, "ETHUSD"),
            other => panic!("unexpected cache result: {other:?}"),
        }
    }

    #[test]
    fn catalog_cache_single_snapshot() {
        let cache = CatalogCache::new(Duration::from_secs(3600));
        assert!(cache.get().is_none());
        cache.store(vec![CatalogCoin {
            id: "bitcoin".into(),
            symbol: "btc".into(),
            name: "Bitcoin".into(),
        }]);
        assert_eq!(cache.get().unwrap().len(), 1);

        let expired = CatalogCache::new(Duration::ZERO);
        expired.store(vec![]);
        assert!(expired.get().is_none());
    }
}
