// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Market-data endpoints are public and cacheable; portfolio endpoints require
// a verified session; the donation endpoint accepts anonymous callers.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

use crate::api::error::ApiError;
use crate::api::{payments, portfolio};
use crate::app_state::AppState;
use crate::market::cache::CachedPayload;
use crate::market::pairs::{map_id_to_pair, parse_requested_pairs, split_pair};
use crate::market::types::SearchResult;

/// `Cache-Control` served with ticker and OHLC responses.
const MARKET_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=300";

/// Maximum search results returned per query.
const MAX_SEARCH_RESULTS: usize = 100;

/// Daily candle interval, in minutes.
const DAILY_INTERVAL: u32 = 1440;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/health", get(health))
        .route("/api/crypto/markets", get(markets))
        .route("/api/crypto/ohlc", get(ohlc))
        .route("/api/crypto/search", get(search))
        // ── Authenticated ───────────────────────────────────────────
        .route(
            "/api/portfolio/holdings",
            get(portfolio::list_holdings)
                .post(portfolio::upsert_holding)
                .patch(portfolio::update_holding)
                .delete(portfolio::delete_holding),
        )
        // ── Donations ───────────────────────────────────────────────
        .route("/api/create-payment-intent", post(payments::create_payment_intent))
        .route("/api/payments/webhook", post(payments::webhook))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Ticker endpoint
// =============================================================================

#[derive(Deserialize)]
struct MarketsQuery {
    pairs: Option<String>,
}

/// GET /api/crypto/markets?pairs=XBTUSD,ETHUSD
///
/// One normalized TickerSnapshot per recognized pair, in request order.
async fn markets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MarketsQuery>,
) -> Result<Response, ApiError> {
    let pairs = parse_requested_pairs(query.pairs.as_deref());
    let url = state.market.ticker_url(&pairs);

    if let Some(CachedPayload::Tickers(cached)) = state.response_cache.get(&url) {
        debug!(key = %url, "ticker cache hit");
        return Ok(market_json(&cached));
    }

    let snapshots = state.market.fetch_tickers(&url, &pairs).await?;
    state
        .response_cache
        .insert(url, CachedPayload::Tickers(snapshots.clone()));
    Ok(market_json(&snapshots))
}

// =============================================================================
// OHLC endpoint
// =============================================================================

#[derive(Deserialize)]
struct OhlcQuery {
    // Friendly form.
    #[serde(rename = "coinId")]
    coin_id: Option<String>,
    vs_currency: Option<String>,
    days: Option<u32>,
    // Raw upstream form; takes precedence when `pair` is present.
    pair: Option<String>,
    interval: Option<u32>,
    since: Option<i64>,
}

/// GET /api/crypto/ohlc?coinId=bitcoin&vs_currency=usd&days=30
/// GET /api/crypto/ohlc?pair=XBTUSD&interval=60&since=1700000000
async fn ohlc(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OhlcQuery>,
) -> Result<Response, ApiError> {
    let now_ts = chrono::Utc::now().timestamp();
    let (pair, interval, since, limit) = resolve_ohlc_params(&query, now_ts);
    let url = state.market.ohlc_url(&pair, interval, since);

    if let Some(CachedPayload::Candles(cached)) = state.response_cache.get(&url) {
        debug!(key = %url, "OHLC cache hit");
        return Ok(market_json(&cached));
    }

    let candles = state.market.fetch_ohlc(&url, &pair, limit).await?;
    state
        .response_cache
        .insert(url, CachedPayload::Candles(candles.clone()));
    Ok(market_json(&candles))
}

/// Reconcile the friendly and raw OHLC parameter forms into
/// `(pair, interval, since, point_limit)`.
fn resolve_ohlc_params(query: &OhlcQuery, now_ts: i64) -> (String, u32, i64, Option<usize>) {
    if let Some(raw_pair) = &query.pair {
        let pair = raw_pair.trim().to_uppercase();
        let interval = query.interval.unwrap_or(DAILY_INTERVAL);
        let since = query.since.unwrap_or(now_ts - 30 * 86_400);
        return (pair, interval, since, None);
    }

    let coin_id = query.coin_id.as_deref().unwrap_or("bitcoin");
    let quote = query
        .vs_currency
        .as_deref()
        .unwrap_or("usd")
        .trim()
        .to_uppercase();
    // The pair table gives us the upstream base code; assets outside it get a
    // best-effort uppercased id as the base.
    let base = match map_id_to_pair(coin_id) {
        Some(known) => split_pair(known).0.to_string(),
        None => coin_id.trim().to_uppercase(),
    };
    let days = query.days.unwrap_or(30);
    let since = now_ts - i64::from(days) * 86_400;
    (format!("{base}{quote}"), DAILY_INTERVAL, since, Some(days as usize))
}

// =============================================================================
// Search endpoint
// =============================================================================

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

/// GET /api/crypto/search?q=bit
///
/// Case-insensitive substring search over the cached asset catalog. A failed
/// catalog fetch degrades to an empty result set rather than an error.
async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<SearchResult>> {
    let q = query.q.unwrap_or_default().trim().to_lowercase();
    if q.is_empty() {
        return Json(Vec::new());
    }

    let coins = match state.catalog_cache.get() {
        Some(coins) => coins,
        None => match state.catalog.fetch_coins().await {
            Ok(coins) => {
                state.catalog_cache.store(coins.clone());
                coins
            }
            Err(e) => {
                warn!(error = %e, "catalog fetch failed — serving empty results");
                Vec::new()
            }
        },
    };

    let results = coins
        .iter()
        .filter(|c| {
            c.id.to_lowercase().contains(&q)
                || c.symbol.to_lowercase().contains(&q)
                || c.name.to_lowercase().contains(&q)
        })
        .take(MAX_SEARCH_RESULTS)
        .map(|c| SearchResult {
            id: c.id.clone(),
            symbol: c.symbol.clone(),
            name: c.name.clone(),
            pair: map_id_to_pair(&c.id).map(str::to_string),
        })
        .collect();

    Json(results)
}

// =============================================================================
// Helpers
// =============================================================================

fn market_json<T: Serialize>(body: &T) -> Response {
    ([(header::CACHE_CONTROL, MARKET_CACHE_CONTROL)], Json(body)).into_response()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::http::StatusCode;

    use crate::config::AppConfig;
    use crate::portfolio::store::MemoryStore;

    // ── Stub upstream world ──────────────────────────────────────────────

    #[derive(Default)]
    struct UpstreamStub {
        ticker_hits: AtomicU32,
        ohlc_hits: AtomicU32,
        catalog_hits: AtomicU32,
        fail_market: bool,
    }

    fn ticker_record(last: &str, open: &str) -> serde_json::Value {
        serde_json::json!({
            "c": [last, "0.1"],
            "v": ["10.0", "20.0"],
            "h": ["110.0", "120.0"],
            "l": ["90.0", "80.0"],
            "o": open,
        })
    }

    async fn ticker_route(State(stub): State<Arc<UpstreamStub>>) -> Response {
        stub.ticker_hits.fetch_add(1, Ordering::SeqCst);
        if stub.fail_market {
            return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
        }
        Json(serde_json::json!({
            "error": [],
            "result": {
                "XXBTZUSD": ticker_record("50000.0", "49000.0"),
                "XETHZUSD": ticker_record("3000.0", "2900.0"),
                "SOLUSD": ticker_record("150.0", "140.0"),
                "ADAUSD": ticker_record("0.5", "0.4"),
                "XXRPZUSD": ticker_record("0.6", "0.55"),
                "BNBUSD": ticker_record("600.0", "590.0"),
            }
        }))
        .into_response()
    }

    async fn ohlc_route(State(stub): State<Arc<UpstreamStub>>) -> Response {
        stub.ohlc_hits.fetch_add(1, Ordering::SeqCst);
        Json(serde_json::json!({
            "error": [],
            "result": {
                "XXBTZUSD": [
                    [300, "3", "3", "3", "3", "3", "3", 1],
                    [100, "1", "1", "1", "1", "1", "1", 1],
                    [200, "2", "2", "2", "2", "2", "2", 1],
                    [400, "4", "4", "4", "4", "4", "4", 1],
                ],
                "last": 400
            }
        }))
        .into_response()
    }

    async fn catalog_route(State(stub): State<Arc<UpstreamStub>>) -> Response {
        stub.catalog_hits.fetch_add(1, Ordering::SeqCst);
        if stub.fail_market {
            return (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response();
        }
        Json(serde_json::json!([
            { "id": "bitcoin", "symbol": "btc", "name": "Bitcoin" },
            { "id": "bitcoin-cash", "symbol": "bch", "name": "Bitcoin Cash" },
            { "id": "ethereum", "symbol": "eth", "name": "Ethereum" },
            { "id": "obscurecoin", "symbol": "obs", "name": "ObscureCoin" },
        ]))
        .into_response()
    }

    async fn spawn_upstream(fail_market: bool) -> (String, Arc<UpstreamStub>) {
        let stub = Arc::new(UpstreamStub {
            fail_market,
            ..Default::default()
        });
        let app = Router::new()
            .route("/0/public/Ticker", get(ticker_route))
            .route("/0/public/OHLC", get(ohlc_route))
            .route("/api/v3/coins/list", get(catalog_route))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), stub)
    }

    async fn spawn_gateway(config: AppConfig) -> String {
        let state = Arc::new(AppState::with_store(config, Arc::new(MemoryStore::new())));
        let app = router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn test_config(upstream: &str) -> AppConfig {
        AppConfig {
            market_api_base: upstream.to_string(),
            catalog_api_base: upstream.to_string(),
            ..AppConfig::default()
        }
    }

    // ── Ticker ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn markets_returns_requested_pairs_in_order() {
        let (upstream, _stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let resp = reqwest::get(format!("{gateway}/api/crypto/markets?pairs=XBTUSD,ETHUSD"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()["cache-control"],
            "public, s-maxage=60, stale-while-revalidate=300"
        );

        let body: Vec<serde_json::Value> = resp.json().await.unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0]["pair"], "XBTUSD");
        assert_eq!(body[0]["id"], "bitcoin");
        assert_eq!(body[0]["symbol"], "BTC");
        assert_eq!(body[1]["pair"], "ETHUSD");
    }

    #[tokio::test]
    async fn markets_defaults_to_six_major_pairs() {
        let (upstream, _stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let body: Vec<serde_json::Value> =
            reqwest::get(format!("{gateway}/api/crypto/markets"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body.len(), 6);
        let pairs: Vec<&str> = body.iter().map(|t| t["pair"].as_str().unwrap()).collect();
        assert_eq!(
            pairs,
            vec!["XBTUSD", "ETHUSD", "SOLUSD", "ADAUSD", "XRPUSD", "BNBUSD"]
        );
    }

    #[tokio::test]
    async fn markets_second_request_is_served_from_cache() {
        let (upstream, stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;
        let url = format!("{gateway}/api/crypto/markets?pairs=XBTUSD");

        let first: Vec<serde_json::Value> =
            reqwest::get(&url).await.unwrap().json().await.unwrap();
        let second: Vec<serde_json::Value> =
            reqwest::get(&url).await.unwrap().json().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.ticker_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn markets_drops_multibyte_pair_codes() {
        let (upstream, _stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        // "A€B,XBTUSD" — the multibyte code matches nothing and is dropped.
        let resp = reqwest::get(format!(
            "{gateway}/api/crypto/markets?pairs=A%E2%82%ACB,XBTUSD"
        ))
        .await
        .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Vec<serde_json::Value> = resp.json().await.unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["pair"], "XBTUSD");
    }

    #[tokio::test]
    async fn markets_surfaces_500_after_exhausted_retries() {
        let (upstream, stub) = spawn_upstream(true).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let resp = reqwest::get(format!("{gateway}/api/crypto/markets?pairs=XBTUSD"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Internal Server Error");
        assert_eq!(stub.ticker_hits.load(Ordering::SeqCst), 3);
    }

    // ── OHLC ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn ohlc_friendly_form_truncates_to_days() {
        let (upstream, _stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let body: Vec<Vec<f64>> = reqwest::get(format!(
            "{gateway}/api/crypto/ohlc?coinId=bitcoin&vs_currency=usd&days=2"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

        assert_eq!(body.len(), 2);
        // Last two points of the sorted stub data, in ascending order.
        assert_eq!(body[0][0], 300_000.0);
        assert_eq!(body[1][0], 400_000.0);
    }

    #[tokio::test]
    async fn ohlc_raw_form_returns_all_points_sorted() {
        let (upstream, _stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let body: Vec<Vec<f64>> = reqwest::get(format!(
            "{gateway}/api/crypto/ohlc?pair=XBTUSD&interval=60&since=0"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

        assert_eq!(body.len(), 4);
        let stamps: Vec<f64> = body.iter().map(|c| c[0]).collect();
        assert_eq!(stamps, vec![100_000.0, 200_000.0, 300_000.0, 400_000.0]);
    }

    #[tokio::test]
    async fn ohlc_repeat_request_hits_cache() {
        let (upstream, stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;
        let url = format!("{gateway}/api/crypto/ohlc?pair=XBTUSD&interval=60&since=0");

        reqwest::get(&url).await.unwrap().error_for_status().unwrap();
        reqwest::get(&url).await.unwrap().error_for_status().unwrap();
        assert_eq!(stub.ohlc_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolve_params_raw_form_wins() {
        let query = OhlcQuery {
            coin_id: Some("ethereum".into()),
            vs_currency: Some("eur".into()),
            days: Some(7),
            pair: Some("xbtusd".into()),
            interval: Some(60),
            since: Some(42),
        };
        let (pair, interval, since, limit) = resolve_ohlc_params(&query, 1_000_000);
        assert_eq!(pair, "XBTUSD");
        assert_eq!(interval, 60);
        assert_eq!(since, 42);
        assert_eq!(limit, None);
    }

    #[test]
    fn resolve_params_friendly_form_translates() {
        let query = OhlcQuery {
            coin_id: Some("ethereum".into()),
            vs_currency: Some("eur".into()),
            days: Some(7),
            pair: None,
            interval: None,
            since: None,
        };
        let now = 10_000_000;
        let (pair, interval, since, limit) = resolve_ohlc_params(&query, now);
        assert_eq!(pair, "ETHEUR");
        assert_eq!(interval, DAILY_INTERVAL);
        assert_eq!(since, now - 7 * 86_400);
        assert_eq!(limit, Some(7));
    }

    #[test]
    fn resolve_params_defaults_to_bitcoin_30_days() {
        let query = OhlcQuery {
            coin_id: None,
            vs_currency: None,
            days: None,
            pair: None,
            interval: None,
            since: None,
        };
        let (pair, interval, _since, limit) = resolve_ohlc_params(&query, 0);
        assert_eq!(pair, "XBTUSD");
        assert_eq!(interval, DAILY_INTERVAL);
        assert_eq!(limit, Some(30));
    }

    // ── Search ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn search_empty_query_returns_empty_array() {
        let (upstream, stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let body: Vec<serde_json::Value> =
            reqwest::get(format!("{gateway}/api/crypto/search?q=%20"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert!(body.is_empty());
        // Empty queries never touch the catalog.
        assert_eq!(stub.catalog_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_matches_case_insensitively_and_enriches_pairs() {
        let (upstream, stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let body: Vec<serde_json::Value> =
            reqwest::get(format!("{gateway}/api/crypto/search?q=BITCOIN"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0]["id"], "bitcoin");
        assert_eq!(body[0]["pair"], "XBTUSD");
        assert_eq!(body[1]["id"], "bitcoin-cash");

        // Unknown assets carry no pair field at all.
        let body: Vec<serde_json::Value> =
            reqwest::get(format!("{gateway}/api/crypto/search?q=obscure"))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(body.len(), 1);
        assert!(body[0].get("pair").is_none());

        // Two queries, one catalog fetch.
        assert_eq!(stub.catalog_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn search_degrades_to_empty_on_catalog_failure() {
        let (upstream, _stub) = spawn_upstream(true).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let resp = reqwest::get(format!("{gateway}/api/crypto/search?q=bit"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Vec<serde_json::Value> = resp.json().await.unwrap();
        assert!(body.is_empty());
    }

    // ── Health ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_is_public() {
        let (upstream, _stub) = spawn_upstream(false).await;
        let gateway = spawn_gateway(test_config(&upstream)).await;

        let body: serde_json::Value = reqwest::get(format!("{gateway}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }
}
