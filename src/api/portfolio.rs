// =============================================================================
// Portfolio Holdings Endpoints
// =============================================================================
//
// All verbs require a verified session. Responses are capped at 30 rows no
// matter how many holdings the store returns. Every call get-or-creates the
// user and their "Default" portfolio by email, so a fresh session works
// without any signup step.
// =============================================================================

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::app_state::AppState;
use crate::portfolio::store::Holding;

/// Maximum holdings rows per response.
const MAX_HOLDINGS_ROWS: usize = 30;

type ApiRejection = (StatusCode, Json<serde_json::Value>);

fn bad_request(message: &str) -> ApiRejection {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsResponse {
    portfolio_id: Uuid,
    holdings: Vec<Holding>,
}

fn holdings_response(state: &AppState, email: &str) -> HoldingsResponse {
    let user = state.portfolio.get_or_create_user(email);
    let portfolio = state.portfolio.get_or_create_default_portfolio(user.id);
    let mut holdings = state.portfolio.list_holdings(portfolio.id);
    holdings.truncate(MAX_HOLDINGS_ROWS);
    HoldingsResponse {
        portfolio_id: portfolio.id,
        holdings,
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
pub struct HoldingsListQuery {
    limit: Option<usize>,
}

/// GET /api/portfolio/holdings?limit=10
pub async fn list_holdings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<HoldingsListQuery>,
) -> Json<HoldingsResponse> {
    let limit = query.limit.unwrap_or(MAX_HOLDINGS_ROWS).min(MAX_HOLDINGS_ROWS);
    let mut response = holdings_response(&state, &user.email);
    response.holdings.truncate(limit);
    Json(response)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingPayload {
    crypto_id: Option<String>,
    amount: Option<f64>,
}

impl HoldingPayload {
    /// Validate into `(crypto_id, amount)`; amount must be finite and > 0.
    fn validate(&self) -> Option<(String, f64)> {
        let crypto_id = self.crypto_id.as_deref().unwrap_or("").trim().to_string();
        let amount = self.amount.unwrap_or(0.0);
        if crypto_id.is_empty() || !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        Some((crypto_id, amount))
    }
}

/// POST /api/portfolio/holdings — upsert by (portfolio, crypto id).
pub async fn upsert_holding(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HoldingPayload>,
) -> Result<Json<HoldingsResponse>, ApiRejection> {
    let (crypto_id, amount) = payload
        .validate()
        .ok_or_else(|| bad_request("Invalid payload"))?;

    let u = state.portfolio.get_or_create_user(&user.email);
    let p = state.portfolio.get_or_create_default_portfolio(u.id);
    state.portfolio.upsert_holding(p.id, &crypto_id, amount);

    Ok(Json(holdings_response(&state, &user.email)))
}

/// PATCH /api/portfolio/holdings — update an existing holding only.
pub async fn update_holding(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HoldingPayload>,
) -> Result<Json<HoldingsResponse>, ApiRejection> {
    let (crypto_id, amount) = payload
        .validate()
        .ok_or_else(|| bad_request("Invalid payload"))?;

    let u = state.portfolio.get_or_create_user(&user.email);
    let p = state.portfolio.get_or_create_default_portfolio(u.id);
    if state
        .portfolio
        .update_holding(p.id, &crypto_id, amount)
        .is_none()
    {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Holding not found" })),
        ));
    }

    Ok(Json(holdings_response(&state, &user.email)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePayload {
    crypto_id: Option<String>,
}

/// DELETE /api/portfolio/holdings — remove by crypto id.
pub async fn delete_holding(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeletePayload>,
) -> Result<Json<HoldingsResponse>, ApiRejection> {
    let crypto_id = payload.crypto_id.as_deref().unwrap_or("").trim().to_string();
    if crypto_id.is_empty() {
        return Err(bad_request("Invalid payload"));
    }

    let u = state.portfolio.get_or_create_user(&user.email);
    let p = state.portfolio.get_or_create_default_portfolio(u.id);
    state.portfolio.delete_holding(p.id, &crypto_id);

    Ok(Json(holdings_response(&state, &user.email)))
}

// =============================================================================
// Tests
// =============================================================================
