// =============================================================================
// Donation Payment Endpoints
// =============================================================================
//
// Checkout is open to anonymous visitors; a session, when present, only
// attributes the donation. Recording the donation locally is best-effort:
// a store failure is logged and never blocks the checkout redirect.
// =============================================================================

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::auth::AuthUser;
use crate::app_state::AppState;
use crate::payments::checkout::{
    verify_webhook_signature, DonationCheckout, WEBHOOK_TOLERANCE_SECS,
};
use crate::portfolio::store::{DonationStatus, NewDonation};

const MIN_DONATION_AMOUNT: f64 = 1.0;

type ApiRejection = (StatusCode, Json<serde_json::Value>);

#[derive(Deserialize)]
pub struct DonationRequest {
    amount: Option<f64>,
    currency: Option<String>,
    message: Option<String>,
}

// =============================================================================
// POST /api/create-payment-intent
// =============================================================================

pub async fn create_payment_intent(
    user: Option<AuthUser>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<DonationRequest>,
) -> Result<Json<serde_json::Value>, ApiRejection> {
    let amount = request.amount.unwrap_or(0.0);
    if !amount.is_finite() || amount < MIN_DONATION_AMOUNT {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Amount must be at least $1" })),
        ));
    }
    let currency = request.currency.as_deref().unwrap_or("usd");

    let checkout = DonationCheckout {
        amount,
        currency,
        message: request.message.as_deref(),
        user_id: user.as_ref().map(|u| u.id.as_str()),
    };
    let session = state
        .checkout
        .create_donation_session(checkout, &state.config.public_origin)
        .await
        .map_err(|err| {
            error!(error = %err, "checkout session creation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
        })?;

    // Record the pending donation; the webhook settles it later. A write
    // failure here must not lose the payment the donor already started.
    let record = NewDonation {
        user_id: user.as_ref().map(|u| u.id.clone()),
        email: user.as_ref().map(|u| u.email.clone()),
        amount,
        currency: "USDC".to_string(),
        message: request.message.clone(),
        checkout_session_id: session.id.clone(),
    };
    if let Err(err) = state.portfolio.record_donation(record) {
        warn!(error = %err, session_id = %session.id, "failed to record donation");
    }

    info!(session_id = %session.id, amount, "donation checkout session created");
    Ok(Json(serde_json::json!({ "clientSecret": session.id })))
}

// =============================================================================
// POST /api/payments/webhook
// =============================================================================

#[derive(Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Deserialize)]
struct WebhookObject {
    id: String,
}

pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiRejection> {
    let invalid = || {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid signature" })),
        )
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(invalid)?;
    if !verify_webhook_signature(
        &state.config.stripe_webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
        WEBHOOK_TOLERANCE_SECS,
    ) {
        warn!("webhook rejected: signature verification failed");
        return Err(invalid());
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|err| {
        warn!(error = %err, "webhook rejected: unparseable event");
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid payload" })),
        )
    })?;

    let status = match event.event_type.as_str() {
        "checkout.session.completed" => Some(DonationStatus::Completed),
        "checkout.session.expired" => Some(DonationStatus::Failed),
        _ => None,
    };
    if let Some(status) = status {
        let session_id = &event.data.object.id;
        match state.portfolio.set_donation_status(session_id, status) {
            Some(donation) => {
                info!(session_id = %session_id, status = ?donation.status, "donation settled")
            }
            None => warn!(session_id = %session_id, "webhook for unknown donation"),
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}

// =============================================================================
// Tests
// =============================================================================
