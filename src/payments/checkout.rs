// =============================================================================
// Hosted Checkout Client — payment processor sessions + webhook signatures
// =============================================================================
//
// SECURITY: The secret key is sent only as a bearer header and never logged
// or serialized. Webhook signatures are HMAC-SHA256 over "{timestamp}.{body}"
// and compared in constant time.
// =============================================================================

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed skew between the webhook timestamp and our clock.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// A created checkout session. Only the fields the dashboard needs.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parameters for one donation checkout session.
#[derive(Debug, Clone)]
pub struct DonationCheckout<'a> {
    /// Donation amount in whole currency units.
    pub amount: f64,
    pub currency: &'a str,
    pub message: Option<&'a str>,
    pub user_id: Option<&'a str>,
}

/// Client for the hosted payment processor's checkout-session API.
#[derive(Clone)]
pub struct CheckoutClient {
    base_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl CheckoutClient {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            client,
        }
    }

    /// POST /v1/checkout/sessions — create a hosted checkout session for a
    /// donation. `origin` is the dashboard origin used for redirect URLs.
    #[instrument(skip(self, checkout), name = "checkout::create_session")]
    pub async fn create_donation_session(
        &self,
        checkout: DonationCheckout<'_>,
        origin: &str,
    ) -> Result<CheckoutSession> {
        // The processor expects integer minor units (cents).
        let unit_amount = (checkout.amount * 100.0).round() as i64;
        let description = checkout
            .message
            .unwrap_or("Thanks for supporting CryptoDash");

        let params: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                checkout.currency.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                "CryptoDash donation".to_string(),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                description.to_string(),
            ),
            (
                "success_url",
                format!("{origin}/donation/success?session_id={{CHECKOUT_SESSION_ID}}"),
            ),
            ("cancel_url", format!("{origin}/donation/cancelled")),
            (
                "metadata[userId]",
                checkout.user_id.unwrap_or("").to_string(),
            ),
            (
                "metadata[message]",
                checkout.message.unwrap_or("").to_string(),
            ),
        ];

        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .context("checkout session request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse checkout session response")?;

        if !status.is_success() {
            anyhow::bail!("checkout session create returned {status}: {body}");
        }

        let session: CheckoutSession =
            serde_json::from_value(body).context("checkout session response missing id")?;
        debug!(session_id = %session.id, "checkout session created");
        Ok(session)
    }
}

impl std::fmt::Debug for CheckoutClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutClient")
            .field("base_url", &self.base_url)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Webhook signatures
// =============================================================================

/// HMAC-SHA256 hex signature of `"{timestamp}.{payload}"` under `secret`.
/// Exposed so tests (and any local webhook replayer) can produce valid
/// signatures.
pub fn sign_webhook_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a `Stripe-Signature`-style header (`t=<ts>,v1=<hex>[,v1=...]`)
/// against `payload`. The timestamp must be within `tolerance_secs` of
/// `now_ts`, and at least one `v1` candidate must match in constant time.
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_ts: i64,
    tolerance_secs: i64,
) -> bool {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let Some(ts) = timestamp else {
        return false;
    };
    if (now_ts - ts).abs() > tolerance_secs || candidates.is_empty() {
        return false;
    }

    let expected = sign_webhook_payload(secret, ts, payload);
    candidates
        .iter()
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()))
}

/// Compare two byte slices in constant time. Always examines every byte so a
/// mismatch position is not observable through timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// =============================================================================
// Tests
// =============================================================================
