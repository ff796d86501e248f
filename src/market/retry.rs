// =============================================================================
// Upstream fetch with bounded retry
// =============================================================================
//
// Policy: 3 total attempts (1 initial + 2 retries). Only HTTP 429 and 5xx are
// retried; any other non-2xx status fails immediately. Backoff before retry
// `n` is min(500ms * n^2, 3000ms), so worst-case added latency is bounded.
// Provider-level error payloads (HTTP 200 with an error field) are handled by
// the caller and never reach the retry path.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tracing::warn;

/// Total attempts per upstream fetch (1 initial + 2 retries).
pub const MAX_ATTEMPTS: u32 = 3;

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 3000;

/// Delay before retry `attempt` (1-based): min(500ms * attempt^2, 3000ms).
pub fn backoff_delay(attempt: u32) -> Duration {
    let attempt = u64::from(attempt);
    Duration::from_millis((BACKOFF_BASE_MS * attempt * attempt).min(BACKOFF_CAP_MS))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// GET `url` and parse the body as JSON, retrying transient failures per the
/// policy above. Transport-level errors (connection refused, timeout) are not
/// retried; they indicate the upstream is unreachable rather than throttling.
pub async fn get_json_with_retry(
    client: &reqwest::Client,
    url: &str,
) -> Result<serde_json::Value> {
    let mut attempt = 0;
    loop {
        attempt += 1;

        let resp = client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .context("upstream request failed")?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json()
                .await
                .context("failed to parse upstream response body");
        }

        let body = resp.text().await.unwrap_or_default();
        if is_retryable(status) && attempt < MAX_ATTEMPTS {
            let delay = backoff_delay(attempt);
            warn!(
                status = %status,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "transient upstream failure — backing off before retry"
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        anyhow::bail!("upstream returned {status} after {attempt} attempt(s): {body}");
    }
}

// =============================================================================
// Tests
// =============================================================================
