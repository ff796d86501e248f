// =============================================================================
// Session Authentication — hosted auth service, Axum extractor
// =============================================================================
//
// Session management is owned by a hosted auth service; the gateway only
// verifies bearer tokens against it. The `AuthUser` extractor short-circuits
// the request with a 401 when the token is missing or rejected. Handlers that
// allow anonymous callers take `Option<AuthUser>` instead.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::app_state::AppState;

// =============================================================================
// Auth service client
// =============================================================================

/// Identity returned by the hosted auth service for a valid session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// Client for the hosted auth service's token-verification endpoint.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Verify a session token. Any non-2xx response means the session is
    /// missing, expired, or forged — callers map all failures to 401.
    pub async fn verify(&self, token: &str) -> Result<SessionUser> {
        let resp = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .context("auth service request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("auth service rejected session: {status}");
        }

        let user: SessionUser = resp
            .json()
            .await
            .context("failed to parse auth service response")?;
        debug!(user_id = %user.id, "session verified");
        Ok(user)
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Verified session identity, extracted from `Authorization: Bearer <token>`.
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": "Unauthorized" })),
        )
            .into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(value) if value.starts_with("Bearer ") => &value[7..],
            _ => {
                warn!("missing or malformed Authorization header");
                return Err(AuthRejection);
            }
        };

        match state.auth.verify(token).await {
            Ok(user) => Ok(AuthUser {
                id: user.id,
                email: user.email,
            }),
            Err(e) => {
                warn!(error = %e, "session verification failed");
                Err(AuthRejection)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
