// =============================================================================
// Handler-level error conversion
// =============================================================================
//
// Internal failures are logged in full but surface to callers as a generic
// 500 JSON body. Handlers that know a more specific status/message return it
// directly as a `(StatusCode, Json<Value>)` tuple instead.
// =============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

/// Wrapper that turns any `anyhow::Error` bubbling out of a handler into a
/// generic 500 response without leaking internals.
pub struct ApiError(pub anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request handler failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Internal Server Error" })),
        )
            .into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
