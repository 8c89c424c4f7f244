//! API key authentication
//!
//! Protected routes require an `X-API-KEY` header equal to the configured
//! key. Anything else is rejected with `401 {"error": "Unauthorized"}`.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use super::handlers::{ApiError, AppState};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time comparison of the provided and configured keys
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Authentication middleware - validates the API key header
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if !keys_match(provided, state.api_key.as_bytes()) {
        warn!("Rejected request to {} with invalid API key", req.uri().path());
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("Unauthorized")),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"secret", b"secret"));
        assert!(!keys_match(b"secreT", b"secret"));
        assert!(!keys_match(b"secret1", b"secret"));
        assert!(!keys_match(b"", b"secret"));
    }
}
