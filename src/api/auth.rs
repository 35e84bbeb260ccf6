//! Admin key checks for corpus management routes
//!
//! Chat and health stay public. Everything nested under `/api/admin` passes
//! through [`require_admin_key`] first.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};

use super::{ApiState, error_response};

/// Header accepted as an alternative to a bearer token
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// The configured admin key
#[derive(Debug, Clone)]
pub struct AdminKey(SecretString);

impl AdminKey {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self(secret)
    }

    /// Compare a presented key without short-circuiting on the first mismatch
    #[must_use]
    pub fn verify(&self, presented: &str) -> bool {
        constant_time_eq(self.0.expose_secret().as_bytes(), presented.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Key presented by the caller, bearer token first
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    bearer
        .or_else(|| headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, error_response("unauthorized", message)).into_response()
}

/// Reject admin requests that do not carry the configured key
pub async fn require_admin_key(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(admin_key) = &state.admin_key else {
        tracing::warn!(path = %req.uri().path(), "admin key not configured, admin route left open");
        return next.run(req).await;
    };

    match presented_key(req.headers()) {
        Some(key) if admin_key.verify(key) => next.run(req).await,
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "rejected admin request with wrong key");
            unauthorized("Invalid admin key")
        }
        None => unauthorized("Admin key required"),
    }
}
