//! Authentication middleware.
//!
//! Token-based authentication for the API routes. Token comparison uses
//! constant-time comparison to prevent timing attacks.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// Authentication error.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Missing authorization header.
    MissingToken,
    /// Invalid token format.
    InvalidFormat,
    /// Token validation failed.
    InvalidToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidFormat => write!(f, "Invalid authorization format"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidFormat => (StatusCode::BAD_REQUEST, "Invalid authorization format"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Compare two strings in constant time.
///
/// The comparison takes the same amount of time regardless of how many
/// characters match; a dummy comparison keeps timing consistent when the
/// lengths differ.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() == b_bytes.len() {
        a_bytes.ct_eq(b_bytes).into()
    } else {
        let _ = a_bytes.ct_eq(a_bytes);
        false
    }
}

/// Authentication middleware function.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    validate_request(&request, &state)?;
    Ok(next.run(request).await)
}

/// Validate a request against the configured token.
fn validate_request(request: &Request<Body>, state: &AppState) -> Result<(), AuthError> {
    // If no auth token is configured (localhost mode), skip auth entirely
    let Some(ref expected_token) = state.config.auth_token else {
        return Ok(());
    };

    let Some(auth_header) = request.headers().get(AUTHORIZATION) else {
        return Err(AuthError::MissingToken);
    };

    let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidFormat)?;
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(AuthError::InvalidFormat);
    };

    if constant_time_eq(token, expected_token) {
        Ok(())
    } else {
        Err(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secres"));
        assert!(!constant_time_eq("secret", "secret-longer"));
        assert!(constant_time_eq("", ""));
    }
}
