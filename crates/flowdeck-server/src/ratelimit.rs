//! Rate limiting and request logging middleware.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    state::{InMemoryState, NotKeyed},
};
use serde::Serialize;

use crate::state::AppState;

/// Rate limiter type alias (uses default clock).
pub type SharedRateLimiter =
    Arc<RateLimiter<NotKeyed, InMemoryState, governor::clock::DefaultClock>>;

/// Rate limit error response.
#[derive(Debug, Serialize)]
struct RateLimitError {
    error: String,
    code: u16,
    retry_after_seconds: Option<u64>,
}

/// Create a rate limiter with the specified requests per minute.
pub fn create_rate_limiter(requests_per_minute: u32) -> SharedRateLimiter {
    let quota = Quota::per_minute(
        NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::new(60).unwrap()),
    );
    Arc::new(RateLimiter::direct(quota))
}

/// Get the process-wide rate limiter, initialized from the first config seen.
fn get_global_limiter(rpm: u32) -> SharedRateLimiter {
    use std::sync::OnceLock;
    static LIMITER: OnceLock<SharedRateLimiter> = OnceLock::new();
    LIMITER.get_or_init(|| create_rate_limiter(rpm)).clone()
}

/// Rate limiting middleware for API endpoints.
///
/// Uses a global limiter (not per-IP): client IP extraction depends on
/// reverse-proxy configuration, which is outside this server's scope.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.rate_limiting {
        return next.run(request).await;
    }

    let limiter = get_global_limiter(state.config.api_rpm);

    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_not_until) => {
            let retry_after = 1u64;

            tracing::warn!(
                path = %request.uri().path(),
                retry_after_seconds = retry_after,
                "Rate limit exceeded"
            );

            let error = RateLimitError {
                error: "Rate limit exceeded".to_string(),
                code: 429,
                retry_after_seconds: Some(retry_after),
            };

            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after.to_string())],
                axum::Json(error),
            )
                .into_response()
        }
    }
}

/// Structured request logging middleware.
///
/// Logs method, path, status, and duration for every request.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rate_limiter_allows_first_request() {
        let limiter = create_rate_limiter(60);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_zero_rpm_falls_back_to_default() {
        // NonZeroU32::new(0) is None; the limiter still works.
        let limiter = create_rate_limiter(0);
        assert!(limiter.check().is_ok());
    }
}
