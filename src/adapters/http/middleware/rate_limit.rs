//! Rate limiting middleware for axum.
//!
//! This module provides middleware that enforces per-user limits using the
//! `RateLimiter` port.
//!
//! # Architecture
//!
//! Requests are bucketed by (user, category): GET traffic draws from the
//! `read` budget and POST traffic from the `write` budget. Stage unlocks have
//! a stricter `unlock` budget that the handler checks itself via
//! [`RateLimitCheck`], because the category depends on the request body, not
//! the method. Unauthenticated requests pass through; they fail at the auth
//! extractor instead.
//!
//! Rate limit status is returned in standard HTTP headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: Seconds to wait (only on 429 response)
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get, middleware};
//! use std::sync::Arc;
//!
//! let limiter: Arc<dyn RateLimiter> = Arc::new(InMemoryRateLimiter::with_defaults());
//!
//! let app = Router::new()
//!     .route("/api/resource", get(handler))
//!     .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthenticatedUser, UserId};
use crate::ports::{
    OperationCategory, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

/// Rate limiter middleware state.
pub type RateLimiterState = Arc<dyn RateLimiter>;

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// Unix timestamp when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// Maps an HTTP method to the budget it draws from.
fn category_for_method(method: &Method) -> OperationCategory {
    if method.is_safe() {
        OperationCategory::Read
    } else {
        OperationCategory::Write
    }
}

/// Rate limiting middleware that enforces per-user method budgets.
///
/// This middleware:
/// 1. Reads the authenticated user from request extensions (set by auth)
/// 2. Picks the category from the HTTP method (safe methods read, rest write)
/// 3. Returns 429 Too Many Requests with `Retry-After` if the budget is spent
/// 4. Adds rate limit headers to allowed responses
///
/// On limiter errors the request is allowed through; throttling must never
/// take the API down with it.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    request: Request,
    next: Next,
) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>().cloned();

    let status = match user {
        Some(user) => {
            let key = RateLimitKey::new(user.id.clone(), category_for_method(request.method()));
            match limiter.check(key).await {
                Ok(RateLimitResult::Denied(denied)) => {
                    return rate_limit_response(denied.limit, 0, denied.retry_after_secs);
                }
                Ok(RateLimitResult::Allowed(status)) => Some(status),
                Err(e) => {
                    tracing::warn!("Rate limiter unavailable: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    let mut response = next.run(request).await;

    if let Some(status) = status {
        add_rate_limit_headers(&mut response, &status);
    }

    response
}

/// Create a 429 Too Many Requests response.
fn rate_limit_response(limit: u32, remaining: u32, retry_after_secs: u32) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({
            "error": "Rate limit exceeded",
            "code": "RATE_LIMIT_EXCEEDED",
            "retryAfterSecs": retry_after_secs
        })),
    )
        .into_response();

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert(self::headers::X_RATELIMIT_LIMIT.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert(self::headers::X_RATELIMIT_REMAINING.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
        headers.insert("Retry-After", value);
    }

    response
}

/// Add rate limit headers to a response.
fn add_rate_limit_headers(response: &mut Response, status: &RateLimitStatus) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&status.limit.to_string()) {
        headers.insert(self::headers::X_RATELIMIT_LIMIT.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&status.remaining.to_string()) {
        headers.insert(self::headers::X_RATELIMIT_REMAINING.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&status.reset_at.as_unix_secs().to_string()) {
        headers.insert(self::headers::X_RATELIMIT_RESET.clone(), value);
    }
}

/// Rate limit checker for per-category limiting in handlers.
///
/// The middleware only sees the HTTP method, so actions with stricter budgets
/// than their method implies check again here. Stage unlocks use this with
/// [`OperationCategory::Unlock`].
///
/// # Example
///
/// ```ignore
/// async fn unlock(
///     RequireAuth(user): RequireAuth,
///     rate_check: RateLimitCheck,
/// ) -> Result<impl IntoResponse, RateLimitRejection> {
///     rate_check.check(&user.id, OperationCategory::Unlock).await?;
///     // ... handle request
/// }
/// ```
#[derive(Clone)]
pub struct RateLimitCheck {
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimitCheck {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Check the budget for a specific operation category.
    pub async fn check(
        &self,
        user_id: &UserId,
        category: OperationCategory,
    ) -> Result<(), RateLimitRejection> {
        let key = RateLimitKey::new(user_id.clone(), category);
        match self.limiter.check(key).await {
            Ok(RateLimitResult::Allowed(_)) => Ok(()),
            Ok(RateLimitResult::Denied(denied)) => Err(RateLimitRejection {
                limit: denied.limit,
                retry_after_secs: denied.retry_after_secs,
            }),
            Err(e) => {
                tracing::warn!("Rate limiter unavailable: {}", e);
                // Fail open.
                Ok(())
            }
        }
    }
}

/// Rejection for rate limit exceeded.
#[derive(Debug, Clone)]
pub struct RateLimitRejection {
    /// The rate limit that was exceeded.
    pub limit: u32,
    /// Seconds until the limit resets.
    pub retry_after_secs: u32,
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        rate_limit_response(self.limit, 0, self.retry_after_secs)
    }
}
