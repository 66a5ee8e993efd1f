//! Router assembly: routes, middleware stack, and cross-cutting layers.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::ports::{RateLimiter, SessionValidator};

use super::middleware::{auth_middleware, rate_limit_middleware};
use super::progress::{progress_routes, ProgressAppState};

/// Request id generator for the `x-request-id` header.
#[derive(Clone, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Builds the full application router.
///
/// Layer order matters: auth runs before rate limiting so the limiter can key
/// on the authenticated user, and both run inside the tracing, request-id,
/// timeout, and CORS layers.
pub fn app(
    state: ProgressAppState,
    validator: Arc<dyn SessionValidator>,
    limiter: Arc<dyn RateLimiter>,
    request_timeout: Duration,
) -> Router {
    let api = Router::new()
        .nest("/api/progress", progress_routes())
        .layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(validator, auth_middleware))
        .with_state(state);

    api.layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
