//! Axum router configuration for the progress endpoint.
//!
//! This module defines the route structure for the progress API and wires
//! it to the handlers.

use axum::{routing::get, Router};

use super::handlers::{get_progress, post_progress, ProgressAppState};

/// Create the progress API router.
///
/// # Routes
///
/// Both routes require authentication:
/// - `GET /` - Full progress snapshot for the current user
/// - `POST /` - Dispatch a progress action (`recalculate`, `check_unlock`,
///   `unlock_stage`, `weekly_delta`)
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::progress::{progress_routes, ProgressAppState};
///
/// let app_state = ProgressAppState { /* ... */ };
/// let app = Router::new()
///     .nest("/api/progress", progress_routes())
///     .with_state(app_state);
/// ```
pub fn progress_routes() -> Router<ProgressAppState> {
    Router::new().route("/", get(get_progress).post(post_progress))
}
