//! HTTP adapter for the progress API.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{ProgressApiError, ProgressAppState};
pub use routes::progress_routes;
