//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the Mindpath domain.

mod auth;
mod errors;
mod ids;
mod percentage;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::UserId;
pub use percentage::Percentage;
pub use timestamp::Timestamp;
