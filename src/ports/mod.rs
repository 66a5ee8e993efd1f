//! Ports - async traits for external collaborators.
//!
//! The application layer depends on these abstractions; adapters provide the
//! concrete implementations.

pub mod progress_store;
pub mod rate_limiter;
pub mod session_validator;
pub mod subscription_reader;

pub use progress_store::{ProgressStore, UpdateOutcome};
pub use rate_limiter::{
    OperationCategory, RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult,
    RateLimitStatus, RateLimiter,
};
pub use session_validator::SessionValidator;
pub use subscription_reader::SubscriptionReader;
