//! Rate limiter adapters.

mod in_memory;

pub use in_memory::{CategoryLimit, InMemoryRateLimiter, RateLimitConfig};
