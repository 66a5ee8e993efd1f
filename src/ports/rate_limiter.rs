//! Rate limiting port for protecting the progress API.
//!
//! Fixed-window counting keyed by user and operation category, with
//! violation tracking: repeat offenders receive escalating temporary blocks.
//! Limiter state is a throttling aid only; business invariants never depend
//! on it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId};

/// Port for rate limiting operations.
///
/// Implementations should be thread-safe and support concurrent access.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check if a request is allowed, consuming a slot if so.
    ///
    /// Returns `Allowed` with remaining quota or `Denied` with retry info.
    /// The retry hint is always bounded.
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError>;

    /// Current status without consuming a slot.
    async fn status(&self, key: RateLimitKey) -> Result<RateLimitStatus, RateLimitError>;

    /// Reset counters and violations for a key (admin operation).
    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError>;
}

/// What kind of work the request performs. Each category has its own budget.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    /// Snapshot reads.
    Read,
    /// Recomputes, delta snapshots, and other writes.
    Write,
    /// Stage unlock attempts; the tightest budget.
    Unlock,
}

impl OperationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationCategory::Read => "read",
            OperationCategory::Write => "write",
            OperationCategory::Unlock => "unlock",
        }
    }
}

impl fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key identifying what to rate limit: one budget per user per category.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    pub user_id: UserId,
    pub category: OperationCategory,
}

impl RateLimitKey {
    pub fn new(user_id: UserId, category: OperationCategory) -> Self {
        Self { user_id, category }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.category)
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed; includes current status.
    Allowed(RateLimitStatus),
    /// Request is denied; includes denial details.
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

/// Current rate limit status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
    /// Window duration in seconds.
    pub window_secs: u32,
}

/// Details of a rate limit denial.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Seconds until the client should retry. Bounded.
    pub retry_after_secs: u32,
    /// The category that triggered the denial.
    pub category: OperationCategory,
    /// How many times this key has been denied recently.
    pub violations: u32,
}

/// Errors that can occur during rate limiting operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Rate limiter backend is unavailable.
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}
