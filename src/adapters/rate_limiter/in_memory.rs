//! In-memory fixed-window rate limiter with violation escalation.
//!
//! Each (user, category) key gets a fixed window of requests. A key that
//! keeps hammering a closed window accrues violations, and each violation
//! doubles a temporary block, up to a cap, so the advertised retry-after is
//! always bounded. State is process-local: with multiple instances a client
//! sees a proportionally looser effective limit, which is acceptable because
//! throttling is an aid here, never a correctness dependency.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    OperationCategory, RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult,
    RateLimitStatus, RateLimiter,
};

/// Per-category request budget.
#[derive(Debug, Clone, Copy)]
pub struct CategoryLimit {
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length in seconds.
    pub window_secs: u32,
}

/// Limiter configuration.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub read: CategoryLimit,
    pub write: CategoryLimit,
    pub unlock: CategoryLimit,
    /// First block length after a violation, in seconds.
    pub base_block_secs: u32,
    /// Ceiling for escalated blocks, in seconds. Bounds every retry-after.
    pub max_block_secs: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            read: CategoryLimit {
                limit: 60,
                window_secs: 60,
            },
            write: CategoryLimit {
                limit: 20,
                window_secs: 60,
            },
            unlock: CategoryLimit {
                limit: 5,
                window_secs: 60,
            },
            base_block_secs: 30,
            max_block_secs: 900,
        }
    }
}

impl RateLimitConfig {
    fn for_category(&self, category: OperationCategory) -> CategoryLimit {
        match category {
            OperationCategory::Read => self.read,
            OperationCategory::Write => self.write,
            OperationCategory::Unlock => self.unlock,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    window_start: Timestamp,
    count: u32,
    violations: u32,
    blocked_until: Option<Timestamp>,
}

/// Thread-safe in-memory implementation of [`RateLimiter`].
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    entries: Mutex<HashMap<RateLimitKey, Entry>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    /// Removes entries whose window, block, and violation memory have all
    /// lapsed. Call periodically from a background task.
    pub async fn sweep_expired(&self) {
        let now = Timestamp::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|key, entry| {
            let window = self.config.for_category(key.category).window_secs;
            let idle_cutoff = entry
                .window_start
                .add_seconds(i64::from(window) + i64::from(self.config.max_block_secs));
            let still_blocked = entry
                .blocked_until
                .map(|until| now.is_before(&until))
                .unwrap_or(false);
            still_blocked || now.is_before(&idle_cutoff)
        });
    }

    fn block_secs(&self, violations: u32) -> u32 {
        let doubled = self
            .config
            .base_block_secs
            .saturating_mul(2u32.saturating_pow(violations.saturating_sub(1)));
        doubled.min(self.config.max_block_secs)
    }

    fn status_of(&self, entry: &Entry, category: OperationCategory, now: Timestamp) -> RateLimitStatus {
        let limits = self.config.for_category(category);
        let window_end = entry.window_start.add_seconds(i64::from(limits.window_secs));
        let in_window = now.is_before(&window_end);
        RateLimitStatus {
            limit: limits.limit,
            remaining: if in_window {
                limits.limit.saturating_sub(entry.count)
            } else {
                limits.limit
            },
            reset_at: if in_window { window_end } else { now },
            window_secs: limits.window_secs,
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        let now = Timestamp::now();
        let limits = self.config.for_category(key.category);
        let mut entries = self.entries.lock().await;

        let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
            window_start: now,
            count: 0,
            violations: 0,
            blocked_until: None,
        });

        // Escalated block takes precedence over the window.
        if let Some(until) = entry.blocked_until {
            if now.is_before(&until) {
                let retry_after_secs = until.seconds_since(&now).max(1) as u32;
                return Ok(RateLimitResult::Denied(RateLimitDenied {
                    limit: limits.limit,
                    retry_after_secs,
                    category: key.category,
                    violations: entry.violations,
                }));
            }
            entry.blocked_until = None;
        }

        let window_end = entry.window_start.add_seconds(i64::from(limits.window_secs));
        if !now.is_before(&window_end) {
            entry.window_start = now;
            entry.count = 0;
        }

        if entry.count < limits.limit {
            entry.count += 1;
            let status = self.status_of(entry, key.category, now);
            return Ok(RateLimitResult::Allowed(status));
        }

        // Window exhausted: record a violation and escalate the block.
        entry.violations += 1;
        let block_secs = self.block_secs(entry.violations);
        entry.blocked_until = Some(now.add_seconds(i64::from(block_secs)));

        Ok(RateLimitResult::Denied(RateLimitDenied {
            limit: limits.limit,
            retry_after_secs: block_secs,
            category: key.category,
            violations: entry.violations,
        }))
    }

    async fn status(&self, key: RateLimitKey) -> Result<RateLimitStatus, RateLimitError> {
        let now = Timestamp::now();
        let limits = self.config.for_category(key.category);
        let entries = self.entries.lock().await;

        Ok(match entries.get(&key) {
            Some(entry) => self.status_of(entry, key.category, now),
            None => RateLimitStatus {
                limit: limits.limit,
                remaining: limits.limit,
                reset_at: now,
                window_secs: limits.window_secs,
            },
        })
    }

    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError> {
        let mut entries = self.entries.lock().await;
        entries.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    fn key(category: OperationCategory) -> RateLimitKey {
        RateLimitKey::new(UserId::new("user-1").unwrap(), category)
    }

    fn tight_config() -> RateLimitConfig {
        RateLimitConfig {
            read: CategoryLimit {
                limit: 3,
                window_secs: 60,
            },
            write: CategoryLimit {
                limit: 2,
                window_secs: 60,
            },
            unlock: CategoryLimit {
                limit: 1,
                window_secs: 60,
            },
            base_block_secs: 30,
            max_block_secs: 120,
        }
    }

    #[tokio::test]
    async fn allows_up_to_the_limit_then_denies() {
        let limiter = InMemoryRateLimiter::new(tight_config());

        for _ in 0..3 {
            let result = limiter.check(key(OperationCategory::Read)).await.unwrap();
            assert!(result.is_allowed());
        }
        let result = limiter.check(key(OperationCategory::Read)).await.unwrap();
        assert!(result.is_denied());
    }

    #[tokio::test]
    async fn categories_have_independent_budgets() {
        let limiter = InMemoryRateLimiter::new(tight_config());

        let result = limiter.check(key(OperationCategory::Unlock)).await.unwrap();
        assert!(result.is_allowed());
        let result = limiter.check(key(OperationCategory::Unlock)).await.unwrap();
        assert!(result.is_denied());

        // Read budget untouched.
        let result = limiter.check(key(OperationCategory::Read)).await.unwrap();
        assert!(result.is_allowed());
    }

    #[tokio::test]
    async fn remaining_counts_down() {
        let limiter = InMemoryRateLimiter::new(tight_config());

        match limiter.check(key(OperationCategory::Read)).await.unwrap() {
            RateLimitResult::Allowed(status) => {
                assert_eq!(status.limit, 3);
                assert_eq!(status.remaining, 2);
            }
            RateLimitResult::Denied(_) => panic!("first request should be allowed"),
        }
    }

    #[tokio::test]
    async fn repeat_violations_escalate_and_cap() {
        let limiter = InMemoryRateLimiter::new(tight_config());
        let k = key(OperationCategory::Write);

        // Exhaust the window.
        for _ in 0..2 {
            limiter.check(k.clone()).await.unwrap();
        }

        // First violation: base block.
        let first = match limiter.check(k.clone()).await.unwrap() {
            RateLimitResult::Denied(denied) => denied,
            RateLimitResult::Allowed(_) => panic!("window should be exhausted"),
        };
        assert_eq!(first.violations, 1);
        assert_eq!(first.retry_after_secs, 30);

        // While blocked, further attempts keep the same violation count but
        // stay denied with a bounded retry hint.
        let during_block = match limiter.check(k.clone()).await.unwrap() {
            RateLimitResult::Denied(denied) => denied,
            RateLimitResult::Allowed(_) => panic!("block should hold"),
        };
        assert!(during_block.retry_after_secs <= tight_config().max_block_secs);
        assert!(during_block.retry_after_secs >= 1);
    }

    #[tokio::test]
    async fn escalated_blocks_never_exceed_the_cap() {
        let limiter = InMemoryRateLimiter::new(tight_config());
        assert_eq!(limiter.block_secs(1), 30);
        assert_eq!(limiter.block_secs(2), 60);
        assert_eq!(limiter.block_secs(3), 120);
        assert_eq!(limiter.block_secs(10), 120);
        assert_eq!(limiter.block_secs(u32::MAX), 120);
    }

    #[tokio::test]
    async fn reset_restores_the_full_budget() {
        let limiter = InMemoryRateLimiter::new(tight_config());
        let k = key(OperationCategory::Unlock);

        limiter.check(k.clone()).await.unwrap();
        assert!(limiter.check(k.clone()).await.unwrap().is_denied());

        limiter.reset(k.clone()).await.unwrap();
        assert!(limiter.check(k).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn status_does_not_consume_quota() {
        let limiter = InMemoryRateLimiter::new(tight_config());
        let k = key(OperationCategory::Read);

        for _ in 0..5 {
            limiter.status(k.clone()).await.unwrap();
        }
        let status = limiter.status(k).await.unwrap();
        assert_eq!(status.remaining, 3);
    }

    #[tokio::test]
    async fn sweep_keeps_blocked_entries() {
        let limiter = InMemoryRateLimiter::new(tight_config());
        let k = key(OperationCategory::Unlock);

        limiter.check(k.clone()).await.unwrap();
        limiter.check(k.clone()).await.unwrap(); // violation, now blocked

        limiter.sweep_expired().await;
        // The block must survive a sweep.
        assert!(limiter.check(k).await.unwrap().is_denied());
    }
}
