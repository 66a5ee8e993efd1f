//! Rate limiting configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::rate_limiter::{CategoryLimit, RateLimitConfig};

/// Rate limiting configuration, per operation category.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// GET requests per minute per user
    #[serde(default = "default_read_per_minute")]
    pub read_per_minute: u32,

    /// POST requests per minute per user
    #[serde(default = "default_write_per_minute")]
    pub write_per_minute: u32,

    /// Unlock attempts per minute per user
    #[serde(default = "default_unlock_per_minute")]
    pub unlock_per_minute: u32,

    /// First block length after a violation, in seconds
    #[serde(default = "default_base_block_secs")]
    pub base_block_secs: u32,

    /// Ceiling for escalated blocks, in seconds
    #[serde(default = "default_max_block_secs")]
    pub max_block_secs: u32,
}

impl RateLimitSettings {
    /// Validate rate limit configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let budgets = [
            self.read_per_minute,
            self.write_per_minute,
            self.unlock_per_minute,
            self.base_block_secs,
            self.max_block_secs,
        ];
        if budgets.iter().any(|&v| v == 0) {
            return Err(ValidationError::InvalidRateLimit);
        }
        if self.base_block_secs > self.max_block_secs {
            return Err(ValidationError::InvalidRateLimit);
        }
        Ok(())
    }

    /// Convert into the limiter's runtime configuration.
    pub fn to_limiter_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            read: CategoryLimit {
                limit: self.read_per_minute,
                window_secs: 60,
            },
            write: CategoryLimit {
                limit: self.write_per_minute,
                window_secs: 60,
            },
            unlock: CategoryLimit {
                limit: self.unlock_per_minute,
                window_secs: 60,
            },
            base_block_secs: self.base_block_secs,
            max_block_secs: self.max_block_secs,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            read_per_minute: default_read_per_minute(),
            write_per_minute: default_write_per_minute(),
            unlock_per_minute: default_unlock_per_minute(),
            base_block_secs: default_base_block_secs(),
            max_block_secs: default_max_block_secs(),
        }
    }
}

fn default_read_per_minute() -> u32 {
    60
}

fn default_write_per_minute() -> u32 {
    20
}

fn default_unlock_per_minute() -> u32 {
    5
}

fn default_base_block_secs() -> u32 {
    30
}

fn default_max_block_secs() -> u32 {
    900
}
