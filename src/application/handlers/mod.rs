//! Command and query handlers.

pub mod progress;
