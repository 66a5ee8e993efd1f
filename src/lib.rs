//! Mindpath - Stage Progression & Entitlement Engine
//!
//! This crate gates a seven-stage coaching curriculum behind measured
//! competence (practice adherence, streaks, baseline-relative score deltas)
//! and subscription entitlement.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
