//! Progress store port.
//!
//! Defines the persistence contract for progression state, practice logs,
//! baselines, and weekly deltas.
//!
//! # Design
//!
//! - **Row-level operations only**: the engine never assumes multi-row
//!   transactions beyond the single-row conditional update.
//! - **Conditional write**: stage mutations are applied only while the stored
//!   stage still equals the stage read at decision time; this is the sole
//!   per-user serialization mechanism.
//! - **Idempotent log upsert**: one row per (user, practice, date).
//!
//! # Example
//!
//! ```ignore
//! async fn advance(
//!     store: &dyn ProgressStore,
//!     mut state: ProgressState,
//!     target: Stage,
//! ) -> Result<UpdateOutcome, DomainError> {
//!     let read_stage = state.current_stage;
//!     state.advance_to(target, Timestamp::now())?;
//!     store.update_progress_if_stage(&state, read_stage).await
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::assessment::{BaselineRecord, WeeklyDelta};
use crate::domain::foundation::{DomainError, UserId};
use crate::domain::progression::{PracticeLogEntry, ProgressState, Stage};

/// Outcome of a conditional progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The stored stage matched and the new state was persisted.
    Applied,
    /// The stored stage no longer matched; nothing was written.
    StaleStage,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// Persistence port for the progression engine.
///
/// Implementations must ensure:
/// - At most one progress row per user
/// - Compare-and-swap semantics for `update_progress_if_stage`
/// - Write-once semantics for baselines
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Get a user's progress record.
    ///
    /// Returns `None` for users who have never touched the curriculum.
    async fn get_progress(&self, user_id: &UserId) -> Result<Option<ProgressState>, DomainError>;

    /// Create the initial progress record for a user.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the user already has a record
    /// - `DatabaseError` on persistence failure
    async fn create_progress(&self, state: &ProgressState) -> Result<(), DomainError>;

    /// Persist `state` only while the stored stage equals `expected_stage`.
    ///
    /// A `StaleStage` outcome means a concurrent writer advanced the user
    /// between read and write; the caller decides whether to retry or deny.
    async fn update_progress_if_stage(
        &self,
        state: &ProgressState,
        expected_stage: Stage,
    ) -> Result<UpdateOutcome, DomainError>;

    /// Upsert one practice log entry, keyed by (user, practice, date).
    async fn upsert_practice_log(&self, entry: &PracticeLogEntry) -> Result<(), DomainError>;

    /// All of a user's practice log entries dated `since` or later.
    async fn practice_logs_since(
        &self,
        user_id: &UserId,
        since: NaiveDate,
    ) -> Result<Vec<PracticeLogEntry>, DomainError>;

    /// Get a user's fixed baseline measurement.
    async fn get_baseline(&self, user_id: &UserId) -> Result<Option<BaselineRecord>, DomainError>;

    /// Save the baseline. Write-once: a baseline is never overwritten.
    ///
    /// # Errors
    ///
    /// - `BaselineAlreadyExists` if one is already stored
    /// - `DatabaseError` on persistence failure
    async fn save_baseline(&self, baseline: &BaselineRecord) -> Result<(), DomainError>;

    /// Upsert the weekly delta snapshot, keyed by (user, week start).
    async fn save_weekly_delta(&self, delta: &WeeklyDelta) -> Result<(), DomainError>;

    /// The most recent weekly delta snapshot, if any.
    async fn latest_weekly_delta(
        &self,
        user_id: &UserId,
    ) -> Result<Option<WeeklyDelta>, DomainError>;
}
