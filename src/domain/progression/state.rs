//! The per-user progression record.

use serde::{Deserialize, Serialize};

use super::errors::ProgressionError;
use super::practice::{effective_required_practices, PracticeType, ScreeningFlag};
use super::stage::Stage;
use crate::domain::foundation::{Percentage, Timestamp, UserId};

/// One user's position in the curriculum plus the measurements that gate it.
///
/// Stage, stage start, and streak are mutated only through [`advance_to`]
/// (the transactor path) and [`record_practice_metrics`] (the recompute
/// path); persistence goes through the store's conditional write.
///
/// [`advance_to`]: ProgressState::advance_to
/// [`record_practice_metrics`]: ProgressState::record_practice_metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub user_id: UserId,
    pub current_stage: Stage,
    pub stage_started_at: Timestamp,
    pub adherence: Percentage,
    pub consecutive_days: u32,
    pub screening_flags: Vec<ScreeningFlag>,
    pub disabled_practices: Vec<PracticeType>,
    pub updated_at: Timestamp,
}

impl ProgressState {
    /// A brand-new user at the entry stage with no measurements.
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            current_stage: Stage::FIRST,
            stage_started_at: now,
            adherence: Percentage::ZERO,
            consecutive_days: 0,
            screening_flags: Vec::new(),
            disabled_practices: Vec::new(),
            updated_at: now,
        }
    }

    pub fn has_flag(&self, flag: ScreeningFlag) -> bool {
        self.screening_flags.contains(&flag)
    }

    /// True when a coach has approved the terminal transition.
    pub fn manual_review_approved(&self) -> bool {
        self.has_flag(ScreeningFlag::ManualReviewApproved)
    }

    /// The practices this user must complete daily right now.
    pub fn required_practice_set(&self) -> Vec<PracticeType> {
        effective_required_practices(self.current_stage, &self.disabled_practices)
    }

    /// Stores freshly recomputed adherence figures.
    pub fn record_practice_metrics(
        &mut self,
        adherence: Percentage,
        consecutive_days: u32,
        now: Timestamp,
    ) {
        self.adherence = adherence;
        self.consecutive_days = consecutive_days;
        self.updated_at = now;
    }

    /// Advances to `target`, which must be exactly one stage above current.
    ///
    /// Resets the streak (the new stage's larger required set starts a fresh
    /// chain) and stamps the stage start. Eligibility and entitlement checks
    /// belong to the caller; this only enforces the ±1 shape of the move.
    pub fn advance_to(&mut self, target: Stage, now: Timestamp) -> Result<(), ProgressionError> {
        if self.current_stage.next() != Some(target) {
            return Err(ProgressionError::invalid_target(
                self.current_stage,
                target.value(),
            ));
        }
        self.current_stage = target;
        self.stage_started_at = now;
        self.consecutive_days = 0;
        self.updated_at = now;
        Ok(())
    }
}
