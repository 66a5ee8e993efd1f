//! RecalculateProgressHandler - Command handler for the adherence recompute path.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::progression::{
    calculate_adherence, calculate_consecutive_days, PracticeLogEntry, PracticeType,
    ProgressState, ProgressionError, DEFAULT_WINDOW_DAYS,
};
use crate::ports::{ProgressStore, UpdateOutcome};

/// How far back the streak walk may need to read. A streak older than this
/// is reported at the cap.
const STREAK_LOOKBACK_DAYS: i64 = 90;

/// One practice completion reported with the recompute request.
#[derive(Debug, Clone)]
pub struct PracticeReport {
    pub practice: PracticeType,
    pub date: NaiveDate,
    pub completed: bool,
}

/// Command to record practice reports and recompute adherence metrics.
#[derive(Debug, Clone)]
pub struct RecalculateProgressCommand {
    pub user_id: UserId,
    /// Entries to upsert before recomputing. May be empty for a pure recompute.
    pub reports: Vec<PracticeReport>,
}

/// Result of a recompute: the freshly persisted state.
#[derive(Debug, Clone)]
pub struct RecalculateProgressResult {
    pub state: ProgressState,
}

/// Handler for the recompute-and-persist path.
///
/// Log upserts are idempotent; the metric write goes through the store's
/// conditional update so a concurrent stage advance can never be clobbered
/// with metrics computed against the old stage's required set.
pub struct RecalculateProgressHandler {
    store: Arc<dyn ProgressStore>,
}

impl RecalculateProgressHandler {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: RecalculateProgressCommand,
    ) -> Result<RecalculateProgressResult, ProgressionError> {
        let now = Timestamp::now();

        for report in &command.reports {
            let entry = PracticeLogEntry::new(
                command.user_id.clone(),
                report.practice,
                report.date,
                report.completed,
            );
            self.store.upsert_practice_log(&entry).await?;
        }

        // First attempt, plus one retry if a concurrent stage advance lands
        // between our read and write. The retry recomputes against the fresh
        // stage; a second stale outcome is surfaced as a dependency failure.
        for attempt in 0..2 {
            let mut state = match self.store.get_progress(&command.user_id).await? {
                Some(state) => state,
                None => {
                    let state = ProgressState::new(command.user_id.clone(), now);
                    self.store.create_progress(&state).await?;
                    state
                }
            };
            let read_stage = state.current_stage;

            let since = now.minus_days(STREAK_LOOKBACK_DAYS).as_date();
            let logs = self.store.practice_logs_since(&command.user_id, since).await?;

            let required = state.required_practice_set();
            let today = now.as_date();
            let adherence = calculate_adherence(&logs, &required, DEFAULT_WINDOW_DAYS, today);
            let consecutive_days = calculate_consecutive_days(&logs, &required, today);

            state.record_practice_metrics(adherence, consecutive_days, now);

            match self
                .store
                .update_progress_if_stage(&state, read_stage)
                .await?
            {
                UpdateOutcome::Applied => {
                    return Ok(RecalculateProgressResult { state });
                }
                UpdateOutcome::StaleStage => {
                    warn!(
                        user_id = %command.user_id,
                        attempt,
                        "progress row advanced during recompute, retrying"
                    );
                }
            }
        }

        Err(ProgressionError::Dependency(
            crate::domain::foundation::DomainError::new(
                crate::domain::foundation::ErrorCode::StaleStage,
                "Progress row kept changing during recompute",
            ),
        ))
    }
}
