//! RecordWeeklyDeltaHandler - Command handler for weekly measurements.

use std::sync::Arc;

use tracing::info;

use crate::domain::assessment::{
    BaselineRecord, CompositeIndex, DomainScoreSet, IndexTier, ScoreDelta, WeeklyDelta,
};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::progression::ProgressionError;
use crate::ports::ProgressStore;

/// Command carrying this week's questionnaire scores.
#[derive(Debug, Clone)]
pub struct RecordWeeklyDeltaCommand {
    pub user_id: UserId,
    pub scores: DomainScoreSet,
}

/// Result of recording a measurement.
#[derive(Debug, Clone)]
pub struct RecordWeeklyDeltaResult {
    pub index: CompositeIndex,
    pub tier: IndexTier,
    /// Change relative to baseline. All zeros on the very first measurement.
    pub delta: ScoreDelta,
    /// True when this measurement became the user's baseline.
    pub baseline_created: bool,
}

/// Handler for the weekly measurement flow.
///
/// The first measurement a user ever submits becomes their fixed baseline;
/// the store enforces write-once so later flows can never move it. The
/// snapshot itself upserts per week, so re-submitting within a week replaces
/// that week's scores rather than stacking.
pub struct RecordWeeklyDeltaHandler {
    store: Arc<dyn ProgressStore>,
}

impl RecordWeeklyDeltaHandler {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        command: RecordWeeklyDeltaCommand,
    ) -> Result<RecordWeeklyDeltaResult, ProgressionError> {
        command.scores.validate()?;
        let now = Timestamp::now();

        let (baseline_scores, baseline_created) =
            match self.store.get_baseline(&command.user_id).await? {
                Some(baseline) => (baseline.scores, false),
                None => {
                    let baseline =
                        BaselineRecord::new(command.user_id.clone(), command.scores, now);
                    self.store.save_baseline(&baseline).await?;
                    info!(user_id = %command.user_id, "baseline captured");
                    (command.scores, true)
                }
            };

        let snapshot =
            WeeklyDelta::for_week_of(command.user_id.clone(), now.as_date(), command.scores);
        self.store.save_weekly_delta(&snapshot).await?;

        let delta = ScoreDelta::between(&baseline_scores, &command.scores);
        let index = CompositeIndex::from_scores(&command.scores)?;

        Ok(RecordWeeklyDeltaResult {
            index,
            tier: index.tier(),
            delta,
            baseline_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProgressStore;

    fn user() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    fn scores(value: f64) -> DomainScoreSet {
        DomainScoreSet::try_new(value, value, value, value).unwrap()
    }

    #[tokio::test]
    async fn first_measurement_becomes_the_baseline() {
        let store = Arc::new(InMemoryProgressStore::new());
        let handler = RecordWeeklyDeltaHandler::new(store.clone());

        let result = handler
            .handle(RecordWeeklyDeltaCommand {
                user_id: user(),
                scores: scores(2.0),
            })
            .await
            .unwrap();

        assert!(result.baseline_created);
        assert_eq!(result.delta.average, 0.0);
        assert_eq!(result.index.value(), 40);
        assert_eq!(result.tier.name(), "Baseline Mode");
        assert!(store.get_baseline(&user()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn later_measurements_report_deltas_against_the_fixed_baseline() {
        let store = Arc::new(InMemoryProgressStore::new());
        let handler = RecordWeeklyDeltaHandler::new(store.clone());

        handler
            .handle(RecordWeeklyDeltaCommand {
                user_id: user(),
                scores: scores(2.0),
            })
            .await
            .unwrap();

        let result = handler
            .handle(RecordWeeklyDeltaCommand {
                user_id: user(),
                scores: scores(2.6),
            })
            .await
            .unwrap();

        assert!(!result.baseline_created);
        assert_eq!(result.delta.average, 0.6);
        // Baseline is still the original measurement.
        let baseline = store.get_baseline(&user()).await.unwrap().unwrap();
        assert_eq!(baseline.scores, scores(2.0));
    }

    #[tokio::test]
    async fn resubmitting_within_a_week_replaces_the_snapshot() {
        let store = Arc::new(InMemoryProgressStore::new());
        let handler = RecordWeeklyDeltaHandler::new(store.clone());

        for value in [2.0, 3.0] {
            handler
                .handle(RecordWeeklyDeltaCommand {
                    user_id: user(),
                    scores: scores(value),
                })
                .await
                .unwrap();
        }

        let latest = store.latest_weekly_delta(&user()).await.unwrap().unwrap();
        assert_eq!(latest.scores, scores(3.0));
    }

    #[tokio::test]
    async fn high_scores_land_in_the_integrated_tier() {
        let store = Arc::new(InMemoryProgressStore::new());
        let handler = RecordWeeklyDeltaHandler::new(store);

        let result = handler
            .handle(RecordWeeklyDeltaCommand {
                user_id: user(),
                scores: scores(4.5),
            })
            .await
            .unwrap();

        assert_eq!(result.index.value(), 90);
        assert_eq!(result.tier.name(), "Integrated");
    }
}
