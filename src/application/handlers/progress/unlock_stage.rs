//! UnlockStageHandler - Command handler for the atomic stage advance.

use std::sync::Arc;

use tracing::info;

use crate::domain::entitlement::FREE_STAGE_LIMIT;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::progression::{ProgressState, ProgressionError, Stage};
use crate::ports::{ProgressStore, SubscriptionReader, UpdateOutcome};

use super::evaluation;

/// Command to advance the caller to `target_stage`.
///
/// The stage number arrives from the client and is validated here; the user
/// id never does — it comes from the verified session.
#[derive(Debug, Clone)]
pub struct UnlockStageCommand {
    pub user_id: UserId,
    pub target_stage: u8,
}

/// Result of a successful advance.
#[derive(Debug, Clone)]
pub struct UnlockStageResult {
    pub new_stage: Stage,
    pub stage_started_at: Timestamp,
}

/// Handler for the stage advance.
///
/// Order of checks: shape (target = current + 1), eligibility, entitlement
/// gate, then the conditional write. A lost write race is reported as an
/// invalid target against the fresh stage, which is exactly what a
/// double-submitted unlock is.
pub struct UnlockStageHandler {
    store: Arc<dyn ProgressStore>,
    subscriptions: Arc<dyn SubscriptionReader>,
}

impl UnlockStageHandler {
    pub fn new(store: Arc<dyn ProgressStore>, subscriptions: Arc<dyn SubscriptionReader>) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    pub async fn handle(
        &self,
        command: UnlockStageCommand,
    ) -> Result<UnlockStageResult, ProgressionError> {
        let target = Stage::try_new(command.target_stage)?;
        let now = Timestamp::now();

        let mut state = match self.store.get_progress(&command.user_id).await? {
            Some(state) => state,
            None => {
                let state = ProgressState::new(command.user_id.clone(), now);
                self.store.create_progress(&state).await?;
                state
            }
        };
        let read_stage = state.current_stage;

        if read_stage.next() != Some(target) {
            return Err(ProgressionError::invalid_target(
                read_stage,
                command.target_stage,
            ));
        }

        let delta = evaluation::latest_delta(self.store.as_ref(), &command.user_id).await?;
        let eligibility = evaluation::evaluate_eligibility(&state, target, delta.as_ref());
        if !eligibility.eligible {
            return Err(ProgressionError::not_eligible(target, eligibility.missing));
        }

        // Eligibility alone never unlocks a paid stage.
        if target.value() > FREE_STAGE_LIMIT {
            let entitlement =
                evaluation::resolve_entitlement(self.subscriptions.as_ref(), &command.user_id, now)
                    .await?;
            if let Some(reason) = evaluation::gate_for_advance(target, &entitlement).denial() {
                return Err(ProgressionError::denied(reason));
            }
        }

        state.advance_to(target, now)?;

        match self
            .store
            .update_progress_if_stage(&state, read_stage)
            .await?
        {
            UpdateOutcome::Applied => {
                info!(
                    user_id = %command.user_id,
                    stage = target.value(),
                    "stage advanced"
                );
                Ok(UnlockStageResult {
                    new_stage: target,
                    stage_started_at: now,
                })
            }
            UpdateOutcome::StaleStage => {
                // A concurrent request advanced the row first. Re-read so the
                // denial names the stage the user is actually on.
                let fresh = self
                    .store
                    .get_progress(&command.user_id)
                    .await?
                    .map(|s| s.current_stage)
                    .unwrap_or(read_stage);
                Err(ProgressionError::invalid_target(fresh, command.target_stage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryProgressStore, InMemorySubscriptionReader};
    use crate::domain::assessment::{BaselineRecord, DomainScoreSet, WeeklyDelta};
    use crate::domain::entitlement::{
        DenialReason, PlanType, SubscriptionRecord, SubscriptionStatus,
    };
    use crate::domain::foundation::Percentage;
    use crate::domain::progression::{Requirement, ScreeningFlag};

    fn user() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    fn handler(
        store: Arc<InMemoryProgressStore>,
        subscriptions: Arc<InMemorySubscriptionReader>,
    ) -> UnlockStageHandler {
        UnlockStageHandler::new(store, subscriptions)
    }

    async fn seed_progress(store: &InMemoryProgressStore, stage: u8, adherence: u8, days: u32) {
        let mut state = ProgressState::new(user(), Timestamp::now());
        for n in 2..=stage {
            state
                .advance_to(Stage::try_new(n).unwrap(), Timestamp::now())
                .unwrap();
        }
        state.record_practice_metrics(Percentage::new(adherence), days, Timestamp::now());
        store.create_progress(&state).await.unwrap();
    }

    async fn seed_measurements(store: &InMemoryProgressStore, baseline: f64, current: f64) {
        let base = DomainScoreSet::try_new(baseline, baseline, baseline, baseline).unwrap();
        let cur = DomainScoreSet::try_new(current, current, current, current).unwrap();
        store
            .save_baseline(&BaselineRecord::new(user(), base, Timestamp::now()))
            .await
            .unwrap();
        store
            .save_weekly_delta(&WeeklyDelta::for_week_of(
                user(),
                Timestamp::now().as_date(),
                cur,
            ))
            .await
            .unwrap();
    }

    async fn subscribe(subscriptions: &InMemorySubscriptionReader, plan: PlanType) {
        subscriptions
            .set_subscription(SubscriptionRecord::new(
                user(),
                SubscriptionStatus::Active,
                plan,
                Timestamp::now().add_days(30),
            ))
            .await;
    }

    #[tokio::test]
    async fn advances_exactly_one_stage() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 2, 85, 16).await;
        seed_measurements(&store, 2.0, 2.8).await;
        subscribe(&subscriptions, PlanType::Foundation).await;

        let result = handler(store.clone(), subscriptions)
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 3,
            })
            .await
            .unwrap();

        assert_eq!(result.new_stage.value(), 3);
        let stored = store.get_progress(&user()).await.unwrap().unwrap();
        assert_eq!(stored.current_stage.value(), 3);
        assert_eq!(stored.consecutive_days, 0, "streak resets on advance");
    }

    #[tokio::test]
    async fn rejects_skipping_stages() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 2, 100, 100).await;
        seed_measurements(&store, 2.0, 3.5).await;
        subscribe(&subscriptions, PlanType::Foundation).await;

        let err = handler(store, subscriptions)
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 5,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProgressionError::InvalidTarget { requested: 5, .. }
        ));
    }

    #[tokio::test]
    async fn rejects_out_of_range_stage_numbers() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());

        let err = handler(store, subscriptions)
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 9,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProgressionError::Validation(_)));
    }

    #[tokio::test]
    async fn denies_ineligible_users_with_the_missing_list() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 2, 75, 14).await;
        seed_measurements(&store, 2.0, 2.6).await;
        subscribe(&subscriptions, PlanType::Foundation).await;

        let err = handler(store.clone(), subscriptions)
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 3,
            })
            .await
            .unwrap_err();

        match err {
            ProgressionError::NotEligible { missing, .. } => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].requirement, Requirement::Adherence);
            }
            other => panic!("Expected NotEligible, got {:?}", other),
        }
        // Nothing moved.
        let stored = store.get_progress(&user()).await.unwrap().unwrap();
        assert_eq!(stored.current_stage.value(), 2);
    }

    #[tokio::test]
    async fn eligibility_never_unlocks_a_paid_stage() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 2, 85, 16).await;
        seed_measurements(&store, 2.0, 2.8).await;
        // No subscription.

        let err = handler(store.clone(), subscriptions)
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 3,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProgressionError::AccessDenied(DenialReason::NoSubscription)
        ));
        let stored = store.get_progress(&user()).await.unwrap().unwrap();
        assert_eq!(stored.current_stage.value(), 2);
    }

    #[tokio::test]
    async fn terminal_stage_requires_approved_review_and_coaching_plan() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());

        let mut state = ProgressState::new(user(), Timestamp::now());
        for n in 2..=6 {
            state
                .advance_to(Stage::try_new(n).unwrap(), Timestamp::now())
                .unwrap();
        }
        state.record_practice_metrics(Percentage::HUNDRED, 60, Timestamp::now());
        store.create_progress(&state).await.unwrap();
        seed_measurements(&store, 2.0, 4.0).await;
        subscribe(&subscriptions, PlanType::Coaching).await;

        // Without the review flag the numbers don't matter.
        let err = handler(store.clone(), subscriptions.clone())
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 7,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressionError::NotEligible { .. }));

        // Approve the review out of band.
        let mut approved = store.get_progress(&user()).await.unwrap().unwrap();
        let read_stage = approved.current_stage;
        approved
            .screening_flags
            .push(ScreeningFlag::ManualReviewApproved);
        store
            .update_progress_if_stage(&approved, read_stage)
            .await
            .unwrap();

        let result = handler(store, subscriptions)
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 7,
            })
            .await
            .unwrap();
        assert!(result.new_stage.is_terminal());
    }

    #[tokio::test]
    async fn terminal_stage_on_foundation_plan_is_coaching_gated() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());

        let mut state = ProgressState::new(user(), Timestamp::now());
        for n in 2..=6 {
            state
                .advance_to(Stage::try_new(n).unwrap(), Timestamp::now())
                .unwrap();
        }
        state.record_practice_metrics(Percentage::HUNDRED, 60, Timestamp::now());
        state
            .screening_flags
            .push(ScreeningFlag::ManualReviewApproved);
        store.create_progress(&state).await.unwrap();
        subscribe(&subscriptions, PlanType::Foundation).await;

        let err = handler(store, subscriptions)
            .handle(UnlockStageCommand {
                user_id: user(),
                target_stage: 7,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProgressionError::AccessDenied(DenialReason::CoachingRequired)
        ));
    }

    #[tokio::test]
    async fn double_submit_advances_only_once() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 2, 85, 16).await;
        seed_measurements(&store, 2.0, 2.8).await;
        subscribe(&subscriptions, PlanType::Foundation).await;

        let h = handler(store.clone(), subscriptions);
        let command = UnlockStageCommand {
            user_id: user(),
            target_stage: 3,
        };

        let (first, second) = tokio::join!(h.handle(command.clone()), h.handle(command));

        // Exactly one of the two submissions wins.
        assert_ne!(first.is_ok(), second.is_ok());
        let stored = store.get_progress(&user()).await.unwrap().unwrap();
        assert_eq!(stored.current_stage.value(), 3);
    }
}
