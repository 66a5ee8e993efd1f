//! CheckUnlockHandler - Query handler for previewing the next stage unlock.

use std::sync::Arc;

use crate::domain::entitlement::AccessDecision;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::progression::{EligibilityResult, ProgressState, ProgressionError, Stage};
use crate::ports::{ProgressStore, SubscriptionReader};

use super::evaluation;

/// Query to preview whether the next stage can be unlocked.
#[derive(Debug, Clone)]
pub struct CheckUnlockQuery {
    pub user_id: UserId,
}

/// Result of the preview. Read-only; nothing is persisted.
#[derive(Debug, Clone)]
pub struct CheckUnlockResult {
    pub current_stage: Stage,
    /// `None` when the user is at the terminal stage.
    pub target_stage: Option<Stage>,
    pub eligibility: Option<EligibilityResult>,
    pub access: Option<AccessDecision>,
    /// True when both the eligibility and entitlement halves pass.
    pub can_unlock: bool,
}

/// Handler for the unlock preview.
///
/// Runs the same evaluation the unlock command runs, without the write, so
/// UIs can render requirement checklists and upgrade prompts ahead of time.
pub struct CheckUnlockHandler {
    store: Arc<dyn ProgressStore>,
    subscriptions: Arc<dyn SubscriptionReader>,
}

impl CheckUnlockHandler {
    pub fn new(store: Arc<dyn ProgressStore>, subscriptions: Arc<dyn SubscriptionReader>) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    pub async fn handle(
        &self,
        query: CheckUnlockQuery,
    ) -> Result<CheckUnlockResult, ProgressionError> {
        let now = Timestamp::now();

        let state = match self.store.get_progress(&query.user_id).await? {
            Some(state) => state,
            // Never-seen users are stage-1 users with zeroed metrics.
            None => ProgressState::new(query.user_id.clone(), now),
        };

        let Some(target) = state.current_stage.next() else {
            return Ok(CheckUnlockResult {
                current_stage: state.current_stage,
                target_stage: None,
                eligibility: None,
                access: None,
                can_unlock: false,
            });
        };

        let delta = evaluation::latest_delta(self.store.as_ref(), &query.user_id).await?;
        let eligibility = evaluation::evaluate_eligibility(&state, target, delta.as_ref());

        let entitlement =
            evaluation::resolve_entitlement(self.subscriptions.as_ref(), &query.user_id, now)
                .await?;
        let access = evaluation::gate_for_advance(target, &entitlement);

        let can_unlock = eligibility.eligible && access.is_allowed();

        Ok(CheckUnlockResult {
            current_stage: state.current_stage,
            target_stage: Some(target),
            eligibility: Some(eligibility),
            access: Some(access),
            can_unlock,
        })
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
    use crate::domain::progression::Requirement;

    fn user() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    fn handler(
        store: Arc<InMemoryProgressStore>,
        subscriptions: Arc<InMemorySubscriptionReader>,
    ) -> CheckUnlockHandler {
        CheckUnlockHandler::new(store, subscriptions)
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

    async fn active_subscription(subscriptions: &InMemorySubscriptionReader) {
        subscriptions
            .set_subscription(SubscriptionRecord::new(
                user(),
                SubscriptionStatus::Active,
                PlanType::Foundation,
                Timestamp::now().add_days(30),
            ))
            .await;
    }

    #[tokio::test]
    async fn unknown_users_preview_from_stage_one() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());

        let result = handler(store, subscriptions)
            .handle(CheckUnlockQuery { user_id: user() })
            .await
            .unwrap();

        assert_eq!(result.current_stage.value(), 1);
        assert_eq!(result.target_stage.map(|s| s.value()), Some(2));
        assert!(!result.can_unlock);
    }

    #[tokio::test]
    async fn eligible_and_entitled_user_can_unlock() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        // Stage 2 -> 3 needs {80, 14, 0.5}.
        seed_progress(&store, 2, 85, 16).await;
        seed_measurements(&store, 2.0, 2.8).await;
        active_subscription(&subscriptions).await;

        let result = handler(store, subscriptions)
            .handle(CheckUnlockQuery { user_id: user() })
            .await
            .unwrap();

        assert!(result.can_unlock);
        assert!(result.eligibility.unwrap().eligible);
        assert!(result.access.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn short_adherence_reports_exactly_one_missing_requirement() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        // 75% adherence against the stage-3 threshold of 80.
        seed_progress(&store, 2, 75, 14).await;
        seed_measurements(&store, 2.0, 2.6).await;
        active_subscription(&subscriptions).await;

        let result = handler(store, subscriptions)
            .handle(CheckUnlockQuery { user_id: user() })
            .await
            .unwrap();

        assert!(!result.can_unlock);
        let eligibility = result.eligibility.unwrap();
        assert!(!eligibility.eligible);
        assert_eq!(eligibility.missing.len(), 1);
        assert_eq!(eligibility.missing[0].requirement, Requirement::Adherence);
    }

    #[tokio::test]
    async fn eligible_but_unsubscribed_user_is_gated() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 2, 85, 16).await;
        seed_measurements(&store, 2.0, 2.8).await;
        // No subscription seeded.

        let result = handler(store, subscriptions)
            .handle(CheckUnlockQuery { user_id: user() })
            .await
            .unwrap();

        assert!(!result.can_unlock);
        assert!(result.eligibility.unwrap().eligible);
        assert_eq!(
            result.access.unwrap().denial(),
            Some(DenialReason::NoSubscription)
        );
    }

    #[tokio::test]
    async fn terminal_stage_has_nothing_to_preview() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 7, 100, 100).await;

        let result = handler(store, subscriptions)
            .handle(CheckUnlockQuery { user_id: user() })
            .await
            .unwrap();

        assert_eq!(result.target_stage, None);
        assert!(!result.can_unlock);
    }

    #[tokio::test]
    async fn billing_outage_surfaces_as_dependency_failure() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        seed_progress(&store, 2, 85, 16).await;
        subscriptions.fail_reads().await;

        let err = handler(store, subscriptions)
            .handle(CheckUnlockQuery { user_id: user() })
            .await
            .unwrap_err();

        assert!(matches!(err, ProgressionError::Dependency(_)));
    }
}
