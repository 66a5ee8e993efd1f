//! GetProgressHandler - Query handler for the full progress snapshot.

use std::sync::Arc;

use crate::domain::assessment::{CompositeIndex, IndexTier, ScoreDelta, WeeklyDelta};
use crate::domain::entitlement::Entitlement;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::progression::{EligibilityResult, ProgressState, ProgressionError, Stage};
use crate::ports::{ProgressStore, SubscriptionReader};

use super::evaluation;

/// Query for one user's full snapshot.
#[derive(Debug, Clone)]
pub struct GetProgressQuery {
    pub user_id: UserId,
}

/// Everything a dashboard needs in one read.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub state: ProgressState,
    pub entitlement: Entitlement,
    /// Composite index from the latest measurement, if one exists.
    pub index: Option<CompositeIndex>,
    pub tier: Option<IndexTier>,
    pub latest_measurement: Option<WeeklyDelta>,
    /// Baseline-relative delta, when both a baseline and a measurement exist.
    pub delta: Option<ScoreDelta>,
    pub has_baseline: bool,
    /// The stage an unlock would target, with its requirement status.
    pub next_stage: Option<Stage>,
    pub eligibility: Option<EligibilityResult>,
}

/// Handler for the snapshot query. Read-only.
pub struct GetProgressHandler {
    store: Arc<dyn ProgressStore>,
    subscriptions: Arc<dyn SubscriptionReader>,
}

impl GetProgressHandler {
    pub fn new(store: Arc<dyn ProgressStore>, subscriptions: Arc<dyn SubscriptionReader>) -> Self {
        Self {
            store,
            subscriptions,
        }
    }

    pub async fn handle(&self, query: GetProgressQuery) -> Result<ProgressSnapshot, ProgressionError> {
        let now = Timestamp::now();

        let state = match self.store.get_progress(&query.user_id).await? {
            Some(state) => state,
            None => ProgressState::new(query.user_id.clone(), now),
        };

        let baseline = self.store.get_baseline(&query.user_id).await?;
        let latest = self.store.latest_weekly_delta(&query.user_id).await?;

        let delta = match (&baseline, &latest) {
            (Some(baseline), Some(latest)) => {
                Some(ScoreDelta::between(&baseline.scores, &latest.scores))
            }
            _ => None,
        };
        let index = match &latest {
            Some(latest) => Some(CompositeIndex::from_scores(&latest.scores)?),
            None => None,
        };

        let entitlement =
            evaluation::resolve_entitlement(self.subscriptions.as_ref(), &query.user_id, now)
                .await?;

        let next_stage = state.current_stage.next();
        let eligibility = next_stage
            .map(|target| evaluation::evaluate_eligibility(&state, target, delta.as_ref()));

        Ok(ProgressSnapshot {
            tier: index.map(|i| i.tier()),
            index,
            latest_measurement: latest,
            delta,
            has_baseline: baseline.is_some(),
            next_stage,
            eligibility,
            entitlement,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryProgressStore, InMemorySubscriptionReader};
    use crate::domain::assessment::{BaselineRecord, DomainScoreSet};
    use crate::domain::entitlement::{PlanType, SubscriptionRecord, SubscriptionStatus};

    fn user() -> UserId {
        UserId::new("test-user-123").unwrap()
    }

    fn scores(value: f64) -> DomainScoreSet {
        DomainScoreSet::try_new(value, value, value, value).unwrap()
    }

    #[tokio::test]
    async fn fresh_users_get_an_empty_snapshot() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());
        let handler = GetProgressHandler::new(store, subscriptions);

        let snapshot = handler
            .handle(GetProgressQuery { user_id: user() })
            .await
            .unwrap();

        assert_eq!(snapshot.state.current_stage.value(), 1);
        assert!(snapshot.index.is_none());
        assert!(!snapshot.has_baseline);
        assert!(!snapshot.entitlement.is_active);
        assert_eq!(snapshot.next_stage.map(|s| s.value()), Some(2));
        // Fresh users are not eligible for stage 2 yet.
        assert!(!snapshot.eligibility.as_ref().unwrap().eligible);
    }

    #[tokio::test]
    async fn snapshot_combines_measurements_and_entitlement() {
        let store = Arc::new(InMemoryProgressStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionReader::new());

        store
            .save_baseline(&BaselineRecord::new(user(), scores(2.0), Timestamp::now()))
            .await
            .unwrap();
        store
            .save_weekly_delta(&WeeklyDelta::for_week_of(
                user(),
                Timestamp::now().as_date(),
                scores(3.0),
            ))
            .await
            .unwrap();
        subscriptions
            .set_subscription(SubscriptionRecord::new(
                user(),
                SubscriptionStatus::Active,
                PlanType::Coaching,
                Timestamp::now().add_days(30),
            ))
            .await;

        let handler = GetProgressHandler::new(store, subscriptions);
        let snapshot = handler
            .handle(GetProgressQuery { user_id: user() })
            .await
            .unwrap();

        assert_eq!(snapshot.index.unwrap().value(), 60);
        assert_eq!(snapshot.tier.unwrap().name(), "Building");
        assert_eq!(snapshot.delta.unwrap().average, 1.0);
        assert!(snapshot.has_baseline);
        assert!(snapshot.entitlement.is_active);
        assert!(snapshot.entitlement.has_coaching_access);
    }
}
