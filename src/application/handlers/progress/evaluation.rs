//! Shared evaluation steps for the unlock check and the unlock command.

use crate::domain::assessment::ScoreDelta;
use crate::domain::entitlement::{self, AccessDecision, Entitlement};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::progression::{self, EligibilityInput, EligibilityResult, ProgressState, Stage};
use crate::ports::{ProgressStore, SubscriptionReader};

/// Baseline-relative delta from the latest weekly measurement, if both exist.
pub(crate) async fn latest_delta(
    store: &dyn ProgressStore,
    user_id: &UserId,
) -> Result<Option<ScoreDelta>, crate::domain::foundation::DomainError> {
    let baseline = store.get_baseline(user_id).await?;
    let latest = store.latest_weekly_delta(user_id).await?;
    Ok(match (baseline, latest) {
        (Some(baseline), Some(latest)) => {
            Some(ScoreDelta::between(&baseline.scores, &latest.scores))
        }
        _ => None,
    })
}

/// Evaluates eligibility for `target` from the stored metrics.
pub(crate) fn evaluate_eligibility(
    state: &ProgressState,
    target: Stage,
    delta: Option<&ScoreDelta>,
) -> EligibilityResult {
    progression::evaluate(&EligibilityInput {
        target,
        adherence: state.adherence,
        consecutive_days: state.consecutive_days,
        delta,
        manual_review_approved: state.manual_review_approved(),
    })
}

/// Resolves the caller's entitlement from the billing snapshot.
pub(crate) async fn resolve_entitlement(
    subscriptions: &dyn SubscriptionReader,
    user_id: &UserId,
    now: Timestamp,
) -> Result<Entitlement, crate::domain::foundation::DomainError> {
    let record = subscriptions.get_subscription(user_id).await?;
    Ok(entitlement::resolve(record.as_ref(), now))
}

/// The gate re-check a stage advance must pass.
///
/// Eligibility covers the "earned" half, so the gate is asked whether a user
/// standing at `target` could access it; that isolates the entitlement half
/// (subscription state, coaching tier) without tripping the unearned-stage
/// denial that protects content reads.
pub(crate) fn gate_for_advance(target: Stage, entitlement: &Entitlement) -> AccessDecision {
    entitlement::can_access_stage(target, target, entitlement)
}
