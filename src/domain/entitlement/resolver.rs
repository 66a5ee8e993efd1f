//! Entitlement resolution from a subscription snapshot.
//!
//! Pure arithmetic over the record and the clock. The resolver never talks to
//! the billing provider; it interprets whatever snapshot the reader supplied.

use serde::{Deserialize, Serialize};

use super::subscription::{PlanType, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::Timestamp;
use crate::domain::progression::Stage;

/// Highest stage reachable without any subscription.
pub const FREE_STAGE_LIMIT: u8 = 1;

/// Days past the period end during which a past-due subscription still counts.
pub const GRACE_DAYS: i64 = 3;

/// How an active entitlement was obtained. Used as the allow reason downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationBasis {
    /// Status is active or trialing.
    Paid,
    /// Past due but inside the grace window, or canceled-at-period-end with
    /// the period not yet lapsed.
    GracePeriod,
}

/// What the user's subscription entitles them to right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub is_active: bool,
    /// None when there is no subscription record at all.
    pub basis: Option<ActivationBasis>,
    pub max_allowed_stage: Stage,
    pub has_coaching_access: bool,
    /// True when the user once subscribed but the entitlement has lapsed.
    pub has_lapsed_subscription: bool,
}

impl Entitlement {
    /// The entitlement of a user with no subscription record.
    pub fn free_tier() -> Self {
        Self {
            is_active: false,
            basis: None,
            max_allowed_stage: Stage::FIRST,
            has_coaching_access: false,
            has_lapsed_subscription: false,
        }
    }
}

/// Resolves a subscription snapshot into an entitlement at `now`.
pub fn resolve(subscription: Option<&SubscriptionRecord>, now: Timestamp) -> Entitlement {
    let Some(record) = subscription else {
        return Entitlement::free_tier();
    };

    if record.status == SubscriptionStatus::None {
        return Entitlement::free_tier();
    }

    let basis = activation_basis(record, now);
    let is_active = basis.is_some();

    Entitlement {
        is_active,
        basis,
        max_allowed_stage: if is_active { Stage::FINAL } else { Stage::FIRST },
        has_coaching_access: is_active && record.plan == PlanType::Coaching,
        has_lapsed_subscription: !is_active,
    }
}

fn activation_basis(record: &SubscriptionRecord, now: Timestamp) -> Option<ActivationBasis> {
    match record.status {
        SubscriptionStatus::Active | SubscriptionStatus::Trialing => {
            Some(ActivationBasis::Paid)
        }
        SubscriptionStatus::PastDue => {
            let grace_end = record.current_period_end.add_days(GRACE_DAYS);
            if now.is_before(&grace_end) {
                Some(ActivationBasis::GracePeriod)
            } else {
                None
            }
        }
        _ => {
            if record.cancel_at_period_end && now.is_before(&record.current_period_end) {
                Some(ActivationBasis::GracePeriod)
            } else {
                None
            }
        }
    }
}
