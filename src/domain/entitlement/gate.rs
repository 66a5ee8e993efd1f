//! Access gate combining earned progress with entitlement.
//!
//! The gate never widens access: a paid subscription grants earned stages
//! only, so a client cannot jump to an unearned stage merely by subscribing.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::resolver::{ActivationBasis, Entitlement, FREE_STAGE_LIMIT};
use crate::domain::progression::Stage;

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    FreeTier,
    ActiveSubscription,
    GracePeriod,
}

/// Why access was denied. Carried verbatim to the HTTP layer as the 403 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// Subscribed, but the stage has not been earned yet.
    StageLocked,
    /// Previously subscribed; the entitlement has lapsed.
    SubscriptionExpired,
    /// Never subscribed.
    NoSubscription,
    /// The stage requires the coaching plan tier.
    CoachingRequired,
}

impl DenialReason {
    /// Machine-readable code for the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::StageLocked => "STAGE_LOCKED",
            DenialReason::SubscriptionExpired => "SUBSCRIPTION_REQUIRED",
            DenialReason::NoSubscription => "SUBSCRIPTION_REQUIRED",
            DenialReason::CoachingRequired => "COACHING_REQUIRED",
        }
    }

    /// True when pointing the user at checkout is the actionable next step.
    pub fn suggests_upgrade(&self) -> bool {
        matches!(
            self,
            DenialReason::SubscriptionExpired
                | DenialReason::NoSubscription
                | DenialReason::CoachingRequired
        )
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenialReason::StageLocked => "stage_locked",
            DenialReason::SubscriptionExpired => "subscription_expired",
            DenialReason::NoSubscription => "no_subscription",
            DenialReason::CoachingRequired => "coaching_required",
        };
        write!(f, "{}", s)
    }
}

/// The gate's verdict for one (current stage, requested stage) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed { reason: AllowReason },
    Denied { reason: DenialReason },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed { .. })
    }

    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            AccessDecision::Denied { reason } => Some(*reason),
            AccessDecision::Allowed { .. } => None,
        }
    }
}

/// Decides whether a user at `current` may access `requested`.
pub fn can_access_stage(
    current: Stage,
    requested: Stage,
    entitlement: &Entitlement,
) -> AccessDecision {
    // The free tier is always reachable, subscription or not.
    if requested.value() <= FREE_STAGE_LIMIT {
        return AccessDecision::Allowed {
            reason: AllowReason::FreeTier,
        };
    }

    if !entitlement.is_active {
        let reason = if entitlement.has_lapsed_subscription {
            DenialReason::SubscriptionExpired
        } else {
            DenialReason::NoSubscription
        };
        return AccessDecision::Denied { reason };
    }

    if requested.is_terminal() && !entitlement.has_coaching_access {
        return AccessDecision::Denied {
            reason: DenialReason::CoachingRequired,
        };
    }

    if requested > current {
        return AccessDecision::Denied {
            reason: DenialReason::StageLocked,
        };
    }

    let reason = match entitlement.basis {
        Some(ActivationBasis::GracePeriod) => AllowReason::GracePeriod,
        _ => AllowReason::ActiveSubscription,
    };
    AccessDecision::Allowed { reason }
}
