//! Subscription records as reported by the billing provider.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId};

/// Billing-provider subscription status, normalized to a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    /// No subscription record exists for the user.
    #[serde(rename = "none")]
    None,
}

impl SubscriptionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::None => "none",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which paid plan the subscription is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    /// Self-guided curriculum access.
    Foundation,
    /// Curriculum plus 1:1 coaching; required for the deepest stages.
    Coaching,
}

/// A user's subscription as last synced from the billing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    pub plan: PlanType,
    /// End of the current billing period.
    pub current_period_end: Timestamp,
    /// True when the user has requested cancellation at period end but the
    /// period has not yet lapsed.
    pub cancel_at_period_end: bool,
}

impl SubscriptionRecord {
    pub fn new(
        user_id: UserId,
        status: SubscriptionStatus,
        plan: PlanType,
        current_period_end: Timestamp,
    ) -> Self {
        Self {
            user_id,
            status,
            plan,
            current_period_end,
            cancel_at_period_end: false,
        }
    }
}
