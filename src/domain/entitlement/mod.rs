//! Entitlement module - Subscription interpretation and access gating.
//!
//! Pure decisions over a billing snapshot; the snapshot itself comes through
//! the `SubscriptionReader` port.

mod gate;
mod resolver;
mod subscription;

pub use gate::{can_access_stage, AccessDecision, AllowReason, DenialReason};
pub use resolver::{resolve, ActivationBasis, Entitlement, FREE_STAGE_LIMIT, GRACE_DAYS};
pub use subscription::{PlanType, SubscriptionRecord, SubscriptionStatus};
