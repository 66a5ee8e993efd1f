//! Subscription reader port.
//!
//! Read-only view of the billing collaborator's subscription records. The
//! engine consumes these snapshots; it never writes back to billing.

use async_trait::async_trait;

use crate::domain::entitlement::SubscriptionRecord;
use crate::domain::foundation::{DomainError, UserId};

/// Reader port for subscription snapshots.
///
/// Implementations may cache aggressively; the grace-period arithmetic in the
/// entitlement resolver tolerates snapshots that are a few minutes stale.
#[async_trait]
pub trait SubscriptionReader: Send + Sync {
    /// The user's subscription record, or `None` if they never subscribed.
    async fn get_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;
}
