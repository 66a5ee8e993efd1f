//! In-memory subscription reader for tests and development.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::entitlement::SubscriptionRecord;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::SubscriptionReader;

/// Thread-safe in-memory implementation of [`SubscriptionReader`].
#[derive(Default)]
pub struct InMemorySubscriptionReader {
    records: RwLock<HashMap<UserId, SubscriptionRecord>>,
    fail_reads: RwLock<bool>,
}

impl InMemorySubscriptionReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a user's subscription snapshot.
    pub async fn set_subscription(&self, record: SubscriptionRecord) {
        let mut records = self.records.write().await;
        records.insert(record.user_id.clone(), record);
    }

    /// Makes subsequent reads fail, simulating a billing outage.
    pub async fn fail_reads(&self) {
        *self.fail_reads.write().await = true;
    }
}

#[async_trait]
impl SubscriptionReader for InMemorySubscriptionReader {
    async fn get_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        if *self.fail_reads.read().await {
            return Err(DomainError::new(
                ErrorCode::DependencyTimeout,
                "Billing lookup timed out",
            ));
        }
        let records = self.records.read().await;
        Ok(records.get(user_id).cloned())
    }
}
