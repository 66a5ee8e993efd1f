//! PostgreSQL implementation of SubscriptionReader.
//!
//! Reads from the `subscriptions` table, which the billing pipeline keeps in
//! sync with the payment provider. This adapter never writes.
//!
//! Expected schema:
//!
//! ```text
//! subscriptions (user_id TEXT PRIMARY KEY, status TEXT, plan TEXT,
//!                current_period_end TIMESTAMPTZ, cancel_at_period_end BOOLEAN)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entitlement::{PlanType, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::SubscriptionReader;

/// PostgreSQL implementation of the SubscriptionReader port.
pub struct PostgresSubscriptionReader {
    pool: PgPool,
}

impl PostgresSubscriptionReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    status: String,
    plan: String,
    current_period_end: DateTime<Utc>,
    cancel_at_period_end: bool,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;
        let mut record = SubscriptionRecord::new(
            user_id,
            parse_status(&row.status)?,
            parse_plan(&row.plan)?,
            Timestamp::from_datetime(row.current_period_end),
        );
        record.cancel_at_period_end = row.cancel_at_period_end;
        Ok(record)
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s {
        "active" => Ok(SubscriptionStatus::Active),
        "trialing" => Ok(SubscriptionStatus::Trialing),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "canceled" => Ok(SubscriptionStatus::Canceled),
        "unpaid" => Ok(SubscriptionStatus::Unpaid),
        "incomplete" => Ok(SubscriptionStatus::Incomplete),
        "none" => Ok(SubscriptionStatus::None),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription status: {}", s),
        )),
    }
}

fn parse_plan(s: &str) -> Result<PlanType, DomainError> {
    match s {
        "foundation" => Ok(PlanType::Foundation),
        "coaching" => Ok(PlanType::Coaching),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid plan type: {}", s),
        )),
    }
}

#[async_trait]
impl SubscriptionReader for PostgresSubscriptionReader {
    async fn get_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT user_id, status, plan, current_period_end, cancel_at_period_end
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to load subscription: {}", e),
            )
        })?;

        row.map(SubscriptionRecord::try_from).transpose()
    }
}
