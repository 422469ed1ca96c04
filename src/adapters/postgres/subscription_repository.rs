//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, Money, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    /// Creates a repository over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    plan_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    processor_subscription_id: Option<String>,
    processor_customer_id: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    trial_start: Option<DateTime<Utc>>,
    trial_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let currency = Currency::new(&row.currency).map_err(db_invalid)?;
        let amount = Money::new(row.amount, currency).map_err(db_invalid)?;
        let user_id = UserId::new(row.user_id).map_err(db_invalid)?;
        let plan_id = PlanId::new(row.plan_id).map_err(db_invalid)?;

        let mut subscription = Subscription::rehydrate(
            SubscriptionId::from_uuid(row.id),
            user_id,
            plan_id,
            amount,
            parse_status(&row.status)?,
        );
        subscription.processor_subscription_id = row.processor_subscription_id;
        subscription.processor_customer_id = row.processor_customer_id;
        subscription.current_period_start = row.current_period_start.map(Timestamp::from_datetime);
        subscription.current_period_end = row.current_period_end.map(Timestamp::from_datetime);
        subscription.canceled_at = row.canceled_at.map(Timestamp::from_datetime);
        subscription.trial_start = row.trial_start.map(Timestamp::from_datetime);
        subscription.trial_end = row.trial_end.map(Timestamp::from_datetime);
        subscription.created_at = Timestamp::from_datetime(row.created_at);
        subscription.updated_at = Timestamp::from_datetime(row.updated_at);
        Ok(subscription)
    }
}

fn db_invalid(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid row: {}", err))
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    SubscriptionStatus::from_processor(s)
        .ok_or_else(|| db_invalid(format!("unknown subscription status '{}'", s)))
}

fn status_to_str(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Incomplete => "incomplete",
        SubscriptionStatus::Trialing => "trialing",
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::PastDue => "past_due",
        SubscriptionStatus::Canceled => "canceled",
        SubscriptionStatus::Unpaid => "unpaid",
        SubscriptionStatus::Paused => "paused",
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_id, amount, currency, status,
                processor_subscription_id, processor_customer_id,
                current_period_start, current_period_end, canceled_at,
                trial_start, trial_end, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.plan_id.as_str())
        .bind(subscription.amount.amount())
        .bind(subscription.amount.currency().as_str())
        .bind(status_to_str(subscription.status))
        .bind(&subscription.processor_subscription_id)
        .bind(&subscription.processor_customer_id)
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(subscription.trial_start.map(|t| *t.as_datetime()))
        .bind(subscription.trial_end.map(|t| *t.as_datetime()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan_id = $2, amount = $3, currency = $4, status = $5,
                processor_subscription_id = $6, processor_customer_id = $7,
                current_period_start = $8, current_period_end = $9,
                canceled_at = $10, trial_start = $11, trial_end = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.plan_id.as_str())
        .bind(subscription.amount.amount())
        .bind(subscription.amount.currency().as_str())
        .bind(status_to_str(subscription.status))
        .bind(&subscription.processor_subscription_id)
        .bind(&subscription.processor_customer_id)
        .bind(subscription.current_period_start.map(|t| *t.as_datetime()))
        .bind(subscription.current_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.canceled_at.map(|t| *t.as_datetime()))
        .bind(subscription.trial_start.map(|t| *t.as_datetime()))
        .bind(subscription.trial_end.map(|t| *t.as_datetime()))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription {} not found", subscription.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as("SELECT * FROM subscriptions WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_processor_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as("SELECT * FROM subscriptions WHERE processor_subscription_id = $1")
                .bind(reference)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Unpaid,
            SubscriptionStatus::Paused,
        ] {
            assert_eq!(parse_status(status_to_str(status)).unwrap(), status);
        }
    }

    #[test]
    fn row_conversion_rebuilds_the_aggregate() {
        let now = Utc::now();
        let row = SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            plan_id: "plan_monthly".to_string(),
            amount: Decimal::new(150_000, 2),
            currency: "USD".to_string(),
            status: "past_due".to_string(),
            processor_subscription_id: Some("sub_1".to_string()),
            processor_customer_id: Some("cus_1".to_string()),
            current_period_start: Some(now),
            current_period_end: Some(now),
            canceled_at: None,
            trial_start: None,
            trial_end: None,
            created_at: now,
            updated_at: now,
        };

        let subscription = Subscription::try_from(row).unwrap();

        assert_eq!(subscription.status, SubscriptionStatus::PastDue);
        assert_eq!(
            subscription.processor_subscription_id.as_deref(),
            Some("sub_1")
        );
        assert!(subscription.pending_events().is_empty());
    }
}
