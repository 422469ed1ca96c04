//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, Money, PaymentId, PaymentMethodId, SubscriptionId,
    Timestamp, UserId,
};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::payment_method::PaymentMethodKind;
use crate::ports::PaymentRepository;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    /// Creates a repository over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    method_kind: String,
    payment_method_id: Option<Uuid>,
    subscription_id: Option<Uuid>,
    processor_intent_id: Option<String>,
    processor_charge_id: Option<String>,
    description: Option<String>,
    failure_reason: Option<String>,
    refunded_amount: Decimal,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency = Currency::new(&row.currency).map_err(db_invalid)?;
        let amount = Money::new(row.amount, currency.clone()).map_err(db_invalid)?;
        let refunded_amount = Money::new(row.refunded_amount, currency).map_err(db_invalid)?;
        let user_id = UserId::new(row.user_id).map_err(db_invalid)?;

        let mut payment = Payment::rehydrate(
            PaymentId::from_uuid(row.id),
            user_id,
            amount,
            parse_status(&row.status)?,
            parse_kind(&row.method_kind)?,
        );
        payment.payment_method_id = row.payment_method_id.map(PaymentMethodId::from_uuid);
        payment.subscription_id = row.subscription_id.map(SubscriptionId::from_uuid);
        payment.processor_intent_id = row.processor_intent_id;
        payment.processor_charge_id = row.processor_charge_id;
        payment.description = row.description;
        payment.failure_reason = row.failure_reason;
        payment.refunded_amount = refunded_amount;
        payment.processed_at = row.processed_at.map(Timestamp::from_datetime);
        payment.created_at = Timestamp::from_datetime(row.created_at);
        payment.updated_at = Timestamp::from_datetime(row.updated_at);
        Ok(payment)
    }
}

fn db_invalid(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid row: {}", err))
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "processing" => Ok(PaymentStatus::Processing),
        "succeeded" => Ok(PaymentStatus::Succeeded),
        "failed" => Ok(PaymentStatus::Failed),
        "cancelled" => Ok(PaymentStatus::Cancelled),
        "refunded" => Ok(PaymentStatus::Refunded),
        "partially_refunded" => Ok(PaymentStatus::PartiallyRefunded),
        _ => Err(db_invalid(format!("unknown payment status '{}'", s))),
    }
}

fn status_to_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Processing => "processing",
        PaymentStatus::Succeeded => "succeeded",
        PaymentStatus::Failed => "failed",
        PaymentStatus::Cancelled => "cancelled",
        PaymentStatus::Refunded => "refunded",
        PaymentStatus::PartiallyRefunded => "partially_refunded",
    }
}

fn parse_kind(s: &str) -> Result<PaymentMethodKind, DomainError> {
    match s {
        "card" => Ok(PaymentMethodKind::Card),
        "bank_account" => Ok(PaymentMethodKind::BankAccount),
        _ => Err(db_invalid(format!("unknown method kind '{}'", s))),
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, amount, currency, status, method_kind,
                payment_method_id, subscription_id, processor_intent_id,
                processor_charge_id, description, failure_reason,
                refunded_amount, processed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().as_str())
        .bind(status_to_str(payment.status))
        .bind(payment.method_kind.as_str())
        .bind(payment.payment_method_id.map(|id| *id.as_uuid()))
        .bind(payment.subscription_id.map(|id| *id.as_uuid()))
        .bind(&payment.processor_intent_id)
        .bind(&payment.processor_charge_id)
        .bind(&payment.description)
        .bind(&payment.failure_reason)
        .bind(payment.refunded_amount.amount())
        .bind(payment.processed_at.map(|t| *t.as_datetime()))
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        Ok(())
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2, processor_intent_id = $3, processor_charge_id = $4,
                failure_reason = $5, refunded_amount = $6, processed_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(status_to_str(payment.status))
        .bind(&payment.processor_intent_id)
        .bind(&payment.processor_charge_id)
        .bind(&payment.failure_reason)
        .bind(payment.refunded_amount.amount())
        .bind(payment.processed_at.map(|t| *t.as_datetime()))
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment {} not found", payment.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> =
            sqlx::query_as("SELECT * FROM payments WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_processor_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            "SELECT * FROM payments WHERE processor_intent_id = $1 OR processor_charge_id = $1",
        )
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        row.map(Payment::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> =
            sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
