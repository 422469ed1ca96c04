//! PostgreSQL implementation of PaymentMethodRepository.
//!
//! The single-default invariant is enforced twice: a partial unique
//! index on `(user_id) WHERE is_default AND is_active`, and
//! `set_default_exclusive` issuing one conditional UPDATE so there is
//! no read-then-write window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentMethodId, Timestamp, UserId,
};
use crate::domain::payment_method::{PaymentMethod, PaymentMethodKind};
use crate::ports::PaymentMethodRepository;

/// PostgreSQL implementation of the PaymentMethodRepository port.
pub struct PostgresPaymentMethodRepository {
    pool: PgPool,
}

impl PostgresPaymentMethodRepository {
    /// Creates a repository over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentMethodRow {
    id: Uuid,
    user_id: String,
    kind: String,
    processor_method_id: Option<String>,
    last_four: Option<String>,
    brand: Option<String>,
    bank_name: Option<String>,
    is_default: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentMethodRow> for PaymentMethod {
    type Error = DomainError;

    fn try_from(row: PaymentMethodRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?;

        Ok(PaymentMethod {
            id: PaymentMethodId::from_uuid(row.id),
            user_id,
            kind: parse_kind(&row.kind)?,
            processor_method_id: row.processor_method_id,
            last_four: row.last_four,
            brand: row.brand,
            bank_name: row.bank_name,
            is_default: row.is_default,
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_kind(s: &str) -> Result<PaymentMethodKind, DomainError> {
    match s {
        "card" => Ok(PaymentMethodKind::Card),
        "bank_account" => Ok(PaymentMethodKind::BankAccount),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("unknown method kind '{}'", s),
        )),
    }
}

#[async_trait]
impl PaymentMethodRepository for PostgresPaymentMethodRepository {
    async fn save(&self, method: &PaymentMethod) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_methods (
                id, user_id, kind, processor_method_id, last_four, brand,
                bank_name, is_default, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(method.id.as_uuid())
        .bind(method.user_id.as_str())
        .bind(method.kind.as_str())
        .bind(&method.processor_method_id)
        .bind(&method.last_four)
        .bind(&method.brand)
        .bind(&method.bank_name)
        .bind(method.is_default)
        .bind(method.is_active)
        .bind(method.created_at.as_datetime())
        .bind(method.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        Ok(())
    }

    async fn update(&self, method: &PaymentMethod) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_methods SET
                is_default = $2, is_active = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(method.id.as_uuid())
        .bind(method.is_default)
        .bind(method.is_active)
        .bind(method.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PaymentMethodNotFound,
                format!("Payment method {} not found", method.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, DomainError> {
        let row: Option<PaymentMethodRow> =
            sqlx::query_as("SELECT * FROM payment_methods WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;

        row.map(PaymentMethod::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PaymentMethod>, DomainError> {
        let rows: Vec<PaymentMethodRow> = sqlx::query_as(
            r#"
            SELECT * FROM payment_methods
            WHERE user_id = $1 AND is_active
            ORDER BY is_default DESC, created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        rows.into_iter().map(PaymentMethod::try_from).collect()
    }

    async fn set_default_exclusive(
        &self,
        user_id: &UserId,
        method_id: &PaymentMethodId,
    ) -> Result<(), DomainError> {
        // One statement flips every row for the user; no window where
        // two methods are default.
        let result = sqlx::query(
            r#"
            UPDATE payment_methods
            SET is_default = (id = $2), updated_at = NOW()
            WHERE user_id = $1 AND is_active
            "#,
        )
        .bind(user_id.as_str())
        .bind(method_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PaymentMethodNotFound,
                format!("No active payment methods for user {}", user_id),
            ));
        }

        // The target itself may have been inactive or foreign; confirm
        // it picked up the flag.
        let confirmed: Option<PaymentMethodRow> = sqlx::query_as(
            "SELECT * FROM payment_methods WHERE id = $1 AND user_id = $2 AND is_default",
        )
        .bind(method_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(e.to_string()))?;

        if confirmed.is_none() {
            return Err(DomainError::new(
                ErrorCode::PaymentMethodNotFound,
                format!("Payment method {} not found for user {}", method_id, user_id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_round_trip() {
        assert_eq!(parse_kind("card").unwrap(), PaymentMethodKind::Card);
        assert_eq!(
            parse_kind("bank_account").unwrap(),
            PaymentMethodKind::BankAccount
        );
        assert!(parse_kind("crypto").is_err());
    }

    #[test]
    fn row_conversion_rebuilds_the_aggregate() {
        let now = Utc::now();
        let row = PaymentMethodRow {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            kind: "bank_account".to_string(),
            processor_method_id: Some("pm_1".to_string()),
            last_four: Some("6789".to_string()),
            brand: None,
            bank_name: Some("First National".to_string()),
            is_default: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let method = PaymentMethod::try_from(row).unwrap();

        assert_eq!(method.kind, PaymentMethodKind::BankAccount);
        assert!(method.is_default);
        assert_eq!(method.bank_name.as_deref(), Some("First National"));
    }
}
