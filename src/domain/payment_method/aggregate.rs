//! PaymentMethod aggregate entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentMethodId, Timestamp, UserId};

/// Kind of stored payment instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Card,
    BankAccount,
}

impl PaymentMethodKind {
    /// Returns the wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodKind::Card => "card",
            PaymentMethodKind::BankAccount => "bank_account",
        }
    }
}

/// PaymentMethod aggregate - one stored instrument for a user.
///
/// # Invariants
///
/// - at most one active method per user has `is_default = true`; enforced
///   by `PaymentMethodRepository::set_default_exclusive`, not by this type
/// - a deactivated method is never the default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Unique identifier for this method.
    pub id: PaymentMethodId,

    /// User who owns this method.
    pub user_id: UserId,

    /// Card or bank account.
    pub kind: PaymentMethodKind,

    /// The processor's reference for the stored instrument.
    pub processor_method_id: Option<String>,

    /// Last four digits of the card or account number.
    pub last_four: Option<String>,

    /// Card brand (card methods only).
    pub brand: Option<String>,

    /// Bank name (bank account methods only).
    pub bank_name: Option<String>,

    /// Whether this is the user's default method.
    pub is_default: bool,

    /// Whether this method can still be charged.
    pub is_active: bool,

    /// When the method was stored.
    pub created_at: Timestamp,

    /// When the method was last updated.
    pub updated_at: Timestamp,
}

impl PaymentMethod {
    /// Stores a new active, non-default method.
    pub fn new(
        id: PaymentMethodId,
        user_id: UserId,
        kind: PaymentMethodKind,
        processor_method_id: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id,
            kind,
            processor_method_id,
            last_four: None,
            brand: None,
            bank_name: None,
            is_default: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attaches card display details.
    pub fn with_card_details(
        mut self,
        last_four: impl Into<String>,
        brand: impl Into<String>,
    ) -> Self {
        self.last_four = Some(last_four.into());
        self.brand = Some(brand.into());
        self
    }

    /// Attaches bank account display details.
    pub fn with_bank_details(
        mut self,
        last_four: impl Into<String>,
        bank_name: impl Into<String>,
    ) -> Self {
        self.last_four = Some(last_four.into());
        self.bank_name = Some(bank_name.into());
        self
    }

    /// Marks this method as the user's default.
    pub fn set_default(&mut self) {
        self.is_default = true;
        self.updated_at = Timestamp::now();
    }

    /// Clears the default flag.
    pub fn clear_default(&mut self) {
        self.is_default = false;
        self.updated_at = Timestamp::now();
    }

    /// Deactivates the method. A removed method can never remain the
    /// user's default.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.is_default = false;
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_method() -> PaymentMethod {
        PaymentMethod::new(
            PaymentMethodId::new(),
            UserId::new("user-1").unwrap(),
            PaymentMethodKind::Card,
            Some("pm_123".to_string()),
        )
        .with_card_details("4242", "visa")
    }

    #[test]
    fn new_method_is_active_and_not_default() {
        let method = test_method();
        assert!(method.is_active);
        assert!(!method.is_default);
        assert_eq!(method.last_four.as_deref(), Some("4242"));
        assert_eq!(method.brand.as_deref(), Some("visa"));
    }

    #[test]
    fn set_default_marks_method() {
        let mut method = test_method();
        method.set_default();
        assert!(method.is_default);
    }

    #[test]
    fn deactivate_clears_default() {
        let mut method = test_method();
        method.set_default();

        method.deactivate();

        assert!(!method.is_active);
        assert!(!method.is_default);
    }

    #[test]
    fn bank_details_set_bank_name() {
        let method = PaymentMethod::new(
            PaymentMethodId::new(),
            UserId::new("user-2").unwrap(),
            PaymentMethodKind::BankAccount,
            None,
        )
        .with_bank_details("6789", "First National");

        assert_eq!(method.bank_name.as_deref(), Some("First National"));
        assert!(method.brand.is_none());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&PaymentMethodKind::BankAccount).unwrap();
        assert_eq!(json, "\"bank_account\"");
    }
}
