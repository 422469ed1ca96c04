//! CreatePaymentMethodHandler - stores a new payment instrument.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, PaymentMethodId, UserId};
use crate::domain::payment_method::{PaymentMethod, PaymentMethodKind};
use crate::ports::PaymentMethodRepository;

/// Command to store a payment instrument.
#[derive(Debug, Clone)]
pub struct CreatePaymentMethodCommand {
    pub user_id: UserId,
    pub kind: PaymentMethodKind,
    pub processor_method_id: Option<String>,
    pub last_four: Option<String>,
    pub brand: Option<String>,
    pub bank_name: Option<String>,
    /// Make this the user's default immediately.
    pub make_default: bool,
}

/// Handler for storing payment instruments.
pub struct CreatePaymentMethodHandler {
    methods: Arc<dyn PaymentMethodRepository>,
}

impl CreatePaymentMethodHandler {
    pub fn new(methods: Arc<dyn PaymentMethodRepository>) -> Self {
        Self { methods }
    }

    pub async fn handle(
        &self,
        cmd: CreatePaymentMethodCommand,
    ) -> Result<PaymentMethod, DomainError> {
        let mut method = PaymentMethod::new(
            PaymentMethodId::new(),
            cmd.user_id.clone(),
            cmd.kind,
            cmd.processor_method_id,
        );
        method.last_four = cmd.last_four;
        method.brand = cmd.brand;
        method.bank_name = cmd.bank_name;

        self.methods.save(&method).await?;

        if cmd.make_default {
            self.methods
                .set_default_exclusive(&cmd.user_id, &method.id)
                .await?;
            method.set_default();
        }

        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockMethodRepository {
        methods: Mutex<Vec<PaymentMethod>>,
    }

    impl MockMethodRepository {
        fn new() -> Self {
            Self {
                methods: Mutex::new(Vec::new()),
            }
        }

        fn all(&self) -> Vec<PaymentMethod> {
            self.methods.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentMethodRepository for MockMethodRepository {
        async fn save(&self, method: &PaymentMethod) -> Result<(), DomainError> {
            self.methods.lock().unwrap().push(method.clone());
            Ok(())
        }

        async fn update(&self, method: &PaymentMethod) -> Result<(), DomainError> {
            let mut methods = self.methods.lock().unwrap();
            if let Some(m) = methods.iter_mut().find(|m| m.id == method.id) {
                *m = method.clone();
            }
            Ok(())
        }

        async fn find_by_id(
            &self,
            id: &PaymentMethodId,
        ) -> Result<Option<PaymentMethod>, DomainError> {
            Ok(self
                .methods
                .lock()
                .unwrap()
                .iter()
                .find(|m| &m.id == id)
                .cloned())
        }

        async fn list_for_user(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<PaymentMethod>, DomainError> {
            Ok(self
                .methods
                .lock()
                .unwrap()
                .iter()
                .filter(|m| &m.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn set_default_exclusive(
            &self,
            user_id: &UserId,
            method_id: &PaymentMethodId,
        ) -> Result<(), DomainError> {
            let mut methods = self.methods.lock().unwrap();
            for m in methods.iter_mut().filter(|m| &m.user_id == user_id) {
                m.is_default = &m.id == method_id && m.is_active;
            }
            Ok(())
        }
    }

    fn card_command(make_default: bool) -> CreatePaymentMethodCommand {
        CreatePaymentMethodCommand {
            user_id: UserId::new("user-1").unwrap(),
            kind: PaymentMethodKind::Card,
            processor_method_id: Some("pm_1".to_string()),
            last_four: Some("4242".to_string()),
            brand: Some("visa".to_string()),
            bank_name: None,
            make_default: false,
        }
        .with_default(make_default)
    }

    impl CreatePaymentMethodCommand {
        fn with_default(mut self, make_default: bool) -> Self {
            self.make_default = make_default;
            self
        }
    }

    #[tokio::test]
    async fn stores_an_active_method() {
        let repo = Arc::new(MockMethodRepository::new());
        let handler = CreatePaymentMethodHandler::new(repo.clone());

        let method = handler.handle(card_command(false)).await.unwrap();

        assert!(method.is_active);
        assert!(!method.is_default);
        assert_eq!(method.last_four.as_deref(), Some("4242"));
        assert_eq!(repo.all().len(), 1);
    }

    #[tokio::test]
    async fn make_default_flags_the_new_method() {
        let repo = Arc::new(MockMethodRepository::new());
        let handler = CreatePaymentMethodHandler::new(repo.clone());

        let method = handler.handle(card_command(true)).await.unwrap();

        assert!(method.is_default);
        assert!(repo.all()[0].is_default);
    }
}
