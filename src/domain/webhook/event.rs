//! Processor webhook event types.
//!
//! Defines the envelope the processor posts to the webhook endpoint.
//! Only fields relevant to reconciliation are captured; the rest of the
//! processor's schema is ignored.

use serde::{Deserialize, Serialize};

/// Processor webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEvent {
    /// Unique identifier for the event (evt_xxx format). Deduplication key.
    pub id: String,

    /// Type of event (e.g., "charge.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Object containing event-specific data.
    pub data: GatewayEventData,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayEventData {
    /// The object that triggered the event (shape varies by event type).
    pub object: serde_json::Value,
}

impl GatewayEvent {
    /// Parses the event type into a known enum variant.
    pub fn parsed_type(&self) -> GatewayEventType {
        GatewayEventType::from_str(&self.event_type)
    }

    /// Reads a string field off the event object.
    pub fn object_str(&self, field: &str) -> Option<&str> {
        self.data.object.get(field).and_then(|v| v.as_str())
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Known processor event types that reconcilers handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    /// A charge settled.
    ChargeSucceeded,
    /// A charge failed.
    ChargeFailed,
    /// A payment intent settled.
    PaymentIntentSucceeded,
    /// A payment intent failed.
    PaymentIntentFailed,
    /// A subscription invoice was paid.
    InvoicePaid,
    /// A subscription invoice payment failed.
    InvoicePaymentFailed,
    /// A subscription was created processor-side.
    SubscriptionCreated,
    /// A subscription changed processor-side.
    SubscriptionUpdated,
    /// A subscription ended processor-side.
    SubscriptionDeleted,
    /// A payment instrument was attached to a customer.
    PaymentMethodAttached,
    /// Unknown or unhandled event type.
    Unknown,
}

impl GatewayEventType {
    /// Parse event type from the wire string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "charge.succeeded" => Self::ChargeSucceeded,
            "charge.failed" => Self::ChargeFailed,
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentFailed,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "payment_method.attached" => Self::PaymentMethodAttached,
            _ => Self::Unknown,
        }
    }

    /// Convert to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChargeSucceeded => "charge.succeeded",
            Self::ChargeFailed => "charge.failed",
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentFailed => "payment_intent.payment_failed",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::PaymentMethodAttached => "payment_method.attached",
            Self::Unknown => "unknown",
        }
    }
}

/// Builder for creating test GatewayEvent instances.
#[cfg(test)]
pub struct GatewayEventBuilder {
    id: String,
    event_type: String,
    object: serde_json::Value,
}

#[cfg(test)]
impl GatewayEventBuilder {
    pub fn new() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "charge.succeeded".to_string(),
            object: serde_json::json!({}),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> GatewayEvent {
        GatewayEvent {
            id: self.id,
            event_type: self.event_type,
            data: GatewayEventData {
                object: self.object,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_minimal_event() {
        let json = r#"{
            "id": "evt_1234567890",
            "type": "charge.succeeded",
            "data": {
                "object": {"id": "ch_1", "payment_intent": "pi_1"}
            }
        }"#;

        let event: GatewayEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.id, "evt_1234567890");
        assert_eq!(event.event_type, "charge.succeeded");
        assert_eq!(event.object_str("payment_intent"), Some("pi_1"));
    }

    #[test]
    fn serialize_event_round_trips() {
        let event = GatewayEventBuilder::new()
            .id("evt_roundtrip")
            .event_type("invoice.paid")
            .object(json!({"subscription": "sub_1"}))
            .build();

        let json = serde_json::to_string(&event).unwrap();
        let parsed: GatewayEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, "evt_roundtrip");
        assert_eq!(parsed.event_type, "invoice.paid");
        assert_eq!(parsed.object_str("subscription"), Some("sub_1"));
    }

    #[test]
    fn event_type_strings_round_trip() {
        let types = [
            GatewayEventType::ChargeSucceeded,
            GatewayEventType::ChargeFailed,
            GatewayEventType::PaymentIntentSucceeded,
            GatewayEventType::PaymentIntentFailed,
            GatewayEventType::InvoicePaid,
            GatewayEventType::InvoicePaymentFailed,
            GatewayEventType::SubscriptionCreated,
            GatewayEventType::SubscriptionUpdated,
            GatewayEventType::SubscriptionDeleted,
            GatewayEventType::PaymentMethodAttached,
        ];

        for event_type in types {
            assert_eq!(GatewayEventType::from_str(event_type.as_str()), event_type);
        }
    }

    #[test]
    fn unknown_event_type_parses_to_unknown() {
        assert_eq!(
            GatewayEventType::from_str("customer.created"),
            GatewayEventType::Unknown
        );
    }

    #[test]
    fn parsed_type_reads_the_wire_string() {
        let event = GatewayEventBuilder::new()
            .event_type("payment_intent.succeeded")
            .build();
        assert_eq!(event.parsed_type(), GatewayEventType::PaymentIntentSucceeded);
    }

    #[test]
    fn object_str_returns_none_for_missing_field() {
        let event = GatewayEventBuilder::new().object(json!({})).build();
        assert_eq!(event.object_str("payment_intent"), None);
    }
}
