use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::backbone::core::{EventPayload, IntegrationEvent};
use crate::backbone::messaging::{EventBus, EventBusBuilder};

// ============================================================================
// Integration Events - published on the shared event bus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrationEventName {
    CustomerCreated,
}

impl fmt::Display for IntegrationEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationEventName::CustomerCreated => f.write_str("CustomerCreated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IntegrationEventPayload {
    CustomerCreated { customer_id: Uuid, email: String },
}

impl EventPayload for IntegrationEventPayload {
    type Name = IntegrationEventName;

    fn name(&self) -> IntegrationEventName {
        match self {
            IntegrationEventPayload::CustomerCreated { .. } => IntegrationEventName::CustomerCreated,
        }
    }
}

pub type AppIntegrationEvent = IntegrationEvent<IntegrationEventPayload>;
pub type AppEventBus = EventBus<IntegrationEventPayload>;
pub type AppEventBusBuilder = EventBusBuilder<IntegrationEventPayload>;

pub fn customer_created(customer_id: Uuid, email: impl Into<String>) -> AppIntegrationEvent {
    IntegrationEvent::new(IntegrationEventPayload::CustomerCreated {
        customer_id,
        email: email.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_created_wire_format() {
        let customer_id = Uuid::now_v7();
        let event = customer_created(customer_id, "ada@example.com");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["payload"]["type"], "CustomerCreated");
        assert_eq!(json["payload"]["data"]["email"], "ada@example.com");
        assert_eq!(json["payload"]["data"]["customer_id"], customer_id.to_string());
        assert_eq!(event.name().to_string(), "CustomerCreated");
    }
}
