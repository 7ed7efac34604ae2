use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::backbone::core::EventPayload;

// ============================================================================
// Customer Domain Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomerEventName {
    Created,
}

impl fmt::Display for CustomerEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerEventName::Created => f.write_str("CustomerCreated"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustomerDomainEvent {
    Created { customer_id: Uuid, email: String },
}

impl EventPayload for CustomerDomainEvent {
    type Name = CustomerEventName;

    fn name(&self) -> CustomerEventName {
        match self {
            CustomerDomainEvent::Created { .. } => CustomerEventName::Created,
        }
    }
}
