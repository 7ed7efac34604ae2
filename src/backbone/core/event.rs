use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use uuid::Uuid;

// ============================================================================
// Event Primitives
// ============================================================================
//
// Events are tagged enums: one payload enum per event family, with a small
// `Copy` name enum used as the routing key by dispatchers and the event bus.
//
// ============================================================================

/// Payload of a domain or integration event family
pub trait EventPayload: Clone + Debug + Send + Sync + 'static {
    type Name: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    fn name(&self) -> Self::Name;
}

/// In-process fact recorded by an aggregate, consumed after commit
#[derive(Debug, Clone, PartialEq)]
pub struct DomainEvent<P> {
    pub occurred_at: DateTime<Utc>,
    pub payload: P,
}

impl<P: EventPayload> DomainEvent<P> {
    pub fn new(payload: P) -> Self {
        Self {
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn name(&self) -> P::Name {
        self.payload.name()
    }
}

/// Externally shareable projection of a domain event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationEvent<P> {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: P,
}

impl<P: EventPayload> IntegrationEvent<P> {
    pub fn new(payload: P) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn name(&self) -> P::Name {
        self.payload.name()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::EventPayload;
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum PingName {
        Ping,
        Pong,
    }

    impl fmt::Display for PingName {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                PingName::Ping => f.write_str("Ping"),
                PingName::Pong => f.write_str("Pong"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum PingEvent {
        Ping(u32),
        Pong(u32),
    }

    impl EventPayload for PingEvent {
        type Name = PingName;

        fn name(&self) -> PingName {
            match self {
                PingEvent::Ping(_) => PingName::Ping,
                PingEvent::Pong(_) => PingName::Pong,
            }
        }
    }
}
