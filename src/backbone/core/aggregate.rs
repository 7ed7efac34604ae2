use super::event::{DomainEvent, EventPayload};

// ============================================================================
// Aggregate Root Pattern
// ============================================================================
//
// Key Principles:
// 1. Aggregates enforce their own invariants before changing state
// 2. Every accepted change is recorded as a pending domain event
// 3. Pending events are drained exactly once, after the write is persisted
//
// ============================================================================

/// Append-only buffer of domain events not yet handed to a dispatcher
#[derive(Debug, Clone)]
pub struct PendingEvents<P> {
    events: Vec<DomainEvent<P>>,
}

impl<P> Default for PendingEvents<P> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<P: EventPayload> PendingEvents<P> {
    pub fn record(&mut self, payload: P) {
        self.events.push(DomainEvent::new(payload));
    }

    pub fn pending(&self) -> &[DomainEvent<P>] {
        &self.events
    }

    /// Take every pending event, leaving the buffer empty
    pub fn drain(&mut self) -> Vec<DomainEvent<P>> {
        std::mem::take(&mut self.events)
    }
}

/// Generic Aggregate trait - all persisted entities that record events implement this
pub trait Aggregate: Send + Sync {
    type Event: EventPayload;

    fn pending_events(&mut self) -> &mut PendingEvents<Self::Event>;

    /// Drain recorded events; a second pull with no new changes is empty
    fn pull_domain_events(&mut self) -> Vec<DomainEvent<Self::Event>> {
        self.pending_events().drain()
    }
}
