// ============================================================================
// Backbone Core - Aggregates and Events
// ============================================================================
//
// Generic building blocks shared by every module. No module-specific code
// (no Customer, Order, ...) lives here.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::{Aggregate, PendingEvents};
pub use event::{DomainEvent, EventPayload, IntegrationEvent};
