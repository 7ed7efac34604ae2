// ============================================================================
// Messaging - how modules talk to each other
// ============================================================================
//
// - mediator:   one handler per command/query type
// - registry:   capability interfaces published by key
// - dispatcher: domain events fanned out after commit
// - event_bus:  integration events delivered asynchronously
//
// ============================================================================

pub mod dispatcher;
pub mod event_bus;
pub mod mediator;
pub mod registry;

pub use dispatcher::{DomainEventDispatcher, DomainEventDispatcherBuilder, DomainEventHandler};
pub use event_bus::{EventBus, EventBusBuilder, IntegrationEventHandler};
pub use mediator::{Mediator, MediatorBuilder, Request, RequestHandler};
pub use registry::{ServiceKey, ServiceRegistry};
