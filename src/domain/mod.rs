// ============================================================================
// Domain Layer - Business Modules
// ============================================================================
//
// Each module owns its persistence and business rules and talks to the
// others only through `crate::contracts` (mediator requests, services
// resolved from the registry, integration events).
//
// Initialisation order: notification → customer → order.
//
// ============================================================================

pub mod customer;
pub mod module;
pub mod notification;
pub mod order;

pub use module::{Module, ModuleContext};
