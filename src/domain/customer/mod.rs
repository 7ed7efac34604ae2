// ============================================================================
// Customer Domain - credit accounts
// ============================================================================
//
// This module contains ALL Customer-specific code:
// - Value objects (Email)
// - Domain events (CustomerCreated)
// - Errors (CustomerError enum)
// - Aggregate (Customer with credit rules)
// - Repository (SQL persistence through the DbContext)
// - Command handlers (create, get by id, reserve/release credit)
// - Module wiring
//
// ============================================================================

pub mod aggregate;
pub mod command_handler;
pub mod errors;
pub mod events;
pub mod module;
pub mod repository;
pub mod value_objects;

pub use aggregate::Customer;
pub use errors::CustomerError;
pub use events::{CustomerDomainEvent, CustomerEventName};
pub use module::CustomerModule;
pub use value_objects::Email;
