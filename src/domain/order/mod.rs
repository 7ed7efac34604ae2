// ============================================================================
// Order Domain - orders backed by customer credit
// ============================================================================
//
// - Errors (OrderError enum)
// - Order entity
// - Repository
// - Command handlers (create, cancel)
// - Module wiring
//
// ============================================================================

pub mod aggregate;
pub mod command_handler;
pub mod errors;
pub mod module;
pub mod repository;

pub use aggregate::Order;
pub use errors::OrderError;
pub use module::OrderModule;
