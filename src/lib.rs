// ============================================================================
// Modular Orders - Customer credit and order lifecycle backend
// ============================================================================
//
// Layout:
// - backbone:  unit of work, mediator, service registry, event propagation
// - contracts: types modules share without importing each other
// - domain:    customer, order and notification modules
// - app/http:  module wiring and the HTTP surface
//
// ============================================================================

pub mod app;
pub mod backbone;
pub mod config;
pub mod contracts;
pub mod domain;
pub mod errors;
pub mod http;
pub mod metrics;

pub use app::Application;
pub use config::Config;
pub use errors::{AppError, ErrorKind};
