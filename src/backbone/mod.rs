// ============================================================================
// Consistency Backbone
// ============================================================================
//
// - core:      aggregates, domain and integration events
// - store:     database context and the unit-of-work transactor
// - messaging: mediator, service registry, domain dispatcher, event bus
//
// ============================================================================

pub mod core;
pub mod messaging;
pub mod store;

use std::any::Any;

/// Render a caught panic payload for logging
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
