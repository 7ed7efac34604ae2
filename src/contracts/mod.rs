// ============================================================================
// Contracts - the only types modules share
// ============================================================================
//
// Modules never import each other. Everything that crosses a module boundary
// (mediator requests, capability interfaces, integration events) lives here.
//
// ============================================================================

pub mod customer;
pub mod messaging;
pub mod notification;
pub mod order;
