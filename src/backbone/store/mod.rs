// ============================================================================
// Store - database context, unit of work and schema
// ============================================================================

pub mod context;
pub mod schema;
pub mod transactor;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Conn, DbContext};
pub use schema::{from_millis, migrate};
pub use transactor::{HookRegistrar, NestingStrategy, PostCommitHook, Transactor};
