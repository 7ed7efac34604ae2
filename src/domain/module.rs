use crate::backbone::messaging::{MediatorBuilder, ServiceRegistry};
use crate::backbone::store::Transactor;
use crate::contracts::messaging::AppEventBusBuilder;
use crate::errors::AppError;

/// Boot-time view of the shared tables a module registers into
pub struct ModuleContext<'a> {
    pub registry: &'a mut ServiceRegistry,
    pub mediator: &'a mut MediatorBuilder,
    pub event_bus: &'a mut AppEventBusBuilder,
    pub transactor: Transactor,
}

pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register handlers and services; resolve dependencies published by earlier modules
    fn init(&self, ctx: &mut ModuleContext<'_>) -> Result<(), AppError>;
}
