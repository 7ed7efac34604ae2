use std::sync::Arc;

use super::command_handler::{
    CreateCustomerHandler, CustomerCreatedHandler, GetCustomerByIdHandler, ReleaseCreditHandler,
    ReserveCreditHandler,
};
use super::events::{CustomerDomainEvent, CustomerEventName};
use super::repository::CustomerRepository;
use crate::backbone::messaging::DomainEventDispatcherBuilder;
use crate::domain::module::{Module, ModuleContext};
use crate::errors::AppError;

#[derive(Debug, Default)]
pub struct CustomerModule;

impl Module for CustomerModule {
    fn name(&self) -> &'static str {
        "customer"
    }

    fn init(&self, ctx: &mut ModuleContext<'_>) -> Result<(), AppError> {
        let repository = Arc::new(CustomerRepository::new());

        let mut dispatcher = DomainEventDispatcherBuilder::<CustomerDomainEvent>::new();
        dispatcher.register(
            CustomerEventName::Created,
            Arc::new(CustomerCreatedHandler::new(ctx.event_bus.handle())),
        );
        let dispatcher = dispatcher.build();

        ctx.mediator.register(CreateCustomerHandler::new(
            ctx.transactor.clone(),
            repository.clone(),
            dispatcher,
        ))?;
        ctx.mediator.register(GetCustomerByIdHandler::new(repository.clone()))?;
        ctx.mediator.register(ReserveCreditHandler::new(
            ctx.transactor.clone(),
            repository.clone(),
        ))?;
        ctx.mediator.register(ReleaseCreditHandler::new(ctx.transactor.clone(), repository))?;

        Ok(())
    }
}
