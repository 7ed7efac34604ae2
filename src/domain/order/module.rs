use std::sync::Arc;

use super::command_handler::{CancelOrderHandler, CreateOrderHandler};
use super::repository::OrderRepository;
use crate::contracts::notification::NOTIFICATION_SERVICE;
use crate::domain::module::{Module, ModuleContext};
use crate::errors::AppError;

#[derive(Debug, Default)]
pub struct OrderModule;

impl Module for OrderModule {
    fn name(&self) -> &'static str {
        "order"
    }

    fn init(&self, ctx: &mut ModuleContext<'_>) -> Result<(), AppError> {
        let notifications = ctx.registry.resolve(NOTIFICATION_SERVICE)?;
        let repository = Arc::new(OrderRepository::new());
        let mediator = ctx.mediator.handle();

        ctx.mediator.register(CreateOrderHandler::new(
            ctx.transactor.clone(),
            mediator.clone(),
            repository.clone(),
            notifications,
        ))?;
        ctx.mediator.register(CancelOrderHandler::new(
            ctx.transactor.clone(),
            mediator,
            repository,
        ))?;

        Ok(())
    }
}
