use std::sync::Arc;

use super::handlers::WelcomeEmailHandler;
use super::service::LoggingNotificationService;
use crate::contracts::messaging::IntegrationEventName;
use crate::contracts::notification::{NotificationService, NOTIFICATION_SERVICE};
use crate::domain::module::{Module, ModuleContext};
use crate::errors::AppError;

pub struct NotificationModule {
    service: Arc<dyn NotificationService>,
}

impl NotificationModule {
    pub fn new(service: Arc<dyn NotificationService>) -> Self {
        Self { service }
    }
}

impl Default for NotificationModule {
    fn default() -> Self {
        Self::new(Arc::new(LoggingNotificationService))
    }
}

impl Module for NotificationModule {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn init(&self, ctx: &mut ModuleContext<'_>) -> Result<(), AppError> {
        ctx.registry.register(NOTIFICATION_SERVICE, self.service.clone())?;
        ctx.event_bus.subscribe(
            IntegrationEventName::CustomerCreated,
            Arc::new(WelcomeEmailHandler::new(self.service.clone())),
        );
        Ok(())
    }
}
