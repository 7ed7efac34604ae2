use async_trait::async_trait;
use std::sync::Arc;

use crate::backbone::messaging::IntegrationEventHandler;
use crate::backbone::store::DbContext;
use crate::contracts::messaging::{AppIntegrationEvent, IntegrationEventPayload};
use crate::contracts::notification::NotificationService;
use crate::errors::AppError;

const WELCOME_SUBJECT: &str = "Welcome to our service!";
const WELCOME_MESSAGE: &str = "Thank you for joining us! We are excited to have you as a member.";

/// Sends the welcome email when a customer is created
pub struct WelcomeEmailHandler {
    notifications: Arc<dyn NotificationService>,
}

impl WelcomeEmailHandler {
    pub fn new(notifications: Arc<dyn NotificationService>) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl IntegrationEventHandler<IntegrationEventPayload> for WelcomeEmailHandler {
    fn name(&self) -> &'static str {
        "WelcomeEmailHandler"
    }

    async fn handle(&self, _ctx: DbContext, event: AppIntegrationEvent) -> Result<(), AppError> {
        match event.payload {
            IntegrationEventPayload::CustomerCreated { customer_id, email } => {
                tracing::debug!(%customer_id, event_id = %event.id, "Sending welcome email");
                self.notifications
                    .send_email(&email, WELCOME_SUBJECT, serde_json::json!({ "message": WELCOME_MESSAGE }))
                    .await
            }
        }
    }
}
