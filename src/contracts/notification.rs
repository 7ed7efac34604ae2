use async_trait::async_trait;

use crate::backbone::messaging::ServiceKey;
use crate::errors::AppError;

/// Outbound notifications, published by the notification module
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, payload: serde_json::Value) -> Result<(), AppError>;
}

pub const NOTIFICATION_SERVICE: ServiceKey<dyn NotificationService> =
    ServiceKey::new("NotificationService");
