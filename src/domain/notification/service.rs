use async_trait::async_trait;

use crate::contracts::notification::NotificationService;
use crate::errors::AppError;

/// Writes outgoing emails to the log instead of a mail server
#[derive(Debug, Default, Clone)]
pub struct LoggingNotificationService;

#[async_trait]
impl NotificationService for LoggingNotificationService {
    async fn send_email(&self, to: &str, subject: &str, payload: serde_json::Value) -> Result<(), AppError> {
        tracing::info!(to, subject, payload = %payload, "📧 Sending email");
        Ok(())
    }
}
