// ============================================================================
// Notification Domain - outbound email
// ============================================================================
//
// Publishes the `NotificationService` capability for other modules and
// greets new customers when the CustomerCreated integration event arrives.
//
// ============================================================================

pub mod handlers;
pub mod module;
pub mod service;

pub use handlers::WelcomeEmailHandler;
pub use module::NotificationModule;
pub use service::LoggingNotificationService;
