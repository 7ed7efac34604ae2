use sqlx::AnyPool;
use std::sync::Arc;

use crate::backbone::messaging::{Mediator, MediatorBuilder, Request, ServiceRegistry};
use crate::backbone::store::{DbContext, NestingStrategy, Transactor};
use crate::contracts::messaging::{AppEventBus, AppEventBusBuilder};
use crate::contracts::notification::NotificationService;
use crate::domain::customer::CustomerModule;
use crate::domain::notification::NotificationModule;
use crate::domain::order::OrderModule;
use crate::domain::{Module, ModuleContext};
use crate::errors::AppError;
use crate::metrics::Metrics;

// ============================================================================
// Application - module wiring
// ============================================================================
//
// Boot runs in two phases:
// 1. every module registers into the builders, in the order given
// 2. the mediator and event bus are frozen; from here on all tables are
//    read-only and shared freely between request workers
//
// ============================================================================

/// Modules in dependency order: a module may only resolve services
/// registered by the ones before it
pub fn default_modules(notifications: Arc<dyn NotificationService>) -> Vec<Box<dyn Module>> {
    vec![
        Box::new(NotificationModule::new(notifications)),
        Box::new(CustomerModule),
        Box::new(OrderModule),
    ]
}

#[derive(Clone)]
pub struct Application {
    ctx: DbContext,
    mediator: Mediator,
    registry: Arc<ServiceRegistry>,
    event_bus: AppEventBus,
    transactor: Transactor,
    metrics: Arc<Metrics>,
}

impl Application {
    pub fn build(
        pool: AnyPool,
        metrics: Arc<Metrics>,
        nesting: NestingStrategy,
        modules: Vec<Box<dyn Module>>,
    ) -> Result<Self, AppError> {
        let transactor = Transactor::new(nesting, metrics.clone());
        let mut registry = ServiceRegistry::new();
        let mut mediator = MediatorBuilder::new(metrics.clone());
        let mut event_bus = AppEventBusBuilder::new(metrics.clone());

        for module in &modules {
            let mut ctx = ModuleContext {
                registry: &mut registry,
                mediator: &mut mediator,
                event_bus: &mut event_bus,
                transactor: transactor.clone(),
            };
            module.init(&mut ctx).map_err(|e| {
                tracing::error!(module = module.name(), error = %e, "❌ Module initialization failed");
                e
            })?;
            tracing::info!(module = module.name(), "✅ Module initialized");
        }

        let mediator = mediator.build();
        let event_bus = event_bus.build();
        tracing::info!(
            modules = modules.len(),
            services = registry.len(),
            nesting = ?nesting,
            "🚀 Application ready"
        );

        Ok(Self {
            ctx: DbContext::root(pool),
            mediator,
            registry: Arc::new(registry),
            event_bus,
            transactor,
            metrics,
        })
    }

    /// Root context for requests; callers narrow it with a deadline
    pub fn context(&self) -> &DbContext {
        &self.ctx
    }

    pub fn mediator(&self) -> &Mediator {
        &self.mediator
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn event_bus(&self) -> &AppEventBus {
        &self.event_bus
    }

    pub fn transactor(&self) -> &Transactor {
        &self.transactor
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Route a request with the given context
    pub async fn send<R: Request>(&self, ctx: &DbContext, request: R) -> Result<R::Response, AppError> {
        self.mediator.send(ctx, request).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::TestApp;
    use super::*;
    use crate::backbone::messaging::IntegrationEventHandler;
    use crate::backbone::store::testing::{lazy_pool, TestDatabase};
    use crate::contracts::messaging::{AppIntegrationEvent, IntegrationEventName, IntegrationEventPayload};
    use crate::domain::notification::LoggingNotificationService;
    use async_trait::async_trait;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
    use crate::contracts::customer::{CreateCustomerCommand, GetCustomerByIdQuery};
    use crate::contracts::notification::NOTIFICATION_SERVICE;
    use crate::contracts::order::{CancelOrderCommand, CreateOrderCommand};
    use crate::domain::notification::service::testing::next_email;
    use crate::errors::ErrorKind;

    fn metrics() -> Arc<Metrics> {
        Arc::new(Metrics::new().unwrap())
    }

    #[tokio::test]
    async fn test_boot_registers_every_module() {
        let app = TestApp::new().await;

        assert!(app.app.registry().contains(NOTIFICATION_SERVICE.name()));
        assert_eq!(
            app.app
                .event_bus()
                .subscriber_count(IntegrationEventName::CustomerCreated),
            1
        );
    }

    /// Reads the new customer back through the mediator on its delivery context
    struct CreditAuditor {
        mediator: Mediator,
        seen: UnboundedSender<i64>,
    }

    #[async_trait]
    impl IntegrationEventHandler<IntegrationEventPayload> for CreditAuditor {
        fn name(&self) -> &'static str {
            "CreditAuditor"
        }

        async fn handle(&self, ctx: DbContext, event: AppIntegrationEvent) -> Result<(), AppError> {
            let IntegrationEventPayload::CustomerCreated { customer_id, .. } = event.payload;
            let info = self.mediator.send(&ctx, GetCustomerByIdQuery { customer_id }).await?;
            let _ = self.seen.send(info.credit);
            Ok(())
        }
    }

    struct AuditModule {
        seen: UnboundedSender<i64>,
    }

    impl Module for AuditModule {
        fn name(&self) -> &'static str {
            "audit"
        }

        fn init(&self, ctx: &mut ModuleContext<'_>) -> Result<(), AppError> {
            ctx.event_bus.subscribe(
                IntegrationEventName::CustomerCreated,
                Arc::new(CreditAuditor {
                    mediator: ctx.mediator.handle(),
                    seen: self.seen.clone(),
                }),
            );
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_integration_handler_reads_through_its_context() {
        let db = TestDatabase::new().await;
        let (seen, mut credits) = unbounded_channel();
        let mut modules = default_modules(Arc::new(LoggingNotificationService));
        modules.push(Box::new(AuditModule { seen }));
        let app = Application::build(db.pool.clone(), metrics(), NestingStrategy::Savepoints, modules).unwrap();

        app.send(
            app.context(),
            CreateCustomerCommand {
                email: "ada@example.com".to_string(),
                credit: 75,
            },
        )
        .await
        .unwrap();

        let credit = tokio::time::timeout(std::time::Duration::from_secs(2), credits.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credit, 75);
    }

    #[tokio::test]
    async fn test_order_module_requires_notification_service() {
        let modules: Vec<Box<dyn Module>> = vec![Box::new(CustomerModule), Box::new(OrderModule)];

        let err = Application::build(lazy_pool(), metrics(), NestingStrategy::Savepoints, modules)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ServiceNotFound);
        assert!(err.message().contains("NotificationService"));
    }

    #[tokio::test]
    async fn test_module_registered_twice_fails_boot() {
        let modules: Vec<Box<dyn Module>> = vec![Box::new(CustomerModule), Box::new(CustomerModule)];

        let err = Application::build(lazy_pool(), metrics(), NestingStrategy::Savepoints, modules)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::DuplicateRegistration);
    }

    async fn run_order_lifecycle(nesting: NestingStrategy) {
        let mut app = TestApp::with_nesting(nesting).await;

        let customer_id = app
            .send(CreateCustomerCommand {
                email: "grace@example.com".to_string(),
                credit: 100,
            })
            .await
            .unwrap();
        assert_eq!(next_email(&mut app.emails).await.subject, "Welcome to our service!");

        let order_id = app
            .send(CreateOrderCommand { customer_id, order_total: 60 })
            .await
            .unwrap();
        assert_eq!(next_email(&mut app.emails).await.subject, "Order Created");

        let err = app
            .send(CreateOrderCommand { customer_id, order_total: 50 })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert_eq!(app.db.count("orders").await, 1);

        app.send(CancelOrderCommand { order_id }).await.unwrap();
        let info = app.send(GetCustomerByIdQuery { customer_id }).await.unwrap();
        assert_eq!(info.credit, 100);
    }

    #[tokio::test]
    async fn test_order_lifecycle_with_savepoints() {
        run_order_lifecycle(NestingStrategy::Savepoints).await;
    }

    #[tokio::test]
    async fn test_order_lifecycle_with_flatten() {
        run_order_lifecycle(NestingStrategy::Flatten).await;
    }
}
