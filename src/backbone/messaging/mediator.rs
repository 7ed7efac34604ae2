use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::backbone::store::DbContext;
use crate::errors::{AppError, ErrorKind};
use crate::metrics::Metrics;

// ============================================================================
// Mediator - typed command/query router
// ============================================================================
//
// Every request type has exactly one handler. Registration happens during
// boot on a `MediatorBuilder`; `build()` freezes the table and from then on
// `send` is a lock-free map lookup.
//
// Handles taken with `MediatorBuilder::handle()` before the table is frozen
// become usable once `build()` runs, so modules can wire handlers that call
// into other modules registered later.
//
// ============================================================================

/// A command or query routed through the mediator
pub trait Request: Send + 'static {
    type Response: Send + 'static;
}

#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    type Request: Request;

    async fn handle(
        &self,
        ctx: &DbContext,
        request: Self::Request,
    ) -> Result<<Self::Request as Request>::Response, AppError>;
}

struct Registration {
    request: &'static str,
    /// `Arc<dyn RequestHandler<Request = R>>` for the keyed `R`
    handler: Box<dyn Any + Send + Sync>,
}

type HandlerTable = HashMap<TypeId, Registration>;

pub struct MediatorBuilder {
    handlers: HandlerTable,
    table: Arc<OnceLock<HandlerTable>>,
    metrics: Arc<Metrics>,
}

impl MediatorBuilder {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            handlers: HashMap::new(),
            table: Arc::new(OnceLock::new()),
            metrics,
        }
    }

    /// Mediator that starts routing once this builder is built
    pub fn handle(&self) -> Mediator {
        Mediator {
            table: self.table.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn register<H: RequestHandler>(&mut self, handler: H) -> Result<(), AppError> {
        let type_id = TypeId::of::<H::Request>();
        let request = short_type_name::<H::Request>();

        if self.handlers.contains_key(&type_id) {
            return Err(AppError::new(
                ErrorKind::DuplicateRegistration,
                format!("handler already registered for {request}"),
            ));
        }

        let handler: Arc<dyn RequestHandler<Request = H::Request>> = Arc::new(handler);
        self.handlers.insert(
            type_id,
            Registration {
                request,
                handler: Box::new(handler),
            },
        );
        tracing::debug!(request, "Registered request handler");
        Ok(())
    }

    pub fn is_registered<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    pub fn build(self) -> Mediator {
        let registered = self.handlers.len();
        if self.table.set(self.handlers).is_err() {
            tracing::warn!("Mediator table was already frozen");
        }
        tracing::info!(handlers = registered, "Mediator ready");
        Mediator {
            table: self.table,
            metrics: self.metrics,
        }
    }
}

#[derive(Clone)]
pub struct Mediator {
    table: Arc<OnceLock<HandlerTable>>,
    metrics: Arc<Metrics>,
}

impl Mediator {
    pub async fn send<R: Request>(&self, ctx: &DbContext, request: R) -> Result<R::Response, AppError> {
        let name = short_type_name::<R>();
        let handler = match self.resolve::<R>(name) {
            Ok(handler) => handler,
            Err(e) => {
                self.metrics.record_request(name, false);
                return Err(e);
            }
        };

        let result = handler.handle(ctx, request).await;
        self.metrics.record_request(name, result.is_ok());
        if let Err(e) = &result {
            tracing::debug!(request = name, error = %e, "Request failed");
        }
        result
    }

    fn resolve<R: Request>(&self, name: &str) -> Result<Arc<dyn RequestHandler<Request = R>>, AppError> {
        let table = self
            .table
            .get()
            .ok_or_else(|| AppError::operation_failed("mediator is not ready: registration still in progress"))?;

        let registration = table.get(&TypeId::of::<R>()).ok_or_else(|| {
            AppError::new(
                ErrorKind::HandlerNotRegistered,
                format!("no handler registered for {name}"),
            )
        })?;

        registration
            .handler
            .downcast_ref::<Arc<dyn RequestHandler<Request = R>>>()
            .cloned()
            .ok_or_else(|| {
                AppError::operation_failed(format!(
                    "handler registered for {} has an unexpected type",
                    registration.request
                ))
            })
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::store::testing::lazy_pool;

    struct Double(i64);

    impl Request for Double {
        type Response = i64;
    }

    struct Shout(String);

    impl Request for Shout {
        type Response = String;
    }

    struct DoubleHandler;

    #[async_trait]
    impl RequestHandler for DoubleHandler {
        type Request = Double;

        async fn handle(&self, _ctx: &DbContext, request: Double) -> Result<i64, AppError> {
            Ok(request.0 * 2)
        }
    }

    struct ShoutHandler;

    #[async_trait]
    impl RequestHandler for ShoutHandler {
        type Request = Shout;

        async fn handle(&self, _ctx: &DbContext, request: Shout) -> Result<String, AppError> {
            if request.0.is_empty() {
                return Err(AppError::input_validation("nothing to shout"));
            }
            Ok(request.0.to_uppercase())
        }
    }

    fn builder() -> MediatorBuilder {
        MediatorBuilder::new(Arc::new(Metrics::new().unwrap()))
    }

    #[tokio::test]
    async fn test_send_routes_by_request_type() {
        let mut builder = builder();
        builder.register(DoubleHandler).unwrap();
        builder.register(ShoutHandler).unwrap();
        let mediator = builder.build();
        let ctx = DbContext::root(lazy_pool());

        assert_eq!(mediator.send(&ctx, Double(21)).await.unwrap(), 42);
        assert_eq!(mediator.send(&ctx, Shout("hi".into())).await.unwrap(), "HI");
    }

    #[tokio::test]
    async fn test_handler_errors_propagate() {
        let mut builder = builder();
        builder.register(ShoutHandler).unwrap();
        let mediator = builder.build();
        let ctx = DbContext::root(lazy_pool());

        let err = mediator.send(&ctx, Shout(String::new())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[tokio::test]
    async fn test_unregistered_request_fails_without_panic() {
        let mut builder = builder();
        builder.register(DoubleHandler).unwrap();
        let mediator = builder.build();
        let ctx = DbContext::root(lazy_pool());

        let err = mediator.send(&ctx, Shout("hi".into())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerNotRegistered);
        assert!(err.message().contains("Shout"));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut builder = builder();
        builder.register(DoubleHandler).unwrap();

        let err = builder.register(DoubleHandler).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateRegistration);
        assert!(builder.is_registered::<Double>());
        assert!(!builder.is_registered::<Shout>());
    }

    #[tokio::test]
    async fn test_early_handle_works_after_build() {
        let mut builder = builder();
        let early = builder.handle();
        let ctx = DbContext::root(lazy_pool());

        let err = early.send(&ctx, Double(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);

        builder.register(DoubleHandler).unwrap();
        builder.build();
        assert_eq!(early.send(&ctx, Double(5)).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_sends() {
        let mut builder = builder();
        builder.register(DoubleHandler).unwrap();
        let mediator = builder.build();
        let ctx = DbContext::root(lazy_pool());

        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let mediator = mediator.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move { mediator.send(&ctx, Double(n)).await })
            })
            .collect();

        for (n, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap().unwrap(), n as i64 * 2);
        }
    }
}
