use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backbone::core::{DomainEvent, EventPayload};
use crate::backbone::store::DbContext;
use crate::errors::AppError;

// ============================================================================
// Domain Event Dispatcher
// ============================================================================
//
// Synchronous in-process fan-out, invoked from a post-commit hook:
// events in order, and for each event its handlers in registration order.
// Handlers share the caller's context, so they can read the database or
// route further requests through the mediator.
// The first handler error stops the dispatch and is returned to the hook,
// which logs it.
//
// ============================================================================

#[async_trait]
pub trait DomainEventHandler<P: EventPayload>: Send + Sync {
    async fn handle(&self, ctx: &DbContext, event: &DomainEvent<P>) -> Result<(), AppError>;
}

type Handlers<P> = HashMap<<P as EventPayload>::Name, Vec<Arc<dyn DomainEventHandler<P>>>>;

pub struct DomainEventDispatcherBuilder<P: EventPayload> {
    handlers: Handlers<P>,
}

impl<P: EventPayload> Default for DomainEventDispatcherBuilder<P> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<P: EventPayload> DomainEventDispatcherBuilder<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: P::Name, handler: Arc<dyn DomainEventHandler<P>>) -> &mut Self {
        self.handlers.entry(name).or_default().push(handler);
        self
    }

    pub fn build(self) -> DomainEventDispatcher<P> {
        DomainEventDispatcher {
            handlers: Arc::new(self.handlers),
        }
    }
}

pub struct DomainEventDispatcher<P: EventPayload> {
    handlers: Arc<Handlers<P>>,
}

impl<P: EventPayload> Clone for DomainEventDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<P: EventPayload> DomainEventDispatcher<P> {
    pub async fn dispatch(&self, ctx: &DbContext, events: &[DomainEvent<P>]) -> Result<(), AppError> {
        for event in events {
            let name = event.name();
            let Some(handlers) = self.handlers.get(&name) else {
                tracing::trace!(event = %name, "No domain event handlers");
                continue;
            };

            for handler in handlers {
                handler.handle(ctx, event).await.map_err(|e| {
                    AppError::new(e.kind(), format!("error handling event {name}: {}", e.message()))
                        .with_source(e)
                })?;
            }
        }
        Ok(())
    }

    pub fn handler_count(&self, name: P::Name) -> usize {
        self.handlers.get(&name).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::core::event::test_support::{PingEvent, PingName};
    use crate::backbone::store::testing::lazy_pool;
    use crate::errors::ErrorKind;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Recorder {
        label: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl DomainEventHandler<PingEvent> for Recorder {
        async fn handle(&self, _ctx: &DbContext, event: &DomainEvent<PingEvent>) -> Result<(), AppError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{:?}", self.label, event.payload));
            if self.fail {
                return Err(AppError::business_rule("handler refused"));
            }
            Ok(())
        }
    }

    fn recorder(label: &'static str, seen: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<Recorder> {
        Arc::new(Recorder {
            label,
            seen: seen.clone(),
            fail,
        })
    }

    #[tokio::test]
    async fn test_dispatch_runs_handlers_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = DomainEventDispatcherBuilder::<PingEvent>::new();
        builder
            .register(PingName::Ping, recorder("a", &seen, false))
            .register(PingName::Ping, recorder("b", &seen, false))
            .register(PingName::Pong, recorder("c", &seen, false));
        let dispatcher = builder.build();

        let events = vec![
            DomainEvent::new(PingEvent::Ping(1)),
            DomainEvent::new(PingEvent::Pong(2)),
        ];
        dispatcher.dispatch(&DbContext::root(lazy_pool()), &events).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:Ping(1)", "b:Ping(1)", "c:Pong(2)"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_handlers_is_noop() {
        let dispatcher = DomainEventDispatcherBuilder::<PingEvent>::new().build();

        dispatcher
            .dispatch(&DbContext::root(lazy_pool()), &[DomainEvent::new(PingEvent::Ping(1))])
            .await
            .unwrap();
        assert_eq!(dispatcher.handler_count(PingName::Ping), 0);
    }

    #[tokio::test]
    async fn test_first_error_aborts_remaining_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = DomainEventDispatcherBuilder::<PingEvent>::new();
        builder
            .register(PingName::Ping, recorder("a", &seen, true))
            .register(PingName::Ping, recorder("b", &seen, false))
            .register(PingName::Pong, recorder("c", &seen, false));
        let dispatcher = builder.build();

        let events = vec![
            DomainEvent::new(PingEvent::Ping(1)),
            DomainEvent::new(PingEvent::Pong(2)),
        ];
        let err = dispatcher
            .dispatch(&DbContext::root(lazy_pool()), &events)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert!(err.message().starts_with("error handling event Ping"));
        assert_eq!(*seen.lock().unwrap(), vec!["a:Ping(1)"]);
    }

    struct DeadlineRecorder {
        seen: Arc<Mutex<Vec<bool>>>,
    }

    #[async_trait]
    impl DomainEventHandler<PingEvent> for DeadlineRecorder {
        async fn handle(&self, ctx: &DbContext, _event: &DomainEvent<PingEvent>) -> Result<(), AppError> {
            self.seen.lock().unwrap().push(ctx.deadline().is_some());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_handlers_receive_the_dispatch_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = DomainEventDispatcherBuilder::<PingEvent>::new();
        builder.register(PingName::Ping, Arc::new(DeadlineRecorder { seen: seen.clone() }));
        let dispatcher = builder.build();

        let ctx = DbContext::root(lazy_pool()).with_timeout(Duration::from_secs(30));
        dispatcher
            .dispatch(&ctx, &[DomainEvent::new(PingEvent::Ping(1))])
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }
}
