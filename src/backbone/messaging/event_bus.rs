use async_trait::async_trait;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use crate::backbone::core::{EventPayload, IntegrationEvent};
use crate::backbone::panic_message;
use crate::backbone::store::DbContext;
use crate::errors::AppError;
use crate::metrics::Metrics;

// ============================================================================
// In-Memory Event Bus - integration events between modules
// ============================================================================
//
// Delivery is asynchronous and best-effort: every subscriber gets its own
// detached task, errors and panics are logged, nothing is retried and nothing
// survives a restart. Ordering across subscribers is undefined.
//
// Each delivery runs on a context detached from the publisher's: same pool,
// no transaction, no deadline.
//
// Subscriptions are collected on an `EventBusBuilder` during boot and frozen
// by `build()`. Handles taken earlier start delivering once the table is frozen.
//
// ============================================================================

#[async_trait]
pub trait IntegrationEventHandler<P: EventPayload>: Send + Sync {
    /// Handler name used in logs
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: DbContext, event: IntegrationEvent<P>) -> Result<(), AppError>;
}

type Subscriptions<P> =
    HashMap<<P as EventPayload>::Name, Vec<Arc<dyn IntegrationEventHandler<P>>>>;

pub struct EventBusBuilder<P: EventPayload> {
    subscriptions: Subscriptions<P>,
    table: Arc<OnceLock<Subscriptions<P>>>,
    metrics: Arc<Metrics>,
}

impl<P: EventPayload> EventBusBuilder<P> {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            subscriptions: HashMap::new(),
            table: Arc::new(OnceLock::new()),
            metrics,
        }
    }

    /// Bus that starts delivering once this builder is built
    pub fn handle(&self) -> EventBus<P> {
        EventBus {
            table: self.table.clone(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn subscribe(&mut self, name: P::Name, handler: Arc<dyn IntegrationEventHandler<P>>) {
        tracing::debug!(event = %name, handler = handler.name(), "Subscribed integration event handler");
        self.subscriptions.entry(name).or_default().push(handler);
    }

    pub fn build(self) -> EventBus<P> {
        let subscribed: usize = self.subscriptions.values().map(Vec::len).sum();
        if self.table.set(self.subscriptions).is_err() {
            tracing::warn!("Event bus subscriptions were already frozen");
        }
        tracing::info!(subscriptions = subscribed, "Event bus ready");
        EventBus {
            table: self.table,
            metrics: self.metrics,
        }
    }
}

pub struct EventBus<P: EventPayload> {
    table: Arc<OnceLock<Subscriptions<P>>>,
    metrics: Arc<Metrics>,
}

impl<P: EventPayload> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<P: EventPayload> EventBus<P> {
    /// Hand the event to every subscriber without waiting for them
    pub fn publish(&self, ctx: &DbContext, event: IntegrationEvent<P>) -> Result<(), AppError> {
        let table = self
            .table
            .get()
            .ok_or_else(|| AppError::operation_failed("event bus is not ready: subscriptions still open"))?;

        let name = event.name();
        let Some(handlers) = table.get(&name) else {
            tracing::debug!(event = %name, event_id = %event.id, "No subscribers for integration event");
            return Ok(());
        };

        tracing::debug!(event = %name, event_id = %event.id, subscribers = handlers.len(), "📤 Publishing integration event");

        for handler in handlers {
            let handler = handler.clone();
            let event = event.clone();
            let metrics = self.metrics.clone();
            let delivery_ctx = ctx.detached();

            tokio::spawn(async move {
                let label = name.to_string();
                let event_id = event.id;
                let handler_name = handler.name();
                let outcome = AssertUnwindSafe(handler.handle(delivery_ctx, event)).catch_unwind().await;

                match outcome {
                    Ok(Ok(())) => metrics.record_delivery(&label, "delivered"),
                    Ok(Err(e)) => {
                        metrics.record_delivery(&label, "failed");
                        tracing::error!(
                            event = %label,
                            %event_id,
                            handler = handler_name,
                            error = %e,
                            "Integration event handler failed"
                        );
                    }
                    Err(payload) => {
                        metrics.record_delivery(&label, "panicked");
                        tracing::error!(
                            event = %label,
                            %event_id,
                            handler = handler_name,
                            panic = %panic_message(payload.as_ref()),
                            "💥 Integration event handler panicked"
                        );
                    }
                }
            });
        }
        Ok(())
    }

    pub fn subscriber_count(&self, name: P::Name) -> usize {
        self.table
            .get()
            .and_then(|table| table.get(&name))
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::core::event::test_support::{PingEvent, PingName};
    use crate::errors::ErrorKind;
    use crate::backbone::store::testing::lazy_pool;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn ctx() -> DbContext {
        DbContext::root(lazy_pool())
    }

    enum Behaviour {
        Ok,
        Fail,
        Panic,
    }

    struct Recorder {
        label: &'static str,
        behaviour: Behaviour,
        tx: mpsc::UnboundedSender<(&'static str, PingEvent, DbContext)>,
    }

    #[async_trait]
    impl IntegrationEventHandler<PingEvent> for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn handle(&self, ctx: DbContext, event: IntegrationEvent<PingEvent>) -> Result<(), AppError> {
            self.tx.send((self.label, event.payload, ctx)).ok();
            match self.behaviour {
                Behaviour::Ok => Ok(()),
                Behaviour::Fail => Err(AppError::service_dependency("downstream unavailable")),
                Behaviour::Panic => panic!("recorder {} exploded", self.label),
            }
        }
    }

    fn recorder(
        label: &'static str,
        behaviour: Behaviour,
        tx: &mpsc::UnboundedSender<(&'static str, PingEvent, DbContext)>,
    ) -> Arc<Recorder> {
        Arc::new(Recorder {
            label,
            behaviour,
            tx: tx.clone(),
        })
    }

    fn builder() -> EventBusBuilder<PingEvent> {
        EventBusBuilder::new(Arc::new(Metrics::new().unwrap()))
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<(&'static str, PingEvent, DbContext)>, n: usize) -> Vec<&'static str> {
        let mut labels = Vec::new();
        for _ in 0..n {
            let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            labels.push(received.0);
        }
        labels.sort();
        labels
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber_despite_failures() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut builder = builder();
        builder.subscribe(PingName::Ping, recorder("failing", Behaviour::Fail, &tx));
        builder.subscribe(PingName::Ping, recorder("panicking", Behaviour::Panic, &tx));
        builder.subscribe(PingName::Ping, recorder("healthy", Behaviour::Ok, &tx));
        builder.subscribe(PingName::Pong, recorder("other", Behaviour::Ok, &tx));
        let bus = builder.build();

        bus.publish(&ctx(), IntegrationEvent::new(PingEvent::Ping(9))).unwrap();

        assert_eq!(collect(&mut rx, 3).await, vec!["failing", "healthy", "panicking"]);
        assert!(tokio::time::timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = builder().build();

        bus.publish(&ctx(), IntegrationEvent::new(PingEvent::Pong(1))).unwrap();
        assert_eq!(bus.subscriber_count(PingName::Pong), 0);
    }

    #[tokio::test]
    async fn test_handle_publishes_after_build() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut builder = builder();
        let early = builder.handle();

        let err = early.publish(&ctx(), IntegrationEvent::new(PingEvent::Ping(1))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);

        builder.subscribe(PingName::Ping, recorder("late", Behaviour::Ok, &tx));
        builder.build();

        early.publish(&ctx(), IntegrationEvent::new(PingEvent::Ping(2))).unwrap();
        assert_eq!(collect(&mut rx, 1).await, vec!["late"]);
        assert_eq!(early.subscriber_count(PingName::Ping), 1);
    }

    #[tokio::test]
    async fn test_delivery_runs_on_detached_context() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut builder = builder();
        builder.subscribe(PingName::Ping, recorder("detached", Behaviour::Ok, &tx));
        let bus = builder.build();

        let publisher_ctx = ctx().with_timeout(Duration::from_secs(30));
        bus.publish(&publisher_ctx, IntegrationEvent::new(PingEvent::Ping(3))).unwrap();

        let (label, payload, delivery_ctx) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(label, "detached");
        assert_eq!(payload, PingEvent::Ping(3));
        assert!(delivery_ctx.deadline().is_none());
        assert!(!delivery_ctx.in_transaction());
    }
}
