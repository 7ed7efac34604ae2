// Private module declaration
mod server;

use prometheus::{IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::configure_metrics_routes;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Mediator requests by request type and outcome
// - Unit-of-work transactions by outcome
// - Post-commit hook executions
// - Integration event deliveries
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    pub mediator_requests: IntCounterVec,
    pub transactions: IntCounterVec,
    pub post_commit_hooks: IntCounterVec,
    pub integration_events: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let mediator_requests = IntCounterVec::new(
            Opts::new("mediator_requests_total", "Total requests routed through the mediator"),
            &["request", "outcome"],
        )?;
        registry.register(Box::new(mediator_requests.clone()))?;

        let transactions = IntCounterVec::new(
            Opts::new("transactions_total", "Total outermost units of work by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(transactions.clone()))?;

        let post_commit_hooks = IntCounterVec::new(
            Opts::new("post_commit_hooks_total", "Total post-commit hook executions"),
            &["outcome"],
        )?;
        registry.register(Box::new(post_commit_hooks.clone()))?;

        let integration_events = IntCounterVec::new(
            Opts::new("integration_events_total", "Total integration event deliveries"),
            &["event", "outcome"],
        )?;
        registry.register(Box::new(integration_events.clone()))?;

        Ok(Self {
            registry,
            mediator_requests,
            transactions,
            post_commit_hooks,
            integration_events,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_request(&self, request: &str, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.mediator_requests.with_label_values(&[request, outcome]).inc();
    }

    /// Outcome is one of: committed, rolled_back, begin_failed, commit_failed
    pub fn record_transaction(&self, outcome: &str) {
        self.transactions.with_label_values(&[outcome]).inc();
    }

    /// Outcome is one of: ok, error, panic
    pub fn record_hook(&self, outcome: &str) {
        self.post_commit_hooks.with_label_values(&[outcome]).inc();
    }

    /// Outcome is one of: delivered, failed, panicked
    pub fn record_delivery(&self, event: &str, outcome: &str) {
        self.integration_events.with_label_values(&[event, outcome]).inc();
    }
}
