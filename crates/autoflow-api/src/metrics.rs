//! Metrics collection for the intake service.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Service metrics for observability.
///
/// Counters live on a dedicated registry rather than the process-global
/// default so multiple instances can coexist in tests.
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // Webhook intake metrics
    pub webhooks_received_total: IntCounter,
    pub webhooks_rejected_total: IntCounterVec,
    pub status_callbacks_total: IntCounter,

    // Dispatch metrics
    pub deployments_dispatched_total: IntCounter,
    pub trigger_failures_total: IntCounter,

    // HTTP metrics
    pub http_request_duration: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let webhooks_received_total = IntCounter::new(
            "autoflow_webhooks_received_total",
            "Total push webhooks received",
        )?;
        registry.register(Box::new(webhooks_received_total.clone()))?;

        let webhooks_rejected_total = IntCounterVec::new(
            Opts::new(
                "autoflow_webhooks_rejected_total",
                "Push webhooks rejected before dispatch, by error category",
            ),
            &["category"],
        )?;
        registry.register(Box::new(webhooks_rejected_total.clone()))?;

        let status_callbacks_total = IntCounter::new(
            "autoflow_status_callbacks_total",
            "Deployment status callbacks received",
        )?;
        registry.register(Box::new(status_callbacks_total.clone()))?;

        let deployments_dispatched_total = IntCounter::new(
            "autoflow_deployments_dispatched_total",
            "Deployments created and dispatched",
        )?;
        registry.register(Box::new(deployments_dispatched_total.clone()))?;

        let trigger_failures_total = IntCounter::new(
            "autoflow_trigger_failures_total",
            "Outbound deploy-trigger calls that failed or timed out",
        )?;
        registry.register(Box::new(trigger_failures_total.clone()))?;

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "autoflow_http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 10.0]),
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Arc::new(Self {
            registry,
            webhooks_received_total,
            webhooks_rejected_total,
            status_callbacks_total,
            deployments_dispatched_total,
            trigger_failures_total,
            http_request_duration,
        }))
    }

    /// Render the registry in Prometheus text exposition format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        encoder.encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
