//! Prometheus metrics monitoring
//!
//! Provides metrics collection for:
//! - Dispatch latency (histogram)
//! - Successful and failed dispatches (counters)
//! - Overlay patches applied (counter)
//! - Listener notifications delivered (counter)
//!
//! Every collector is registered in a registry owned by the monitor, so
//! several stores can live in one process.

use std::time::{Duration, Instant};

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntCounter, Opts, Registry, TextEncoder};

/// Prometheus metrics collector for one settings store
pub struct StoreMetrics {
    registry: Registry,

    /// Dispatch latency histogram
    pub dispatch_latency: HistogramVec,

    /// Failed dispatch count counter
    pub failed_dispatch_count: CounterVec,

    /// Successful dispatch count counter
    pub success_dispatch_count: CounterVec,

    /// Overlay patches that changed an entry
    pub overlay_patch_count: IntCounter,

    /// Listener invocations, by key space
    pub notification_count: CounterVec,
}

impl StoreMetrics {
    /// Create a new metrics monitor with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let dispatch_latency = HistogramVec::new(
            HistogramOpts::new(
                "strata_dispatch_latency_seconds",
                "Settings dispatch latency in seconds",
            ),
            &["operation", "status"],
        )?;
        registry.register(Box::new(dispatch_latency.clone()))?;

        let failed_dispatch_count = CounterVec::new(
            Opts::new(
                "strata_failed_dispatches_total",
                "Total number of failed settings dispatches",
            ),
            &["operation", "error_type"],
        )?;
        registry.register(Box::new(failed_dispatch_count.clone()))?;

        let success_dispatch_count = CounterVec::new(
            Opts::new(
                "strata_success_dispatches_total",
                "Total number of successful settings dispatches",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(success_dispatch_count.clone()))?;

        let overlay_patch_count = IntCounter::new(
            "strata_overlay_patches_total",
            "Total number of overlay patches that changed an entry",
        )?;
        registry.register(Box::new(overlay_patch_count.clone()))?;

        let notification_count = CounterVec::new(
            Opts::new(
                "strata_notifications_total",
                "Total number of listener notifications delivered",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(notification_count.clone()))?;

        Ok(Self {
            registry,
            dispatch_latency,
            failed_dispatch_count,
            success_dispatch_count,
            overlay_patch_count,
            notification_count,
        })
    }

    /// Record dispatch latency
    pub fn record_latency(&self, operation: &str, status: &str, duration: Duration) {
        self.dispatch_latency
            .with_label_values(&[operation, status])
            .observe(duration.as_secs_f64());
    }

    /// Increment failed dispatch count
    pub fn increment_failed_dispatch(&self, operation: &str, error_type: &str) {
        self.failed_dispatch_count
            .with_label_values(&[operation, error_type])
            .inc();
    }

    /// Increment successful dispatch count
    pub fn increment_success_dispatch(&self, operation: &str) {
        self.success_dispatch_count
            .with_label_values(&[operation])
            .inc();
    }

    pub fn increment_patches(&self, count: u64) {
        self.overlay_patch_count.inc_by(count);
    }

    pub fn increment_notifications(&self, kind: &str, count: u64) {
        if count > 0 {
            self.notification_count
                .with_label_values(&[kind])
                .inc_by(count as f64);
        }
    }

    /// Get metrics in Prometheus format
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).unwrap_or_default()
    }
}

/// Simple metrics timer for measuring dispatch duration
pub struct Timer<'a> {
    metrics: &'a StoreMetrics,
    operation: String,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Create a new timer
    pub fn start(metrics: &'a StoreMetrics, operation: &str) -> Self {
        Self {
            metrics,
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    /// Stop the timer and record success
    pub fn success(self) {
        let duration = self.start.elapsed();
        self.metrics
            .record_latency(&self.operation, "success", duration);
        self.metrics.increment_success_dispatch(&self.operation);
    }

    /// Stop the timer and record failure
    pub fn failure(self, error_type: &str) {
        let duration = self.start.elapsed();
        self.metrics
            .record_latency(&self.operation, "error", duration);
        self.metrics
            .increment_failed_dispatch(&self.operation, error_type);
    }
}
