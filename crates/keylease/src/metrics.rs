//! Prometheus metrics for lease operations
//!
//! Provides:
//! - Operation outcome counts (counter)
//! - Operation latency (histogram)
//! - Renewal tick outcomes (counter)
//!
//! Each `LockMetrics` owns its registry so several clients can coexist in one
//! process without registration conflicts.

use std::time::{Duration, Instant};

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

pub const OP_TRY_LOCK: &str = "try_lock";
pub const OP_UNLOCK: &str = "unlock";

pub const OUTCOME_ACQUIRED: &str = "acquired";
pub const OUTCOME_HELD: &str = "held";
pub const OUTCOME_RELEASED: &str = "released";
pub const OUTCOME_NOT_OWNER: &str = "not_owner";
pub const OUTCOME_ERROR: &str = "error";

pub const RENEWAL_OK: &str = "ok";
pub const RENEWAL_MISSING: &str = "missing";
pub const RENEWAL_ERROR: &str = "error";

/// Lease metrics collector
pub struct LockMetrics {
    registry: Registry,

    /// Operation outcomes by operation and outcome
    pub operations: CounterVec,

    /// Store round-trip latency by operation
    pub latency: HistogramVec,

    /// Renewal tick outcomes
    pub renewals: CounterVec,
}

impl LockMetrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let operations = CounterVec::new(
            Opts::new(
                "keylease_operations_total",
                "Total lease operations by outcome",
            ),
            &["operation", "outcome"],
        )?;

        let latency = HistogramVec::new(
            HistogramOpts::new(
                "keylease_operation_latency_seconds",
                "Lease operation latency in seconds",
            ),
            &["operation"],
        )?;

        let renewals = CounterVec::new(
            Opts::new("keylease_renewals_total", "Total lease renewal ticks"),
            &["outcome"],
        )?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(renewals.clone()))?;

        Ok(Self {
            registry,
            operations,
            latency,
            renewals,
        })
    }

    /// Record the outcome and latency of one operation
    pub fn record_operation(&self, operation: &str, outcome: &str, duration: Duration) {
        self.operations
            .with_label_values(&[operation, outcome])
            .inc();
        self.latency
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Record one renewal tick
    pub fn record_renewal(&self, outcome: &str) {
        self.renewals.with_label_values(&[outcome]).inc();
    }

    pub fn operation_count(&self, operation: &str, outcome: &str) -> u64 {
        self.operations
            .with_label_values(&[operation, outcome])
            .get() as u64
    }

    pub fn renewal_count(&self, outcome: &str) -> u64 {
        self.renewals.with_label_values(&[outcome]).get() as u64
    }

    /// Get metrics in Prometheus text format
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default()
    }
}

/// Measures one operation and records it on completion
pub struct Timer<'a> {
    metrics: Option<&'a LockMetrics>,
    operation: &'static str,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Start timing; a `None` collector makes the timer a no-op
    pub fn start(metrics: Option<&'a LockMetrics>, operation: &'static str) -> Self {
        Self {
            metrics,
            operation,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the given outcome
    pub fn finish(self, outcome: &str) {
        if let Some(metrics) = self.metrics {
            metrics.record_operation(self.operation, outcome, self.start.elapsed());
        }
    }
}
