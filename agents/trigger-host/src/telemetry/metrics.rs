//! Prometheus metrics for the Trigger Host
//!
//! - `trigger_host_invocations_total` (counter) - invocations by trigger and outcome
//! - `trigger_host_handler_duration_seconds` (histogram) - wrapped handler duration
//! - `trigger_host_cold_starts_total` (counter) - first invocation of a telemetry handle
//! - `trigger_host_invocations_in_flight` (gauge)
//! - `trigger_host_telemetry_records_*` (counters) - queued, dropped, delivered, failed
//! - `trigger_host_telemetry_batches_sent_total` (counter)

use prometheus::{Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

use super::{Result, TelemetryError};

/// Invocation outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    HandlerError,
    ExtractionError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::HandlerError => "handler_error",
            Outcome::ExtractionError => "extraction_error",
        }
    }
}

/// Trigger host metrics
pub struct TriggerMetrics {
    invocations_total: CounterVec,
    handler_duration_seconds: HistogramVec,
    cold_starts_total: Counter,
    in_flight: Gauge,
    records_queued_total: Counter,
    records_dropped_total: Counter,
    records_delivered_total: Counter,
    records_failed_total: Counter,
    batches_sent_total: Counter,
}

impl TriggerMetrics {
    /// Create the metrics and register them with the provided registry
    pub fn new(registry: &Registry) -> Result<Self> {
        let invocations_total = CounterVec::new(
            Opts::new("invocations_total", "Total number of wrapped invocations")
                .namespace("trigger_host"),
            &["trigger", "outcome"],
        )?;

        let handler_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "handler_duration_seconds",
                "Duration of the wrapped trigger handler in seconds",
            )
            .namespace("trigger_host")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["trigger"],
        )?;

        let cold_starts_total = Counter::with_opts(
            Opts::new(
                "cold_starts_total",
                "Invocations that were the first one served by a telemetry handle",
            )
            .namespace("trigger_host"),
        )?;

        let in_flight = Gauge::with_opts(
            Opts::new("invocations_in_flight", "Wrapped invocations in progress")
                .namespace("trigger_host"),
        )?;

        let records_queued_total = Counter::with_opts(
            Opts::new("telemetry_records_queued_total", "Telemetry records queued")
                .namespace("trigger_host"),
        )?;

        let records_dropped_total = Counter::with_opts(
            Opts::new(
                "telemetry_records_dropped_total",
                "Telemetry records dropped because the queue was full or closed",
            )
            .namespace("trigger_host"),
        )?;

        let records_delivered_total = Counter::with_opts(
            Opts::new(
                "telemetry_records_delivered_total",
                "Telemetry records accepted by the sink",
            )
            .namespace("trigger_host"),
        )?;

        let records_failed_total = Counter::with_opts(
            Opts::new(
                "telemetry_records_failed_total",
                "Telemetry records in batches the sink rejected",
            )
            .namespace("trigger_host"),
        )?;

        let batches_sent_total = Counter::with_opts(
            Opts::new("telemetry_batches_sent_total", "Telemetry batches delivered")
                .namespace("trigger_host"),
        )?;

        registry.register(Box::new(invocations_total.clone()))?;
        registry.register(Box::new(handler_duration_seconds.clone()))?;
        registry.register(Box::new(cold_starts_total.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;
        registry.register(Box::new(records_queued_total.clone()))?;
        registry.register(Box::new(records_dropped_total.clone()))?;
        registry.register(Box::new(records_delivered_total.clone()))?;
        registry.register(Box::new(records_failed_total.clone()))?;
        registry.register(Box::new(batches_sent_total.clone()))?;

        Ok(Self {
            invocations_total,
            handler_duration_seconds,
            cold_starts_total,
            in_flight,
            records_queued_total,
            records_dropped_total,
            records_delivered_total,
            records_failed_total,
            batches_sent_total,
        })
    }

    pub fn record_invocation(&self, trigger: &str, outcome: Outcome) {
        self.invocations_total
            .with_label_values(&[trigger, outcome.as_str()])
            .inc();
    }

    pub fn observe_duration(&self, trigger: &str, duration_secs: f64) {
        self.handler_duration_seconds
            .with_label_values(&[trigger])
            .observe(duration_secs);
    }

    pub fn record_cold_start(&self) {
        self.cold_starts_total.inc();
    }

    pub fn inc_in_flight(&self) {
        self.in_flight.inc();
    }

    pub fn dec_in_flight(&self) {
        self.in_flight.dec();
    }

    pub fn record_queued(&self) {
        self.records_queued_total.inc();
    }

    pub fn record_dropped(&self) {
        self.records_dropped_total.inc();
    }

    pub fn record_batch_sent(&self, records: usize) {
        self.batches_sent_total.inc();
        self.records_delivered_total.inc_by(records as f64);
    }

    pub fn record_batch_failed(&self, records: usize) {
        self.records_failed_total.inc_by(records as f64);
    }

    pub fn invocations(&self, trigger: &str, outcome: Outcome) -> f64 {
        self.invocations_total
            .with_label_values(&[trigger, outcome.as_str()])
            .get()
    }

    pub fn dropped(&self) -> f64 {
        self.records_dropped_total.get()
    }

    pub fn delivered(&self) -> f64 {
        self.records_delivered_total.get()
    }

    pub fn failed(&self) -> f64 {
        self.records_failed_total.get()
    }

    pub fn in_flight(&self) -> f64 {
        self.in_flight.get()
    }

    pub fn cold_starts(&self) -> f64 {
        self.cold_starts_total.get()
    }
}

/// Registry holding the trigger host metrics
pub struct TriggerMetricsRegistry {
    registry: Arc<Registry>,
    metrics: Arc<TriggerMetrics>,
}

impl TriggerMetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(TriggerMetrics::new(&registry)?);

        Ok(Self { registry, metrics })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<TriggerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Encode metrics as text for scraping
    pub fn encode_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| TelemetryError::MetricsError(prometheus::Error::Msg(e.to_string())))
    }
}
