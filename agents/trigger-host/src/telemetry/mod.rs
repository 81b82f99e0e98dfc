//! Telemetry module for the Trigger Host
//!
//! This module provides:
//! - `TelemetryClient` - injected handle used by every wrapped invocation
//! - a background dispatcher that batches records and hands them to a sink
//! - `TelemetrySink` implementations (ingestion endpoint, memory, log)
//! - Prometheus metrics for invocations and telemetry delivery
//!
//! # Delivery contract
//!
//! Emission never blocks an invocation and never fails it. Records are
//! queued into a bounded channel; when the queue is full the record is
//! dropped, logged and counted. `flush` only requests a flush;
//! `drain` is the one call that waits for delivery and is meant for
//! shutdown and tests.

pub mod connection;
pub mod emitter;
pub mod metrics;
pub mod sink;

pub use connection::ConnectionString;
pub use emitter::TelemetryClient;
pub use metrics::{Outcome, TriggerMetrics, TriggerMetricsRegistry};
pub use sink::{LogSink, MemorySink, TelemetrySink};

use thiserror::Error;

use crate::client::ClientError;

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to queue telemetry: {0}")]
    EmissionFailed(String),

    #[error("Telemetry dispatcher has stopped")]
    DispatcherClosed,

    #[error("Failed to serialize telemetry: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Ingestion error: {0}")]
    Ingestion(#[from] ClientError),

    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout error: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Enable record emission
    pub enabled: bool,

    /// Ingestion connection string; records are logged locally when absent
    pub connection_string: Option<String>,

    /// Cloud role name stamped on every envelope
    pub cloud_role: String,

    /// Maximum queue size for async emission
    pub max_queue_size: usize,

    /// Records per batch handed to the sink
    pub batch_size: usize,

    /// Periodic flush interval in milliseconds
    pub flush_interval_ms: u64,

    /// Ingestion request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connection_string: None,
            cloud_role: "trigger-host".to_string(),
            max_queue_size: 1000,
            batch_size: 100,
            flush_interval_ms: 1000,
            timeout_ms: 5000,
        }
    }
}

impl TelemetryConfig {
    /// Create a new config builder
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("TELEMETRY_ENABLED")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
            connection_string: std::env::var("APPLICATIONINSIGHTS_CONNECTION_STRING")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            cloud_role: std::env::var("WEBSITE_SITE_NAME")
                .unwrap_or_else(|_| "trigger-host".to_string()),
            max_queue_size: std::env::var("TELEMETRY_MAX_QUEUE_SIZE")
                .map(|v| v.parse().unwrap_or(1000))
                .unwrap_or(1000),
            batch_size: std::env::var("TELEMETRY_BATCH_SIZE")
                .map(|v| v.parse().unwrap_or(100))
                .unwrap_or(100),
            flush_interval_ms: std::env::var("TELEMETRY_FLUSH_INTERVAL_MS")
                .map(|v| v.parse().unwrap_or(1000))
                .unwrap_or(1000),
            timeout_ms: std::env::var("TELEMETRY_TIMEOUT_MS")
                .map(|v| v.parse().unwrap_or(5000))
                .unwrap_or(5000),
        }
    }

    /// Parsed connection string, if one is configured
    pub fn connection(&self) -> Result<Option<ConnectionString>> {
        self.connection_string
            .as_deref()
            .map(ConnectionString::parse)
            .transpose()
    }
}

/// Builder for TelemetryConfig
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: TelemetryConfig::default(),
        }
    }

    /// Enable or disable emission
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set the ingestion connection string
    pub fn connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.config.connection_string = Some(connection_string.into());
        self
    }

    /// Set the cloud role name
    pub fn cloud_role(mut self, role: impl Into<String>) -> Self {
        self.config.cloud_role = role.into();
        self
    }

    /// Set the maximum queue size
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.config.max_queue_size = size;
        self
    }

    /// Set batching parameters
    pub fn with_batching(mut self, batch_size: usize, flush_interval_ms: u64) -> Self {
        self.config.batch_size = batch_size;
        self.config.flush_interval_ms = flush_interval_ms;
        self
    }

    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.config.timeout_ms = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> TelemetryConfig {
        self.config
    }
}

impl Default for TelemetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
