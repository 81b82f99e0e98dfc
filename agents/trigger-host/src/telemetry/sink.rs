//! Telemetry sinks
//!
//! A sink receives batches from the dispatcher. Sinks never see individual
//! invocations and have no response contract beyond success or failure.

use async_trait::async_trait;
use invocation_span::{DependencyRecord, TelemetryRecord, TraceRecord};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::Result;

/// Destination for batches of telemetry records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Deliver one batch.
    async fn send(&self, batch: Vec<TelemetryRecord>) -> Result<()>;

    /// Sink name for logs
    fn name(&self) -> &str;
}

/// In-memory sink, used by tests and the `invoke` command.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All delivered records in delivery order
    pub async fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().await.clone()
    }

    pub async fn dependencies(&self) -> Vec<DependencyRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter_map(|r| r.as_dependency().cloned())
            .collect()
    }

    pub async fn traces(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter_map(|r| r.as_trace().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    async fn send(&self, batch: Vec<TelemetryRecord>) -> Result<()> {
        self.records.lock().await.extend(batch);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Writes records to the process log. Used when no ingestion endpoint is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl TelemetrySink for LogSink {
    async fn send(&self, batch: Vec<TelemetryRecord>) -> Result<()> {
        for record in &batch {
            match record {
                TelemetryRecord::Dependency(d) => info!(
                    target: "telemetry",
                    operation_id = %d.operation_id,
                    dependency_id = %d.id,
                    dependency_type = %d.dependency_type,
                    result_code = d.result_code,
                    success = d.success,
                    duration_ms = d.duration_ms,
                    "{}",
                    d.name
                ),
                TelemetryRecord::Trace(t) => info!(
                    target: "telemetry",
                    operation_id = %t.operation_id,
                    severity = %t.severity,
                    "{}",
                    t.message
                ),
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
