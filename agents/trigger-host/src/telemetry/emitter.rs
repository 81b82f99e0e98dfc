//! Telemetry client and background dispatcher
//!
//! `TelemetryClient` is a cheap, cloneable handle. Every wrapped invocation
//! receives one explicitly; nothing here is process-global. Records go
//! through a bounded channel to a single dispatcher task that batches them
//! for the sink.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trigger_host::telemetry::{MemorySink, TelemetryClient, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sink = MemorySink::new();
//!     let client = TelemetryClient::new(&TelemetryConfig::default(), Arc::new(sink.clone()));
//!     let n = client.next_iteration();
//!     println!("iteration {}", n);
//!     client.flush();
//! }
//! ```

use invocation_span::{DependencyRecord, TelemetryRecord, TraceRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use super::metrics::TriggerMetrics;
use super::sink::{LogSink, TelemetrySink};
use super::{Result, TelemetryConfig, TelemetryError};
use crate::client::IngestionClient;

enum Command {
    Record(TelemetryRecord),
    Flush(Option<oneshot::Sender<()>>),
}

struct Inner {
    sender: mpsc::Sender<Command>,
    enabled: bool,
    iterations: AtomicU64,
    sink_name: String,
    metrics: Option<Arc<TriggerMetrics>>,
}

/// Injected telemetry handle
#[derive(Clone)]
pub struct TelemetryClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("sink", &self.inner.sink_name)
            .field("enabled", &self.inner.enabled)
            .field("iterations", &self.iterations())
            .finish()
    }
}

impl TelemetryClient {
    /// Create a client delivering to `sink`.
    ///
    /// Spawns the dispatcher task, so it must be called inside a Tokio
    /// runtime. The task stops once every clone of the client is dropped.
    pub fn new(config: &TelemetryConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        Self::build(config, sink, None)
    }

    /// Create a client that also reports delivery metrics.
    pub fn with_metrics(
        config: &TelemetryConfig,
        sink: Arc<dyn TelemetrySink>,
        metrics: Arc<TriggerMetrics>,
    ) -> Self {
        Self::build(config, sink, Some(metrics))
    }

    /// Create a client whose sink follows the configuration: the ingestion
    /// endpoint when a connection string is set, the process log otherwise.
    pub fn from_config(
        config: &TelemetryConfig,
        metrics: Option<Arc<TriggerMetrics>>,
    ) -> Result<Self> {
        let sink: Arc<dyn TelemetrySink> = match config.connection()? {
            Some(connection) => Arc::new(IngestionClient::new(
                connection,
                config.cloud_role.clone(),
                config.timeout_ms,
            )),
            None => Arc::new(LogSink),
        };
        Ok(Self::build(config, sink, metrics))
    }

    fn build(
        config: &TelemetryConfig,
        sink: Arc<dyn TelemetrySink>,
        metrics: Option<Arc<TriggerMetrics>>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.max_queue_size.max(1));
        let sink_name = sink.name().to_string();

        tokio::spawn(dispatch(
            receiver,
            sink,
            config.batch_size.max(1),
            Duration::from_millis(config.flush_interval_ms.max(1)),
            metrics.clone(),
        ));

        tracing::debug!(
            sink = %sink_name,
            queue = config.max_queue_size,
            batch = config.batch_size,
            "Telemetry dispatcher started"
        );

        Self {
            inner: Arc::new(Inner {
                sender,
                enabled: config.enabled,
                iterations: AtomicU64::new(0),
                sink_name,
                metrics,
            }),
        }
    }

    /// Queue a record without waiting.
    ///
    /// Returns `false` when the record was dropped (disabled, queue full or
    /// dispatcher gone).
    pub fn track(&self, record: impl Into<TelemetryRecord>) -> bool {
        if !self.inner.enabled {
            return false;
        }

        match self.inner.sender.try_send(Command::Record(record.into())) {
            Ok(()) => {
                if let Some(m) = &self.inner.metrics {
                    m.record_queued();
                }
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(sink = %self.inner.sink_name, "Telemetry queue full, dropping record");
                if let Some(m) = &self.inner.metrics {
                    m.record_dropped();
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(sink = %self.inner.sink_name, "Telemetry dispatcher stopped, dropping record");
                if let Some(m) = &self.inner.metrics {
                    m.record_dropped();
                }
                false
            }
        }
    }

    pub fn track_trace(&self, record: TraceRecord) -> bool {
        self.track(record)
    }

    pub fn track_dependency(&self, record: DependencyRecord) -> bool {
        self.track(record)
    }

    /// Ask the dispatcher to deliver what it holds. Does not wait.
    pub fn flush(&self) {
        if let Err(e) = self.inner.sender.try_send(Command::Flush(None)) {
            // A full queue flushes on its own once the batch fills.
            tracing::debug!(error = %e, "Flush request not queued");
        }
    }

    /// Flush and wait until the sink has been called, bounded by `timeout`.
    pub async fn drain(&self, timeout: Duration) -> Result<()> {
        let (ack, done) = oneshot::channel();

        tokio::time::timeout(timeout, async {
            self.inner
                .sender
                .send(Command::Flush(Some(ack)))
                .await
                .map_err(|_| TelemetryError::DispatcherClosed)?;
            done.await.map_err(|_| TelemetryError::DispatcherClosed)
        })
        .await
        .map_err(|_| TelemetryError::Timeout(format!("drain exceeded {:?}", timeout)))?
    }

    /// Next cold-start iteration number of this handle, starting at 1.
    pub fn next_iteration(&self) -> u64 {
        let n = self.inner.iterations.fetch_add(1, Ordering::Relaxed) + 1;
        if n == 1 {
            if let Some(m) = &self.inner.metrics {
                m.record_cold_start();
            }
        }
        n
    }

    /// Invocations counted so far
    pub fn iterations(&self) -> u64 {
        self.inner.iterations.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn sink_name(&self) -> &str {
        &self.inner.sink_name
    }

    pub fn metrics(&self) -> Option<&Arc<TriggerMetrics>> {
        self.inner.metrics.as_ref()
    }
}

/// Dispatcher loop: batch records, deliver on batch-full, flush or tick.
async fn dispatch(
    mut receiver: mpsc::Receiver<Command>,
    sink: Arc<dyn TelemetrySink>,
    batch_size: usize,
    flush_interval: Duration,
    metrics: Option<Arc<TriggerMetrics>>,
) {
    let mut buffer: Vec<TelemetryRecord> = Vec::with_capacity(batch_size);
    // First tick one interval out, not immediately.
    let mut ticker =
        tokio::time::interval_at(tokio::time::Instant::now() + flush_interval, flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = receiver.recv() => match command {
                Some(Command::Record(record)) => {
                    buffer.push(record);
                    if buffer.len() >= batch_size {
                        deliver(sink.as_ref(), &mut buffer, metrics.as_deref()).await;
                    }
                }
                Some(Command::Flush(ack)) => {
                    deliver(sink.as_ref(), &mut buffer, metrics.as_deref()).await;
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                }
                None => {
                    deliver(sink.as_ref(), &mut buffer, metrics.as_deref()).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                deliver(sink.as_ref(), &mut buffer, metrics.as_deref()).await;
            }
        }
    }

    tracing::debug!(sink = %sink.name(), "Telemetry dispatcher stopped");
}

async fn deliver(
    sink: &dyn TelemetrySink,
    buffer: &mut Vec<TelemetryRecord>,
    metrics: Option<&TriggerMetrics>,
) {
    if buffer.is_empty() {
        return;
    }

    let batch = std::mem::take(buffer);
    let count = batch.len();

    match sink.send(batch).await {
        Ok(()) => {
            tracing::debug!(sink = %sink.name(), records = count, "Delivered telemetry batch");
            if let Some(m) = metrics {
                m.record_batch_sent(count);
            }
        }
        Err(e) => {
            tracing::warn!(sink = %sink.name(), records = count, error = %e, "Failed to deliver telemetry batch");
            if let Some(m) = metrics {
                m.record_batch_failed(count);
            }
        }
    }
}
