//! Trigger Host
//!
//! Custom-handler host that runs serverless trigger bodies inside a
//! correlation wrapper and emits one synthetic dependency record per
//! invocation, for cold-start and tracing-overhead benchmarks.
//!
//! # Invocation path
//! platform → handler → wrapper (extract id, open scope, run body,
//! emit dependency, flush) → response
//!
//! # Design Principles
//! - One generic wrapper, parameterized by a per-trigger extraction rule
//! - Telemetry handle injected, never process-global
//! - Telemetry is non-blocking and best-effort

pub mod client;
pub mod error;
pub mod handler;
pub mod telemetry;
pub mod triggers;
pub mod wrapper;

// Re-export contracts
#[path = "../contracts/mod.rs"]
pub mod contracts;

pub use contracts::*;
pub use error::HostError;
pub use telemetry::{TelemetryClient, TelemetryConfig};
pub use triggers::{CorrelationExtractor, ExtractionError};
pub use wrapper::{CorrelationWrapper, WrapError};
