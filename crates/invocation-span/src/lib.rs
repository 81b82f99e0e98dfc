//! Invocation span types for serverless trigger instrumentation.
//!
//! This crate provides the shared types used by the trigger host to tie a
//! single function invocation to the telemetry it produces.
//!
//! # Lifecycle
//!
//! ```text
//! Platform invocation
//!   └─ InvocationContext (headers: invocation id, traceparent)
//!       └─ CorrelationScope (one per invocation, discarded after emission)
//!           ├─ TraceRecord      ("iteration N")
//!           └─ DependencyRecord (exactly one, synthetic)
//! ```
//!
//! # Usage
//!
//! 1. Use `InvocationContextExtractor` in Axum handlers to read the invocation context from headers.
//! 2. Open a `CorrelationScope` once the correlation id of the event is known.
//! 3. Finish the scope into a `DependencyRecord` and hand it to a telemetry sink.
//! 4. Answer the platform with an `InvokeResponse`.

pub mod context;
pub mod extract;
pub mod protocol;
pub mod record;
pub mod scope;

pub use context::{InvocationContext, TraceContext, TraceContextError};
pub use extract::InvocationContextExtractor;
pub use protocol::{InvokeRequest, InvokeResponse};
pub use record::{DependencyRecord, SeverityLevel, TelemetryRecord, TraceRecord};
pub use scope::{Correlation, CorrelationScope, DependencyTemplate};
