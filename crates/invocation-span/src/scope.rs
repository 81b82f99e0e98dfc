//! Correlation scope for a single invocation.
//!
//! A scope is opened once the correlation id of an event is known, lives
//! for exactly one invocation, and is consumed when its dependency record
//! is produced.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::Span;
use uuid::Uuid;

use crate::context::InvocationContext;
use crate::record::{DependencyRecord, SeverityLevel, TraceRecord};

/// Result code stamped on every synthetic dependency.
pub const SYNTHETIC_RESULT_CODE: u16 = 200;

/// Static description of the synthetic dependency a wrapper emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTemplate {
    pub name: String,
    pub dependency_type: String,
    pub target: String,
}

impl DependencyTemplate {
    pub fn new(
        name: impl Into<String>,
        dependency_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dependency_type: dependency_type.into(),
            target: target.into(),
        }
    }
}

/// Identifiers handed to the user handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub correlation_id: String,
    pub operation_id: String,
    pub invocation_id: Uuid,
    pub function_name: String,
}

/// Ephemeral correlation scope tied to one invocation.
///
/// Not `Clone`: [`CorrelationScope::finish_dependency`] consumes it so
/// only one dependency record can come out of a scope.
#[derive(Debug)]
pub struct CorrelationScope {
    correlation: Correlation,
    parent_id: Option<String>,
    started_at: DateTime<Utc>,
    started: Instant,
    span: Span,
}

impl CorrelationScope {
    /// Open a scope against the invocation context.
    pub fn open(ctx: &InvocationContext, correlation_id: impl Into<String>) -> Self {
        let correlation = Correlation {
            correlation_id: correlation_id.into(),
            operation_id: ctx.operation_id(),
            invocation_id: ctx.invocation_id,
            function_name: ctx.function_name.clone(),
        };

        let span = tracing::info_span!(
            "invocation",
            function = %correlation.function_name,
            invocation_id = %correlation.invocation_id,
            operation_id = %correlation.operation_id,
            correlation_id = %correlation.correlation_id,
        );

        Self {
            correlation,
            parent_id: ctx.parent_id(),
            started_at: Utc::now(),
            started: Instant::now(),
            span,
        }
    }

    pub fn correlation(&self) -> Correlation {
        self.correlation.clone()
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation.correlation_id
    }

    pub fn operation_id(&self) -> &str {
        &self.correlation.operation_id
    }

    /// Tracing span entered while the handler runs.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Build a trace record bound to this scope's operation.
    pub fn trace(&self, message: impl Into<String>, severity: SeverityLevel) -> TraceRecord {
        let mut record = TraceRecord::new(message, severity, self.correlation.operation_id.clone());
        record.parent_id = self.parent_id.clone();
        record
            .properties
            .insert("invocation_id".to_string(), self.correlation.invocation_id.to_string());
        record
    }

    /// Close the scope and produce its dependency record.
    ///
    /// The record always reports `success = true` and result code 200.
    pub fn finish_dependency(self, template: &DependencyTemplate) -> DependencyRecord {
        let duration_ms = self.started.elapsed().as_millis() as u64;

        let mut properties = HashMap::new();
        properties.insert(
            "invocation_id".to_string(),
            self.correlation.invocation_id.to_string(),
        );
        properties.insert(
            "function_name".to_string(),
            self.correlation.function_name.clone(),
        );

        DependencyRecord {
            id: self.correlation.correlation_id.clone(),
            name: template.name.clone(),
            dependency_type: template.dependency_type.clone(),
            target: template.target.clone(),
            data: self.correlation.correlation_id,
            result_code: SYNTHETIC_RESULT_CODE,
            success: true,
            duration_ms,
            started_at: self.started_at,
            operation_id: self.correlation.operation_id,
            parent_id: self.parent_id,
            properties,
        }
    }
}
