//! Telemetry record types emitted for an invocation.
//!
//! Defines `DependencyRecord`, `TraceRecord` and the `TelemetryRecord`
//! union that sinks receive. Records are write-only once built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl SeverityLevel {
    /// Numeric level used by the ingestion wire format.
    pub fn as_level(&self) -> u8 {
        match self {
            SeverityLevel::Verbose => 0,
            SeverityLevel::Information => 1,
            SeverityLevel::Warning => 2,
            SeverityLevel::Error => 3,
            SeverityLevel::Critical => 4,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityLevel::Verbose => write!(f, "verbose"),
            SeverityLevel::Information => write!(f, "information"),
            SeverityLevel::Warning => write!(f, "warning"),
            SeverityLevel::Error => write!(f, "error"),
            SeverityLevel::Critical => write!(f, "critical"),
        }
    }
}

/// A synthetic outbound-dependency record.
///
/// One is produced per wrapped invocation. `success` and `result_code`
/// describe the liveness of the invocation path, not the handler outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Correlation id derived from the event payload.
    pub id: String,
    pub name: String,
    pub dependency_type: String,
    pub target: String,
    /// Command/data field; carries the correlation id as well.
    pub data: String,
    pub result_code: u16,
    pub success: bool,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl DependencyRecord {
    /// Attach a custom property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A free-form trace message bound to an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub message: String,
    pub severity: SeverityLevel,
    pub operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl TraceRecord {
    pub fn new(
        message: impl Into<String>,
        severity: SeverityLevel,
        operation_id: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            severity,
            operation_id: operation_id.into(),
            parent_id: None,
            timestamp: Utc::now(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Anything a telemetry sink accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryRecord {
    Trace(TraceRecord),
    Dependency(DependencyRecord),
}

impl TelemetryRecord {
    pub fn operation_id(&self) -> &str {
        match self {
            TelemetryRecord::Trace(t) => &t.operation_id,
            TelemetryRecord::Dependency(d) => &d.operation_id,
        }
    }

    pub fn as_dependency(&self) -> Option<&DependencyRecord> {
        match self {
            TelemetryRecord::Dependency(d) => Some(d),
            TelemetryRecord::Trace(_) => None,
        }
    }

    pub fn as_trace(&self) -> Option<&TraceRecord> {
        match self {
            TelemetryRecord::Trace(t) => Some(t),
            TelemetryRecord::Dependency(_) => None,
        }
    }
}

impl From<TraceRecord> for TelemetryRecord {
    fn from(record: TraceRecord) -> Self {
        TelemetryRecord::Trace(record)
    }
}

impl From<DependencyRecord> for TelemetryRecord {
    fn from(record: DependencyRecord) -> Self {
        TelemetryRecord::Dependency(record)
    }
}
