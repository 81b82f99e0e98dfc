//! Invocation context handed over by the hosting platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Reasons a `traceparent` value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceContextError {
    #[error("traceparent must have 4 dash-separated fields, found {0}")]
    FieldCount(usize),

    #[error("traceparent field `{field}` must be {expected} hex characters")]
    InvalidField { field: &'static str, expected: usize },

    #[error("traceparent version `ff` is forbidden")]
    ForbiddenVersion,

    #[error("traceparent field `{0}` must not be all zeros")]
    ZeroId(&'static str),
}

/// W3C trace context carried by the `traceparent` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    pub version: String,
    /// 32 lowercase hex characters.
    pub trace_id: String,
    /// 16 lowercase hex characters; the caller's span.
    pub parent_id: String,
    pub flags: String,
}

impl TraceContext {
    /// Parse a `traceparent` header value.
    pub fn parse(value: &str) -> Result<Self, TraceContextError> {
        let fields: Vec<&str> = value.trim().split('-').collect();
        if fields.len() != 4 {
            return Err(TraceContextError::FieldCount(fields.len()));
        }

        let version = checked_hex(fields[0], "version", 2)?;
        if version == "ff" {
            return Err(TraceContextError::ForbiddenVersion);
        }
        let trace_id = checked_hex(fields[1], "trace-id", 32)?;
        let parent_id = checked_hex(fields[2], "parent-id", 16)?;
        let flags = checked_hex(fields[3], "trace-flags", 2)?;

        if trace_id.bytes().all(|b| b == b'0') {
            return Err(TraceContextError::ZeroId("trace-id"));
        }
        if parent_id.bytes().all(|b| b == b'0') {
            return Err(TraceContextError::ZeroId("parent-id"));
        }

        Ok(Self {
            version,
            trace_id,
            parent_id,
            flags,
        })
    }

    /// Render back to header form.
    pub fn to_header(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.version, self.trace_id, self.parent_id, self.flags
        )
    }

    /// Whether the caller sampled this trace.
    pub fn is_sampled(&self) -> bool {
        u8::from_str_radix(&self.flags, 16)
            .map(|f| f & 0x01 == 0x01)
            .unwrap_or(false)
    }
}

impl FromStr for TraceContext {
    type Err = TraceContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header())
    }
}

fn checked_hex(
    field: &str,
    name: &'static str,
    expected: usize,
) -> Result<String, TraceContextError> {
    if field.len() != expected || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TraceContextError::InvalidField {
            field: name,
            expected,
        });
    }
    Ok(field.to_ascii_lowercase())
}

/// Platform-supplied identity of one function execution.
///
/// Owned by the host; the correlation wrapper only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Platform invocation id.
    pub invocation_id: Uuid,
    /// Name of the function being invoked.
    pub function_name: String,
    /// Upstream trace context, when the caller propagated one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_context: Option<TraceContext>,
    pub received_at: DateTime<Utc>,
}

impl InvocationContext {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            function_name: function_name.into(),
            trace_context: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_invocation_id(mut self, invocation_id: Uuid) -> Self {
        self.invocation_id = invocation_id;
        self
    }

    pub fn with_trace_context(mut self, trace_context: TraceContext) -> Self {
        self.trace_context = Some(trace_context);
        self
    }

    /// Operation id used to group all telemetry of this invocation.
    ///
    /// Continues the upstream trace when there is one.
    pub fn operation_id(&self) -> String {
        match &self.trace_context {
            Some(tc) => tc.trace_id.clone(),
            None => self.invocation_id.simple().to_string(),
        }
    }

    /// Parent id for records emitted inside this invocation.
    pub fn parent_id(&self) -> Option<String> {
        self.trace_context.as_ref().map(|tc| tc.parent_id.clone())
    }
}
