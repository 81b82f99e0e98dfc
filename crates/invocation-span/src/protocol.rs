//! Custom-handler wire protocol between the functions host and this process.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Invocation request posted by the functions host.
///
/// `Data` holds one entry per input binding, `Metadata` holds trigger
/// metadata (for example blob properties or system properties).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvokeRequest {
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl InvokeRequest {
    /// Value of an input binding, if present.
    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Value of a trigger metadata entry, if present.
    pub fn metadata_entry(&self, name: &str) -> Option<&Value> {
        self.metadata.get(name)
    }
}

/// Invocation response returned to the functions host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvokeResponse {
    #[serde(default)]
    pub outputs: Map<String, Value>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
}

impl InvokeResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an output binding value.
    pub fn with_output(mut self, name: impl Into<String>, value: Value) -> Self {
        self.outputs.insert(name.into(), value);
        self
    }

    /// Append a log line surfaced by the host.
    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }
}
