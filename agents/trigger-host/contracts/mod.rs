//! Trigger Host Contracts
//!
//! Trigger kinds and the function bindings the host serves.

mod functions;

pub use functions::*;

use invocation_span::InvokeRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of platform event that invokes a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Http,
    Queue,
    EventHub,
    EventGrid,
    ServiceBus,
    Blob,
    Cosmos,
    Database,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 8] = [
        TriggerKind::Http,
        TriggerKind::Queue,
        TriggerKind::EventHub,
        TriggerKind::EventGrid,
        TriggerKind::ServiceBus,
        TriggerKind::Blob,
        TriggerKind::Cosmos,
        TriggerKind::Database,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Http => "http",
            TriggerKind::Queue => "queue",
            TriggerKind::EventHub => "event_hub",
            TriggerKind::EventGrid => "event_grid",
            TriggerKind::ServiceBus => "service_bus",
            TriggerKind::Blob => "blob",
            TriggerKind::Cosmos => "cosmos",
            TriggerKind::Database => "database",
        }
    }

    /// Input binding name the trigger data arrives under.
    pub fn default_binding(&self) -> &'static str {
        match self {
            TriggerKind::Http => "req",
            TriggerKind::Queue => "message",
            TriggerKind::EventHub => "events",
            TriggerKind::EventGrid => "event",
            TriggerKind::ServiceBus => "message",
            TriggerKind::Blob => "blob",
            TriggerKind::Cosmos => "documents",
            TriggerKind::Database => "changes",
        }
    }

    /// Dependency type tag stamped on the synthetic dependency record.
    pub fn dependency_type(&self) -> &'static str {
        match self {
            TriggerKind::Http => "HTTP",
            TriggerKind::Queue => "Azure queue",
            TriggerKind::EventHub => "Azure Event Hubs",
            TriggerKind::EventGrid => "Azure Event Grid",
            TriggerKind::ServiceBus => "Azure Service Bus",
            TriggerKind::Blob => "Azure blob",
            TriggerKind::Cosmos => "Azure DocumentDB",
            TriggerKind::Database => "SQL",
        }
    }

    /// Shape the value the extraction rule of this trigger reads.
    ///
    /// Blob triggers carry their correlation id in blob metadata, which the
    /// host delivers in the metadata section rather than the data section.
    pub fn event_payload(&self, request: &InvokeRequest, binding: &str) -> Value {
        match self {
            TriggerKind::Blob => {
                let name = request
                    .metadata_entry("name")
                    .or_else(|| request.metadata_entry("Name"))
                    .cloned()
                    .unwrap_or(Value::Null);
                let metadata = request
                    .metadata_entry("Metadata")
                    .or_else(|| request.metadata_entry("metadata"))
                    .cloned()
                    .unwrap_or(Value::Null);
                let content = request.binding(binding).cloned().unwrap_or(Value::Null);
                json!({
                    "name": name,
                    "metadata": metadata,
                    "content": content,
                })
            }
            _ => request.binding(binding).cloned().unwrap_or(Value::Null),
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "http" => Ok(TriggerKind::Http),
            "queue" | "storagequeue" => Ok(TriggerKind::Queue),
            "eventhub" => Ok(TriggerKind::EventHub),
            "eventgrid" => Ok(TriggerKind::EventGrid),
            "servicebus" => Ok(TriggerKind::ServiceBus),
            "blob" | "storage" => Ok(TriggerKind::Blob),
            "cosmos" | "cosmosdb" => Ok(TriggerKind::Cosmos),
            "database" | "sql" => Ok(TriggerKind::Database),
            _ => Err(format!("unknown trigger kind: {}", s)),
        }
    }
}
