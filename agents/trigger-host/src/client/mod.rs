//! Ingestion client
//!
//! Posts telemetry batches to the Application Insights track endpoint as
//! an array of envelopes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invocation_span::{DependencyRecord, TelemetryRecord, TraceRecord};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::telemetry::{ConnectionString, TelemetryError, TelemetrySink};

/// Ingestion endpoint client
pub struct IngestionClient {
    connection: ConnectionString,
    cloud_role: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl IngestionClient {
    /// Create new client
    pub fn new(connection: ConnectionString, cloud_role: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            connection,
            cloud_role: cloud_role.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Post one batch of records
    pub async fn track(&self, batch: &[TelemetryRecord]) -> Result<TrackResponse, ClientError> {
        let envelopes: Vec<Value> = batch
            .iter()
            .map(|record| self.envelope(record))
            .collect();

        let body = serde_json::to_vec(&envelopes).map_err(|e| ClientError::Serialize(e.to_string()))?;

        let response = self
            .client
            .post(self.connection.track_url())
            .header("Content-Type", "application/json")
            .body(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let accepted: TrackResponse = response.json().await.unwrap_or(TrackResponse {
                items_received: envelopes.len(),
                items_accepted: envelopes.len(),
                errors: Vec::new(),
            });

            if accepted.items_accepted < accepted.items_received {
                tracing::warn!(
                    received = accepted.items_received,
                    accepted = accepted.items_accepted,
                    "Ingestion endpoint accepted a partial batch"
                );
            }
            Ok(accepted)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(ClientError::Server {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }

    /// Build the wire envelope of one record
    pub fn envelope(&self, record: &TelemetryRecord) -> Value {
        match record {
            TelemetryRecord::Dependency(d) => self.dependency_envelope(d),
            TelemetryRecord::Trace(t) => self.trace_envelope(t),
        }
    }

    fn dependency_envelope(&self, d: &DependencyRecord) -> Value {
        json!({
            "name": self.envelope_name("RemoteDependency"),
            "time": format_time(d.started_at),
            "iKey": self.connection.instrumentation_key,
            "tags": self.tags(&d.operation_id, d.parent_id.as_deref()),
            "data": {
                "baseType": "RemoteDependencyData",
                "baseData": {
                    "ver": 2,
                    "name": d.name,
                    "id": d.id,
                    "resultCode": d.result_code.to_string(),
                    "duration": format_duration(d.duration_ms),
                    "success": d.success,
                    "data": d.data,
                    "target": d.target,
                    "type": d.dependency_type,
                    "properties": d.properties,
                }
            }
        })
    }

    fn trace_envelope(&self, t: &TraceRecord) -> Value {
        json!({
            "name": self.envelope_name("Message"),
            "time": format_time(t.timestamp),
            "iKey": self.connection.instrumentation_key,
            "tags": self.tags(&t.operation_id, t.parent_id.as_deref()),
            "data": {
                "baseType": "MessageData",
                "baseData": {
                    "ver": 2,
                    "message": t.message,
                    "severityLevel": t.severity.as_level(),
                    "properties": t.properties,
                }
            }
        })
    }

    fn envelope_name(&self, kind: &str) -> String {
        format!(
            "Microsoft.ApplicationInsights.{}.{}",
            self.connection.instrumentation_key.replace('-', ""),
            kind
        )
    }

    fn tags(&self, operation_id: &str, parent_id: Option<&str>) -> Value {
        let mut tags = Map::new();
        tags.insert("ai.operation.id".to_string(), json!(operation_id));
        tags.insert("ai.cloud.role".to_string(), json!(self.cloud_role));
        if let Some(parent) = parent_id {
            tags.insert("ai.operation.parentId".to_string(), json!(parent));
        }
        Value::Object(tags)
    }
}

#[async_trait]
impl TelemetrySink for IngestionClient {
    async fn send(&self, batch: Vec<TelemetryRecord>) -> crate::telemetry::Result<()> {
        self.track(&batch)
            .await
            .map(|_| ())
            .map_err(TelemetryError::from)
    }

    fn name(&self) -> &str {
        "ingestion"
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339()
}

/// Duration in the `[d.]hh:mm:ss.fff` form the endpoint expects.
pub fn format_duration(duration_ms: u64) -> String {
    let millis = duration_ms % 1000;
    let total_secs = duration_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = (total_secs / 3600) % 24;
    let days = total_secs / 86_400;

    if days > 0 {
        format!("{}.{:02}:{:02}:{:02}.{:03}", days, hours, mins, secs, millis)
    } else {
        format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
    }
}

/// Track endpoint response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    #[serde(default)]
    pub items_received: usize,
    #[serde(default)]
    pub items_accepted: usize,
    #[serde(default)]
    pub errors: Vec<Value>,
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use invocation_span::{CorrelationScope, DependencyTemplate, InvocationContext, SeverityLevel};

    fn client() -> IngestionClient {
        IngestionClient::new(
            ConnectionString::parse("InstrumentationKey=1111-2222;IngestionEndpoint=http://localhost:1")
                .unwrap(),
            "bench-app",
            500,
        )
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00.000");
        assert_eq!(format_duration(1_234), "00:00:01.234");
        assert_eq!(format_duration(3_723_004), "01:02:03.004");
        assert_eq!(format_duration(90_061_001), "1.01:01:01.001");
    }

    #[test]
    fn test_dependency_envelope() {
        let ctx = InvocationContext::new("HttpTrigger");
        let scope = CorrelationScope::open(&ctx, "abc123");
        let record = scope.finish_dependency(&DependencyTemplate::new("bench", "HTTP", "host"));
        let envelope = client().envelope(&record.into());

        assert_eq!(
            envelope["name"],
            "Microsoft.ApplicationInsights.11112222.RemoteDependency"
        );
        assert_eq!(envelope["iKey"], "1111-2222");
        assert_eq!(envelope["tags"]["ai.cloud.role"], "bench-app");
        assert_eq!(envelope["tags"]["ai.operation.id"], ctx.operation_id());
        assert!(envelope["tags"].get("ai.operation.parentId").is_none());

        let base = &envelope["data"]["baseData"];
        assert_eq!(envelope["data"]["baseType"], "RemoteDependencyData");
        assert_eq!(base["id"], "abc123");
        assert_eq!(base["data"], "abc123");
        assert_eq!(base["resultCode"], "200");
        assert_eq!(base["success"], true);
        assert_eq!(base["type"], "HTTP");
    }

    #[test]
    fn test_trace_envelope() {
        let trace = TraceRecord::new("iteration 3", SeverityLevel::Warning, "op-9");
        let envelope = client().envelope(&trace.into());

        assert_eq!(envelope["data"]["baseType"], "MessageData");
        assert_eq!(envelope["data"]["baseData"]["message"], "iteration 3");
        assert_eq!(envelope["data"]["baseData"]["severityLevel"], 2);
        assert_eq!(envelope["tags"]["ai.operation.id"], "op-9");
    }
}
