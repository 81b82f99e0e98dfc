//! Correlation id extraction rules
//!
//! Each trigger carries its correlation token in a different place of its
//! event payload. Payloads are untyped JSON and are never assumed to be
//! well-formed: every lookup returns an `ExtractionError` instead of
//! panicking.

pub mod events;
pub mod http;
pub mod messaging;
pub mod storage;

pub use events::EventGridExtractor;
pub use http::HttpExtractor;
pub use messaging::{EventHubExtractor, QueueExtractor, ServiceBusExtractor};
pub use storage::{parse_request_id, BlobExtractor, CosmosExtractor, DatabaseExtractor};

use serde_json::Value;
use thiserror::Error;

use crate::contracts::TriggerKind;

/// Field most payloads use for the correlation token.
pub const OPERATION_ID_FIELD: &str = "operationId";

/// Failure to derive a correlation id from an event payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("{trigger} payload has no `{field}`")]
    MissingField {
        trigger: TriggerKind,
        field: &'static str,
    },

    #[error("{trigger} payload field `{field}` is not a string")]
    NotAString {
        trigger: TriggerKind,
        field: &'static str,
    },

    #[error("{trigger} payload field `{field}` is empty")]
    EmptyValue {
        trigger: TriggerKind,
        field: &'static str,
    },

    #[error("{trigger} batch is empty or not an array")]
    EmptyBatch { trigger: TriggerKind },
}

/// Strategy that derives the correlation id of one event payload.
pub trait CorrelationExtractor: Send + Sync {
    /// Derive the correlation id.
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError>;

    /// Rule name, used in logs and metrics.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> CorrelationExtractor for F
where
    F: Fn(&Value) -> Result<String, ExtractionError> + Send + Sync,
{
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        self(payload)
    }
}

/// Extraction rule selected by trigger kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerExtractor {
    trigger: TriggerKind,
}

impl TriggerExtractor {
    pub fn new(trigger: TriggerKind) -> Self {
        Self { trigger }
    }
}

impl CorrelationExtractor for TriggerExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        match self.trigger {
            TriggerKind::Http => HttpExtractor.extract(payload),
            TriggerKind::Queue => QueueExtractor.extract(payload),
            TriggerKind::EventHub => EventHubExtractor.extract(payload),
            TriggerKind::EventGrid => EventGridExtractor.extract(payload),
            TriggerKind::ServiceBus => ServiceBusExtractor.extract(payload),
            TriggerKind::Blob => BlobExtractor.extract(payload),
            TriggerKind::Cosmos => CosmosExtractor.extract(payload),
            TriggerKind::Database => DatabaseExtractor.extract(payload),
        }
    }

    fn name(&self) -> &str {
        self.trigger.as_str()
    }
}

/// Non-empty string field of an object.
pub(crate) fn string_field(
    trigger: TriggerKind,
    value: &Value,
    field: &'static str,
) -> Result<String, ExtractionError> {
    let raw = value
        .get(field)
        .ok_or(ExtractionError::MissingField { trigger, field })?
        .as_str()
        .ok_or(ExtractionError::NotAString { trigger, field })?;

    if raw.is_empty() {
        return Err(ExtractionError::EmptyValue { trigger, field });
    }
    Ok(raw.to_string())
}

/// First element of a batch payload.
pub(crate) fn first_in_batch(
    trigger: TriggerKind,
    value: &Value,
) -> Result<&Value, ExtractionError> {
    value
        .as_array()
        .and_then(|items| items.first())
        .ok_or(ExtractionError::EmptyBatch { trigger })
}

/// Token carried by a message body: the body itself when it is a string,
/// its `operationId` when it is an object.
pub(crate) fn message_token(trigger: TriggerKind, body: &Value) -> Result<String, ExtractionError> {
    match body {
        Value::String(s) if s.is_empty() => Err(ExtractionError::EmptyValue {
            trigger,
            field: "body",
        }),
        Value::String(s) => Ok(s.clone()),
        Value::Object(_) => string_field(trigger, body, OPERATION_ID_FIELD),
        Value::Null => Err(ExtractionError::MissingField {
            trigger,
            field: "body",
        }),
        _ => Err(ExtractionError::NotAString {
            trigger,
            field: "body",
        }),
    }
}
