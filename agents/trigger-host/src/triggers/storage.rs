//! Blob, Cosmos and Database extraction

use serde_json::Value;

use super::{first_in_batch, string_field, CorrelationExtractor, ExtractionError, OPERATION_ID_FIELD};
use crate::contracts::TriggerKind;

/// Root operation id of a hierarchical request id.
///
/// Request ids look like `|root.span.` or `root|span.1`: the first
/// non-empty segment between `|` and `.` delimiters is the operation.
pub fn parse_request_id(raw: &str) -> Option<&str> {
    raw.split(|c| c == '|' || c == '.')
        .find(|segment| !segment.is_empty())
}

/// `operationId` of the blob metadata, reduced to its root operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobExtractor;

impl CorrelationExtractor for BlobExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        let trigger = TriggerKind::Blob;
        let metadata = payload
            .get("metadata")
            .filter(|m| !m.is_null())
            .ok_or(ExtractionError::MissingField {
                trigger,
                field: "metadata",
            })?;

        let raw = string_field(trigger, metadata, OPERATION_ID_FIELD)?;
        parse_request_id(&raw)
            .map(str::to_string)
            .ok_or(ExtractionError::EmptyValue {
                trigger,
                field: OPERATION_ID_FIELD,
            })
    }
}

/// `operationId` of the first changed document.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosmosExtractor;

impl CorrelationExtractor for CosmosExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        let trigger = TriggerKind::Cosmos;
        let document = first_in_batch(trigger, payload)?;
        string_field(trigger, document, OPERATION_ID_FIELD)
    }
}

/// `Item.operationId` of the first row change.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseExtractor;

impl CorrelationExtractor for DatabaseExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        let trigger = TriggerKind::Database;
        let change = first_in_batch(trigger, payload)?;
        let item = change.get("Item").ok_or(ExtractionError::MissingField {
            trigger,
            field: "Item",
        })?;
        string_field(trigger, item, OPERATION_ID_FIELD)
    }
}
