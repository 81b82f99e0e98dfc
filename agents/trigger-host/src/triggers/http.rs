//! HTTP trigger extraction

use serde_json::Value;

use super::{string_field, CorrelationExtractor, ExtractionError, OPERATION_ID_FIELD};
use crate::contracts::TriggerKind;

/// Reads the `operationId` query parameter of the request binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpExtractor;

impl CorrelationExtractor for HttpExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        let trigger = TriggerKind::Http;
        let query = payload
            .get("Query")
            .or_else(|| payload.get("query"))
            .ok_or(ExtractionError::MissingField {
                trigger,
                field: "Query",
            })?;

        string_field(trigger, query, OPERATION_ID_FIELD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_parameter() {
        let payload = json!({
            "Url": "https://bench.example/api/HttpTrigger?operationId=abc123",
            "Method": "GET",
            "Query": {"operationId": "abc123"},
            "Headers": {}
        });
        assert_eq!(HttpExtractor.extract(&payload).unwrap(), "abc123");
    }

    #[test]
    fn test_lowercase_query_section() {
        let payload = json!({"query": {"operationId": "abc123"}});
        assert_eq!(HttpExtractor.extract(&payload).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_parameter() {
        let payload = json!({"Query": {"name": "bench"}});
        assert_eq!(
            HttpExtractor.extract(&payload),
            Err(ExtractionError::MissingField {
                trigger: TriggerKind::Http,
                field: "operationId"
            })
        );

        assert_eq!(
            HttpExtractor.extract(&json!({"Method": "GET"})),
            Err(ExtractionError::MissingField {
                trigger: TriggerKind::Http,
                field: "Query"
            })
        );
    }
}
