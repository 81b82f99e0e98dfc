//! Event Grid extraction

use serde_json::Value;

use super::{string_field, CorrelationExtractor, ExtractionError};
use crate::contracts::TriggerKind;

/// Last `/`-separated segment of the event subject.
///
/// Storage events name the blob in their subject, e.g.
/// `/blobServices/default/containers/uploads/blobs/abc123`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventGridExtractor;

impl CorrelationExtractor for EventGridExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        let trigger = TriggerKind::EventGrid;
        let subject = string_field(trigger, payload, "subject")?;

        subject
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
            .ok_or(ExtractionError::EmptyValue {
                trigger,
                field: "subject",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_suffix() {
        let event = json!({
            "id": "831e1650-001e-001b-66ab-eeb76e069631",
            "eventType": "Microsoft.Storage.BlobCreated",
            "subject": "/blobServices/default/containers/uploads/blobs/abc123",
            "data": {}
        });
        assert_eq!(EventGridExtractor.extract(&event).unwrap(), "abc123");
    }

    #[test]
    fn test_subject_without_separator() {
        let event = json!({"subject": "abc123"});
        assert_eq!(EventGridExtractor.extract(&event).unwrap(), "abc123");
    }

    #[test]
    fn test_degenerate_subjects() {
        assert_eq!(
            EventGridExtractor.extract(&json!({"subject": "///"})),
            Err(ExtractionError::EmptyValue {
                trigger: TriggerKind::EventGrid,
                field: "subject"
            })
        );
        assert_eq!(
            EventGridExtractor.extract(&json!({"eventType": "x"})),
            Err(ExtractionError::MissingField {
                trigger: TriggerKind::EventGrid,
                field: "subject"
            })
        );
    }
}
