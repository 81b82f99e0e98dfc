//! Queue, Service Bus and Event Hub extraction

use serde_json::Value;

use super::{first_in_batch, message_token, CorrelationExtractor, ExtractionError};
use crate::contracts::TriggerKind;

/// The queue message is the correlation id.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueExtractor;

impl CorrelationExtractor for QueueExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        let trigger = TriggerKind::Queue;
        match payload {
            Value::String(s) if !s.is_empty() => Ok(s.clone()),
            Value::String(_) => Err(ExtractionError::EmptyValue {
                trigger,
                field: "message",
            }),
            Value::Null => Err(ExtractionError::MissingField {
                trigger,
                field: "message",
            }),
            _ => Err(ExtractionError::NotAString {
                trigger,
                field: "message",
            }),
        }
    }
}

/// Message body string, or `operationId` of a JSON body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceBusExtractor;

impl CorrelationExtractor for ServiceBusExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        message_token(TriggerKind::ServiceBus, payload)
    }
}

/// First event of the batch; its body string or `operationId`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventHubExtractor;

impl CorrelationExtractor for EventHubExtractor {
    fn extract(&self, payload: &Value) -> Result<String, ExtractionError> {
        let trigger = TriggerKind::EventHub;
        let first = first_in_batch(trigger, payload)?;
        message_token(trigger, first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_queue_message_is_id() {
        assert_eq!(QueueExtractor.extract(&json!("msg-42")).unwrap(), "msg-42");
    }

    #[test]
    fn test_queue_rejects_non_string() {
        assert!(matches!(
            QueueExtractor.extract(&json!({"id": 1})),
            Err(ExtractionError::NotAString { .. })
        ));
        assert!(matches!(
            QueueExtractor.extract(&Value::Null),
            Err(ExtractionError::MissingField { .. })
        ));
        assert!(matches!(
            QueueExtractor.extract(&json!("")),
            Err(ExtractionError::EmptyValue { .. })
        ));
    }

    #[test]
    fn test_service_bus_body() {
        assert_eq!(ServiceBusExtractor.extract(&json!("sb-7")).unwrap(), "sb-7");
        assert_eq!(
            ServiceBusExtractor
                .extract(&json!({"operationId": "sb-8", "payload": "x"}))
                .unwrap(),
            "sb-8"
        );
        assert!(matches!(
            ServiceBusExtractor.extract(&json!(42)),
            Err(ExtractionError::NotAString { .. })
        ));
    }

    #[test]
    fn test_event_hub_takes_first_event() {
        assert_eq!(
            EventHubExtractor.extract(&json!(["eh-1", "eh-2"])).unwrap(),
            "eh-1"
        );
        assert_eq!(
            EventHubExtractor
                .extract(&json!([{"operationId": "eh-3"}]))
                .unwrap(),
            "eh-3"
        );
        assert_eq!(
            EventHubExtractor.extract(&json!([])),
            Err(ExtractionError::EmptyBatch {
                trigger: TriggerKind::EventHub
            })
        );
    }
}
