//! Benchmark trigger bodies
//!
//! The bodies do almost nothing on purpose: the benchmark measures the
//! wrapper and telemetry overhead, not handler work.

use invocation_span::{Correlation, DependencyTemplate, InvocationContext, InvokeRequest, InvokeResponse};
use serde_json::{json, Value};

use crate::contracts::{FunctionBinding, TriggerKind};
use crate::error::{HandlerError, HostError};
use crate::telemetry::TelemetryClient;
use crate::wrapper::CorrelationWrapper;

/// Name of the HTTP output binding.
pub const HTTP_OUTPUT_BINDING: &str = "res";

/// Synthetic dependency emitted for `binding`.
pub fn dependency_template(binding: &FunctionBinding) -> DependencyTemplate {
    DependencyTemplate::new(
        format!("{} dependency", binding.trigger),
        binding.trigger.dependency_type(),
        binding.function_name.clone(),
    )
}

/// Run one wrapped benchmark invocation.
pub async fn invoke(
    telemetry: &TelemetryClient,
    binding: &FunctionBinding,
    ctx: &InvocationContext,
    request: &InvokeRequest,
) -> Result<InvokeResponse, HostError> {
    let payload = binding.trigger.event_payload(request, &binding.binding);
    let wrapper = CorrelationWrapper::for_trigger(
        binding.trigger,
        telemetry.clone(),
        dependency_template(binding),
    );

    let trigger = binding.trigger;
    let response = wrapper
        .wrap(ctx, &payload, |correlation| run(trigger, correlation, &payload))
        .await?;

    Ok(response)
}

/// Body of the benchmark function for `trigger`.
pub async fn run(
    trigger: TriggerKind,
    correlation: Correlation,
    payload: &Value,
) -> Result<InvokeResponse, HandlerError> {
    tracing::info!(trigger = %trigger, "Benchmark body running");

    match trigger {
        TriggerKind::Http => {
            if failure_requested(payload) {
                return Err(HandlerError::InvalidInput(format!(
                    "failure requested by {}",
                    correlation.correlation_id
                )));
            }

            let body = format!("operation {} completed", correlation.correlation_id);
            Ok(InvokeResponse::new()
                .with_output(
                    HTTP_OUTPUT_BINDING,
                    json!({
                        "statusCode": 200,
                        "body": body,
                        "headers": {
                            "Content-Type": "text/plain",
                            "x-correlation-id": correlation.correlation_id,
                        },
                    }),
                )
                .with_log(format!(
                    "{} handled operation {}",
                    correlation.function_name, correlation.correlation_id
                )))
        }
        _ => Ok(InvokeResponse::new().with_log(format!(
            "{} processed {} event {}",
            correlation.function_name, trigger, correlation.correlation_id
        ))),
    }
}

/// `?fail=true` on the request asks the HTTP body to fail, to exercise the
/// failure path end to end.
fn failure_requested(payload: &Value) -> bool {
    payload
        .get("Query")
        .or_else(|| payload.get("query"))
        .and_then(|q| q.get("fail"))
        .and_then(Value::as_str)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn correlation(id: &str) -> Correlation {
        Correlation {
            correlation_id: id.to_string(),
            operation_id: "op".to_string(),
            invocation_id: Uuid::new_v4(),
            function_name: "Bench".to_string(),
        }
    }

    #[tokio::test]
    async fn test_http_body_echoes_correlation() {
        let response = run(TriggerKind::Http, correlation("abc123"), &json!({"Query": {}}))
            .await
            .unwrap();

        let res = &response.outputs[HTTP_OUTPUT_BINDING];
        assert_eq!(res["statusCode"], 200);
        assert_eq!(res["headers"]["x-correlation-id"], "abc123");
        assert!(res["body"].as_str().unwrap().contains("abc123"));
    }

    #[tokio::test]
    async fn test_http_body_requested_failure() {
        let payload = json!({"Query": {"operationId": "x", "fail": "true"}});
        let result = run(TriggerKind::Http, correlation("x"), &payload).await;
        assert!(matches!(result, Err(HandlerError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_other_bodies_log_correlation() {
        let response = run(TriggerKind::Cosmos, correlation("doc-1"), &Value::Null)
            .await
            .unwrap();
        assert!(response.outputs.is_empty());
        assert_eq!(response.logs.len(), 1);
        assert!(response.logs[0].contains("doc-1"));
    }

    #[test]
    fn test_dependency_template() {
        let template = dependency_template(&FunctionBinding::new("SqlTrigger", TriggerKind::Database));
        assert_eq!(template.dependency_type, "SQL");
        assert_eq!(template.target, "SqlTrigger");
        assert_eq!(template.name, "database dependency");
    }
}
