//! Integration tests for the Trigger Host

use axum::body::Body;
use axum::http::{Request, StatusCode};
use invocation_span::{DependencyTemplate, InvocationContext, TraceContext};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use trigger_host::contracts::{FunctionRegistry, TriggerKind};
use trigger_host::error::HandlerError;
use trigger_host::handler::{create_router, AppState};
use trigger_host::telemetry::{
    MemorySink, TelemetryClient, TelemetryConfig, TriggerMetricsRegistry,
};
use trigger_host::{CorrelationWrapper, WrapError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn template() -> DependencyTemplate {
    DependencyTemplate::new("benchmark dependency", "HTTP", "benchmark-target")
}

fn memory_client(sink: &MemorySink) -> TelemetryClient {
    TelemetryClient::new(&TelemetryConfig::default(), Arc::new(sink.clone()))
}

async fn run_ok(trigger: TriggerKind, function: &str, payload: Value) -> (String, MemorySink) {
    let sink = MemorySink::new();
    let wrapper = CorrelationWrapper::for_trigger(trigger, memory_client(&sink), template());

    let id = wrapper
        .wrap(&InvocationContext::new(function), &payload, |c| async move {
            Ok::<_, HandlerError>(c.correlation_id)
        })
        .await
        .expect("wrapped invocation failed");

    wrapper
        .telemetry()
        .drain(Duration::from_secs(1))
        .await
        .expect("drain failed");
    (id, sink)
}

#[tokio::test]
async fn test_http_scenario_record_id() {
    let payload = json!({
        "Url": "https://bench.example/api/HttpTrigger?operationId=abc123",
        "Method": "GET",
        "Query": {"operationId": "abc123"}
    });
    let (_, sink) = run_ok(TriggerKind::Http, "HttpTrigger", payload).await;

    let deps = sink.dependencies().await;
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].id, "abc123");
}

#[tokio::test]
async fn test_queue_scenario_record_data() {
    let (_, sink) = run_ok(TriggerKind::Queue, "QueueTrigger", json!("msg-42")).await;

    let deps = sink.dependencies().await;
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].data, "msg-42");
}

#[tokio::test]
async fn test_blob_scenario_request_id() {
    let payload = json!({
        "name": "bench/input.txt",
        "metadata": {"operationId": "abcd|efgh.1"},
        "content": "hello"
    });
    let (id, sink) = run_ok(TriggerKind::Blob, "BlobTrigger", payload).await;

    assert_eq!(id, "abcd");
    assert_eq!(sink.dependencies().await[0].id, "abcd");
}

#[tokio::test]
async fn test_every_trigger_calls_handler_once() {
    let cases = [
        (TriggerKind::Http, json!({"Query": {"operationId": "h-1"}})),
        (TriggerKind::Queue, json!("q-1")),
        (TriggerKind::EventHub, json!([{"operationId": "eh-1"}, {"operationId": "eh-2"}])),
        (TriggerKind::EventGrid, json!({"subject": "/blobServices/default/containers/c/blobs/eg-1"})),
        (TriggerKind::ServiceBus, json!({"operationId": "sb-1"})),
        (TriggerKind::Blob, json!({"metadata": {"operationId": "b-1"}})),
        (TriggerKind::Cosmos, json!([{"id": "doc", "operationId": "c-1"}])),
        (TriggerKind::Database, json!([{"Operation": 0, "Item": {"operationId": "d-1"}}])),
    ];

    for (trigger, payload) in cases {
        let sink = MemorySink::new();
        let wrapper = CorrelationWrapper::for_trigger(trigger, memory_client(&sink), template());
        let calls = AtomicUsize::new(0);

        wrapper
            .wrap(&InvocationContext::new("Bench"), &payload, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), HandlerError>(()) }
            })
            .await
            .unwrap_or_else(|e| panic!("{} failed: {}", trigger, e));

        assert_eq!(calls.load(Ordering::SeqCst), 1, "{}", trigger);

        wrapper.telemetry().drain(Duration::from_secs(1)).await.unwrap();
        assert_eq!(sink.dependencies().await.len(), 1, "{}", trigger);
    }
}

#[tokio::test]
async fn test_missing_field_never_calls_handler() {
    let cases = [
        (TriggerKind::Http, json!({"Query": {}})),
        (TriggerKind::Queue, Value::Null),
        (TriggerKind::EventHub, json!([])),
        (TriggerKind::EventGrid, json!({"id": "no-subject"})),
        (TriggerKind::ServiceBus, json!({"other": 1})),
        (TriggerKind::Blob, json!({"metadata": {}})),
        (TriggerKind::Cosmos, json!([{"id": "doc"}])),
        (TriggerKind::Database, json!([{"Item": {}}])),
    ];

    for (trigger, payload) in cases {
        let sink = MemorySink::new();
        let wrapper = CorrelationWrapper::for_trigger(trigger, memory_client(&sink), template());
        let calls = AtomicUsize::new(0);

        let result = wrapper
            .wrap(&InvocationContext::new("Bench"), &payload, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), HandlerError>(()) }
            })
            .await;

        assert!(matches!(result, Err(WrapError::Extraction(_))), "{}", trigger);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "{}", trigger);
    }
}

#[tokio::test]
async fn test_handler_failure_reports_synthetic_success() {
    let sink = MemorySink::new();
    let wrapper = CorrelationWrapper::for_trigger(TriggerKind::Queue, memory_client(&sink), template());

    let result = wrapper
        .wrap(&InvocationContext::new("QueueTrigger"), &json!("msg-42"), |_| async {
            Err::<(), _>(HandlerError::InvalidInput("bad message".to_string()))
        })
        .await;

    assert!(matches!(
        result,
        Err(WrapError::Handler(HandlerError::InvalidInput(_)))
    ));

    wrapper.telemetry().drain(Duration::from_secs(1)).await.unwrap();
    let deps = sink.dependencies().await;
    assert_eq!(deps.len(), 1);
    assert!(deps[0].success);
    assert_eq!(deps[0].result_code, 200);
}

#[tokio::test]
async fn test_duration_reflects_elapsed_time() {
    let sink = MemorySink::new();
    let wrapper = CorrelationWrapper::for_trigger(TriggerKind::Queue, memory_client(&sink), template());

    wrapper
        .wrap(&InvocationContext::new("QueueTrigger"), &json!("slow"), |_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<(), HandlerError>(())
        })
        .await
        .unwrap();

    wrapper.telemetry().drain(Duration::from_secs(1)).await.unwrap();
    let dep = &sink.dependencies().await[0];
    assert!(dep.duration_ms >= 50);
    assert!(dep.duration_ms < 5_000);
}

#[tokio::test]
async fn test_records_follow_upstream_trace() {
    let sink = MemorySink::new();
    let wrapper = CorrelationWrapper::for_trigger(TriggerKind::Queue, memory_client(&sink), template());
    let trace = TraceContext::parse("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").unwrap();
    let ctx = InvocationContext::new("QueueTrigger").with_trace_context(trace);

    wrapper
        .wrap(&ctx, &json!("msg"), |_| async { Ok::<(), HandlerError>(()) })
        .await
        .unwrap();

    wrapper.telemetry().drain(Duration::from_secs(1)).await.unwrap();
    for record in sink.records().await {
        assert_eq!(record.operation_id(), "4bf92f3577b34da6a3ce929d0e0e4736");
    }
    assert_eq!(sink.traces().await[0].message, "iteration 1");
}

#[tokio::test]
async fn test_ingestion_endpoint_receives_envelopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/track"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "itemsReceived": 2,
            "itemsAccepted": 2,
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = TelemetryConfig::builder()
        .connection_string(format!(
            "InstrumentationKey=0000-1111;IngestionEndpoint={}/",
            server.uri()
        ))
        .cloud_role("bench-app")
        .build();
    let registry = TriggerMetricsRegistry::new().unwrap();
    let telemetry = TelemetryClient::from_config(&config, Some(registry.metrics())).unwrap();
    assert_eq!(telemetry.sink_name(), "ingestion");

    let wrapper = CorrelationWrapper::for_trigger(TriggerKind::Queue, telemetry, template());
    wrapper
        .wrap(&InvocationContext::new("QueueTrigger"), &json!("msg-42"), |_| async {
            Ok::<(), HandlerError>(())
        })
        .await
        .unwrap();
    wrapper.telemetry().drain(Duration::from_secs(2)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let envelopes: Vec<Value> = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0]["data"]["baseType"], "MessageData");
    assert_eq!(envelopes[1]["data"]["baseType"], "RemoteDependencyData");
    assert_eq!(envelopes[1]["data"]["baseData"]["data"], "msg-42");
    assert_eq!(envelopes[1]["tags"]["ai.cloud.role"], "bench-app");
    assert_eq!(registry.metrics().delivered(), 2.0);
}

#[tokio::test]
async fn test_ingestion_failure_does_not_fail_invocation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/track"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = TelemetryConfig::builder()
        .connection_string(format!("InstrumentationKey=k;IngestionEndpoint={}", server.uri()))
        .build();
    let registry = TriggerMetricsRegistry::new().unwrap();
    let telemetry = TelemetryClient::from_config(&config, Some(registry.metrics())).unwrap();
    let wrapper = CorrelationWrapper::for_trigger(TriggerKind::Queue, telemetry, template());

    let result = wrapper
        .wrap(&InvocationContext::new("QueueTrigger"), &json!("msg"), |_| async {
            Ok::<_, HandlerError>("done")
        })
        .await;
    assert_eq!(result.unwrap(), "done");

    wrapper.telemetry().drain(Duration::from_secs(2)).await.unwrap();
    assert_eq!(registry.metrics().failed(), 2.0);
}

#[tokio::test]
async fn test_router_blob_invocation_end_to_end() {
    let sink = MemorySink::new();
    let metrics = Arc::new(TriggerMetricsRegistry::new().unwrap());
    let telemetry = TelemetryClient::with_metrics(
        &TelemetryConfig::default(),
        Arc::new(sink.clone()),
        metrics.metrics(),
    );
    let state = Arc::new(AppState::new(telemetry, FunctionRegistry::benchmark(), metrics));
    let router = create_router(Arc::clone(&state));

    let body = json!({
        "Data": {"blob": "aGVsbG8="},
        "Metadata": {
            "name": "input.txt",
            "Metadata": {"operationId": "abcd|efgh.1"}
        }
    });
    let request = Request::builder()
        .method("POST")
        .uri("/BlobTrigger")
        .header("content-type", "application/json")
        .header("x-azure-functions-invocationid", "6f2a7c1e-4b1d-4f8e-9a51-2c0f3e4d5b6a")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(response["Logs"][0].as_str().unwrap().contains("abcd"));

    state.telemetry.drain(Duration::from_secs(1)).await.unwrap();
    let deps = sink.dependencies().await;
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].id, "abcd");
    assert_eq!(
        deps[0].properties.get("invocation_id").map(String::as_str),
        Some("6f2a7c1e-4b1d-4f8e-9a51-2c0f3e4d5b6a")
    );
}

#[tokio::test]
async fn test_router_handler_failure_is_500_with_record() {
    let sink = MemorySink::new();
    let metrics = Arc::new(TriggerMetricsRegistry::new().unwrap());
    let telemetry = TelemetryClient::with_metrics(
        &TelemetryConfig::default(),
        Arc::new(sink.clone()),
        metrics.metrics(),
    );
    let state = Arc::new(AppState::new(telemetry, FunctionRegistry::benchmark(), metrics));

    let body = json!({"Data": {"req": {"Query": {"operationId": "abc123", "fail": "true"}}}});
    let request = Request::builder()
        .method("POST")
        .uri("/HttpTrigger")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = create_router(Arc::clone(&state)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    state.telemetry.drain(Duration::from_secs(1)).await.unwrap();
    let deps = sink.dependencies().await;
    assert_eq!(deps.len(), 1);
    assert!(deps[0].success);
    assert_eq!(deps[0].result_code, 200);
}
