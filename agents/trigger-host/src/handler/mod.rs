//! HTTP handler for the Trigger Host
//!
//! Custom-handler entry point: the functions host posts one request per
//! invocation to `/{function}`.

pub mod benchmark;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use invocation_span::{InvocationContextExtractor, InvokeRequest, InvokeResponse};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::contracts::FunctionRegistry;
use crate::error::HostError;
use crate::telemetry::{TelemetryClient, TriggerMetricsRegistry};

/// Application state
pub struct AppState {
    pub telemetry: TelemetryClient,
    pub functions: FunctionRegistry,
    pub metrics: Arc<TriggerMetricsRegistry>,
}

impl AppState {
    pub fn new(
        telemetry: TelemetryClient,
        functions: FunctionRegistry,
        metrics: Arc<TriggerMetricsRegistry>,
    ) -> Self {
        Self {
            telemetry,
            functions,
            metrics,
        }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/:function", post(invoke_function))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        functions: state.functions.len(),
        telemetry_sink: state.telemetry.sink_name().to_string(),
        iterations: state.telemetry.iterations(),
    })
}

/// Prometheus scrape endpoint
async fn metrics(
    State(state): State<Arc<AppState>>,
) -> Result<String, (StatusCode, Json<ApiError>)> {
    state.metrics.encode_text().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError {
                error: "METRICS_UNAVAILABLE".to_string(),
                message: e.to_string(),
                invocation_id: None,
            }),
        )
    })
}

/// Invocation endpoint
async fn invoke_function(
    State(state): State<Arc<AppState>>,
    Path(function): Path<String>,
    InvocationContextExtractor(ctx): InvocationContextExtractor,
    Json(request): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, (StatusCode, Json<ApiError>)> {
    let invocation_id = ctx.invocation_id;

    let binding = state
        .functions
        .get(&function)
        .ok_or_else(|| HostError::UnknownFunction(function.clone()))
        .map_err(|e| error_response(e, invocation_id))?;

    match benchmark::invoke(&state.telemetry, binding, &ctx, &request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!(
                function = %function,
                invocation_id = %invocation_id,
                error = %e,
                "Invocation failed"
            );
            Err(error_response(e, invocation_id))
        }
    }
}

fn error_response(err: HostError, invocation_id: Uuid) -> (StatusCode, Json<ApiError>) {
    (
        err.status_code(),
        Json(ApiError {
            error: err.code().to_string(),
            message: err.to_string(),
            invocation_id: Some(invocation_id),
        }),
    )
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub functions: usize,
    pub telemetry_sink: String,
    pub iterations: u64,
}

/// API error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
    pub invocation_id: Option<Uuid>,
}
