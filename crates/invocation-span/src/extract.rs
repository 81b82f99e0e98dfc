//! Axum extractor for the invocation context from HTTP headers.
//!
//! Reads `X-Azure-Functions-InvocationId` and `traceparent` from request
//! headers and the function name from the last path segment.
//! Rejects with 400 if either header is present but invalid.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::context::{InvocationContext, TraceContext};

pub const INVOCATION_ID_HEADER: &str = "x-azure-functions-invocationid";
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Axum extractor that reads the invocation context from HTTP headers.
///
/// A missing invocation id is replaced by a fresh one; a missing
/// `traceparent` leaves the context without upstream trace.
pub struct InvocationContextExtractor(pub InvocationContext);

/// Rejection type for invalid invocation headers.
#[derive(Debug)]
pub struct InvocationContextRejection {
    code: &'static str,
    message: String,
}

impl IntoResponse for InvocationContextRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": self.code,
                "message": self.message
            })),
        )
            .into_response()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for InvocationContextExtractor {
    type Rejection = InvocationContextRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let invocation_id = match headers.get(INVOCATION_ID_HEADER) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| Uuid::parse_str(v).ok())
                .ok_or_else(|| InvocationContextRejection {
                    code: "INVALID_INVOCATION_ID",
                    message: "X-Azure-Functions-InvocationId must be a valid UUID".to_string(),
                })?,
            None => Uuid::new_v4(),
        };

        let trace_context = match headers.get(TRACEPARENT_HEADER) {
            Some(value) => {
                let raw = value.to_str().map_err(|_| InvocationContextRejection {
                    code: "INVALID_TRACEPARENT",
                    message: "traceparent must be visible ASCII".to_string(),
                })?;
                Some(
                    TraceContext::parse(raw).map_err(|e| InvocationContextRejection {
                        code: "INVALID_TRACEPARENT",
                        message: e.to_string(),
                    })?,
                )
            }
            None => None,
        };

        let function_name = parts
            .uri
            .path()
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or_default()
            .to_string();

        Ok(Self(InvocationContext {
            invocation_id,
            function_name,
            trace_context,
            received_at: Utc::now(),
        }))
    }
}
