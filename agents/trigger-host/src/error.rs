//! Error types for the Trigger Host
//!
//! Host-level failures surfaced to the functions host as invocation failures.

use axum::http::StatusCode;
use thiserror::Error;

use crate::triggers::ExtractionError;
use crate::wrapper::WrapError;

/// Failure raised by a benchmark trigger body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Input data the body needs is absent or malformed
    #[error("Invalid trigger input: {0}")]
    InvalidInput(String),

    /// Output could not be produced
    #[error("Output error: {0}")]
    Output(String),
}

/// Main error type for host operations
#[derive(Error, Debug)]
pub enum HostError {
    /// No binding registered for the invoked function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// The correlation id could not be derived from the event
    #[error("Correlation extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The trigger body failed
    #[error("Trigger handler failed: {0}")]
    Handler(#[from] HandlerError),
}

impl HostError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            HostError::UnknownFunction(_) => "UNKNOWN_FUNCTION",
            HostError::Extraction(_) => "EXTRACTION_FAILED",
            HostError::Handler(_) => "HANDLER_FAILED",
        }
    }

    /// HTTP status reported to the functions host.
    ///
    /// Extraction and handler failures map to 500 so the platform records
    /// a failed invocation.
    pub fn status_code(&self) -> StatusCode {
        match self {
            HostError::UnknownFunction(_) => StatusCode::NOT_FOUND,
            HostError::Extraction(_) | HostError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WrapError<HandlerError>> for HostError {
    fn from(err: WrapError<HandlerError>) -> Self {
        match err {
            WrapError::Extraction(e) => HostError::Extraction(e),
            WrapError::Handler(e) => HostError::Handler(e),
        }
    }
}
