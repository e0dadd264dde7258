//! REST API types.
//!
//! Successful operations answer with the result as `text/plain`. Failures
//! answer with a JSON [`ErrorResponse`] whose `error` field is the stable
//! domain message.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MatrixError, ServerError};

/// Rejection type returned by every handler.
pub type ErrorReply = (StatusCode, Json<ErrorResponse>);

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub request_id: String,
    /// Always `"error"`
    pub status: String,
    /// Machine-readable error kind, e.g. `not_square`
    pub kind: String,
    /// Human-readable message, safe to show verbatim
    pub error: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub strategy: String,
    pub endpoints: Vec<String>,
}

impl ServerError {
    /// HTTP status and machine-readable kind for this error.
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Matrix(MatrixError::Cancelled) => {
                (StatusCode::SERVICE_UNAVAILABLE, MatrixError::Cancelled.kind())
            }
            Self::Matrix(err) => (StatusCode::BAD_REQUEST, err.kind()),
            Self::Io(_) | Self::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    /// Message safe to send to clients. Internal details stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Io(_) | Self::Config(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Build the rejection for `err`, tagged with the request it belongs to.
pub fn error_reply(request_id: Uuid, err: &ServerError) -> ErrorReply {
    let (status, kind) = err.status_and_kind();
    let body = ErrorResponse {
        request_id: request_id.to_string(),
        status: "error".to_string(),
        kind: kind.to_string(),
        error: err.public_message(),
    };
    (status, Json(body))
}
