use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::reconciler::ReconcileError;
use crate::services::workbook::WorkbookError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    /// The upload was received but its contents could not be processed.
    Unprocessable { message: &'static str, error: String },
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WorkbookError> for ApiError {
    fn from(err: WorkbookError) -> Self {
        ApiError::Unprocessable { message: "Error processing file", error: err.to_string() }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        ApiError::Unprocessable { message: "Error processing file", error: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, error) = match self {
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::PayloadTooLarge(message) => (message, None),
            ApiError::Unprocessable { message, error } => (message.to_string(), Some(error)),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (message, None)
            }
        };

        (status, Json(ErrorResponse { status: status.as_u16(), message, error })).into_response()
    }
}
