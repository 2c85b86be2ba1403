//! Error handling

use axum::{
    extract::multipart::MultipartError,
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use intruscan_core::{ErrorKind, ErrorPayload, PipelineError};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Upload errors
    MissingFile,
    InvalidUpload { status: StatusCode, message: String },

    // Pipeline failures
    Analysis(ErrorPayload),

    // Generic errors
    InternalError(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::InvalidUpload { status, .. } => *status,
            AppError::Analysis(payload) => status_for(payload.kind),
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP status for each pipeline failure
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::ParseError => StatusCode::BAD_REQUEST,
        ErrorKind::NoMatchingFeatures | ErrorKind::EmptyBatch => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InferenceFailed
        | ErrorKind::ShapeMismatch
        | ErrorKind::NonFiniteResult
        | ErrorKind::InvalidConfig => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match self {
            AppError::MissingFile => ("missing_file", "No file uploaded".to_string()),
            AppError::InvalidUpload { message, .. } => ("invalid_upload", message),
            AppError::Analysis(payload) => {
                if status.is_server_error() {
                    tracing::error!("Analysis error ({}): {}", payload.kind, payload.message);
                }
                (payload.kind.as_str(), payload.message)
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("internal_error", "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error,
            "message": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Analysis(ErrorPayload::from(err))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::InvalidUpload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(format!("analysis task failed: {}", err))
    }
}
