//! Pipeline error taxonomy
//!
//! Every failure the core can produce. The request boundary turns these into
//! an [`ErrorPayload`] instead of letting them escape.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Undecodable or malformed input
    #[error("failed to parse CSV input: {0}")]
    Parse(String),

    /// Allow-list and input columns have nothing in common
    #[error("no matching features found in the dataset ({allow_list_size} allow-listed, {column_count} columns present)")]
    NoMatchingFeatures {
        allow_list_size: usize,
        column_count: usize,
    },

    #[error("dataset contains no records")]
    EmptyBatch,

    /// Classifier artifact missing or unloadable
    #[error("model unavailable at {path}: {reason}")]
    ModelUnavailable { path: String, reason: String },

    /// Forward pass failed after a successful load
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// A report field came out NaN or infinite
    #[error("non-finite value in {field}")]
    NonFiniteResult { field: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Parse(_) => ErrorKind::ParseError,
            PipelineError::NoMatchingFeatures { .. } => ErrorKind::NoMatchingFeatures,
            PipelineError::EmptyBatch => ErrorKind::EmptyBatch,
            PipelineError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            PipelineError::Inference(_) => ErrorKind::InferenceFailed,
            PipelineError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            PipelineError::NonFiniteResult { .. } => ErrorKind::NonFiniteResult,
            PipelineError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Failures caused by the uploaded data rather than the deployment
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ParseError | ErrorKind::NoMatchingFeatures | ErrorKind::EmptyBatch
        )
    }

    pub(crate) fn model_unavailable(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        PipelineError::ModelUnavailable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn shape(expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> Self {
        PipelineError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Parse(err.to_string())
    }
}

/// Stable, serializable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParseError,
    NoMatchingFeatures,
    EmptyBatch,
    ModelUnavailable,
    InferenceFailed,
    ShapeMismatch,
    NonFiniteResult,
    InvalidConfig,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "parse_error",
            ErrorKind::NoMatchingFeatures => "no_matching_features",
            ErrorKind::EmptyBatch => "empty_batch",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::InferenceFailed => "inference_failed",
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::NonFiniteResult => "non_finite_result",
            ErrorKind::InvalidConfig => "invalid_config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned across the request boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PipelineError> for ErrorPayload {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for ErrorPayload {
    fn from(err: PipelineError) -> Self {
        Self::from(&err)
    }
}
