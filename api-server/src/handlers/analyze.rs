//! Analysis handlers
//!
//! Both endpoints take a multipart upload with the CSV in the `file` field
//! and run the pipeline on a blocking worker.

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};
use intruscan_core::{AnalysisReport, PipelineError};

use crate::{AppError, AppResult, AppState};

/// Isolation forest over the uploaded batch
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<AnalysisReport>> {
    let bytes = read_upload(multipart).await?;
    tracing::info!("Statistical analysis of {} bytes", bytes.len());

    let pipeline = state.statistical.clone();
    run_blocking(move || pipeline.analyze(&bytes)).await
}

/// Pretrained sequence classifier over the uploaded batch
pub async fn classify(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<AnalysisReport>> {
    let bytes = read_upload(multipart).await?;
    tracing::info!("Sequence classification of {} bytes", bytes.len());

    let pipeline = state.sequence.clone();
    run_blocking(move || pipeline.analyze(&bytes)).await
}

/// Contents of the `file` field
async fn read_upload(mut multipart: Multipart) -> AppResult<Bytes> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                tracing::debug!("Receiving upload '{}'", name);
            }
            return Ok(field.bytes().await?);
        }
    }
    Err(AppError::MissingFile)
}

async fn run_blocking<F>(job: F) -> AppResult<Json<AnalysisReport>>
where
    F: FnOnce() -> Result<AnalysisReport, PipelineError> + Send + 'static,
{
    let report = tokio::task::spawn_blocking(job).await??;
    Ok(Json(report))
}
