//! Health check handler

use axum::Json;
use intruscan_core::{constants, model_status, ModelStatus};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    model_loaded: bool,
    model: ModelStatus,
}

pub async fn check() -> Json<HealthResponse> {
    let model = model_status();
    Json(HealthResponse {
        status: "healthy",
        version: constants::APP_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
        model_loaded: model.model_loaded,
        model,
    })
}
