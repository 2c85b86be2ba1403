use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::config::Config;
use crate::{create_router, AppState};

const BOUNDARY: &str = "intruscan-test-boundary";

fn app_with(config: Config) -> Router {
    create_router(AppState::new(config).unwrap())
}

fn app() -> Router {
    let dir = std::env::temp_dir().join("intruscan-server-tests");
    let mut config = Config::default();
    config.pipeline.model_path = dir.join("absent.onnx");
    app_with(config)
}

fn multipart_body(field: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"flows.csv\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = field,
        c = content
    )
}

fn upload(uri: &str, field: &str, content: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart_body(field, content)))
        .unwrap()
}

fn flows_csv(rows: usize) -> String {
    let mut csv = String::from(" Total Backward Packets, Flow Duration, Total Fwd Packets,Flow ID\n");
    for i in 0..rows {
        csv.push_str(&format!("{},{},{},flow-{}\n", 80 + i % 3, 1000 + i * 17 % 211, i % 9, i));
    }
    csv
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_model_state() {
    for uri in ["/health", "/api/health"] {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model_loaded"], false);
        assert_eq!(json["version"], intruscan_core::constants::APP_VERSION);
    }
}

#[tokio::test]
async fn test_analyze_returns_report() {
    let response = app()
        .oneshot(upload("/api/analyze", "file", &flows_csv(50)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["total_records"], 50);
    assert_eq!(
        json["features_used"],
        serde_json::json!(["Flow Duration", "Total Fwd Packets", "Total Backward Packets"])
    );
    assert!(matches!(json["threat_level"].as_str(), Some("LOW" | "MEDIUM" | "HIGH")));
    assert_eq!(json["feature_metadata"]["ignored_text_columns"], serde_json::json!(["Flow ID"]));
    assert_eq!(json["strategy"], "isolation_forest");
    assert_eq!(json["anomaly_scores"].as_array().map(Vec::len), Some(50));
}

#[tokio::test]
async fn test_analyze_without_file_field() {
    let response = app()
        .oneshot(upload("/api/analyze", "attachment", &flows_csv(5)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "missing_file");
}

#[tokio::test]
async fn test_analyze_no_matching_features() {
    let response = app()
        .oneshot(upload("/api/analyze", "file", "foo,bar\n1,2\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = json_body(response).await;
    assert_eq!(json["error"], "no_matching_features");
    assert_eq!(json["status"], 422);
}

#[tokio::test]
async fn test_analyze_empty_batch() {
    let response = app()
        .oneshot(upload("/api/analyze", "file", " Flow Duration, Total Fwd Packets\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"], "empty_batch");
}

#[tokio::test]
async fn test_classify_without_model_is_unavailable() {
    let response = app()
        .oneshot(upload("/api/classify", "file", &flows_csv(5)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"], "model_unavailable");
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let config = Config {
        max_upload_bytes: 256,
        ..Config::default()
    };

    let response = app_with(config)
        .oneshot(upload("/api/analyze", "file", &flows_csv(200)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
