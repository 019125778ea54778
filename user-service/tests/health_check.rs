mod common;

use common::TestApp;
use std::sync::Once;
use user_service::services::init_metrics;

static INIT_METRICS: Once = Once::new();

fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(|| {
        init_metrics().expect("Failed to install metrics recorder");
    });
}

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "user-service");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("Failed to execute request");

    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "req-123");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn metrics_endpoint_returns_prometheus_format() {
    ensure_metrics_initialized();
    let app = TestApp::spawn().await;

    // Record at least one request
    app.list_users().await;

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let content_type = response
        .headers()
        .get("content-type")
        .expect("Missing content-type header")
        .to_str()
        .expect("Invalid content-type");
    assert!(content_type.starts_with("text/plain"));

    let body = response.text().await.expect("Failed to get response body");
    assert!(
        body.contains("http_requests_total"),
        "Unexpected metrics output: {}",
        body
    );
}
