mod common;

use common::TestApp;
use serde_json::{json, Value};
use user_service::config::RateLimitConfig;

#[tokio::test]
async fn create_user_resolves_location() {
    let app = TestApp::spawn().await;
    app.mock_lookup("90210", -25200, 34.0901, -118.4065).await;

    let response = app.post_user(&json!({ "name": "John Doe", "zip": 90210 })).await;

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.expect("Failed to parse JSON");
    let id = body["id"].as_str().expect("id missing").to_string();
    assert!(uuid::Uuid::parse_str(&id).is_ok());
    assert_eq!(
        body,
        json!({
            "id": id,
            "name": "John Doe",
            "zip": 90210,
            "timezone": -25200,
            "lat": 34.0901,
            "lon": -118.4065
        })
    );
}

#[tokio::test]
async fn created_user_is_readable_and_listed() {
    let app = TestApp::spawn().await;
    app.mock_lookup("12345", -18000, 42.8142, -73.9396).await;

    let created = app.create_user("john doe", json!(12345)).await;
    let id = created["id"].as_str().unwrap();

    let response = app.get_user(id).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), created);

    let response = app.list_users().await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!([created]));
}

#[tokio::test]
async fn list_of_empty_store_is_an_empty_array() {
    let app = TestApp::spawn().await;

    let response = app.list_users().await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!([]));
}

#[tokio::test]
async fn numeric_zip_keeps_leading_zeros_in_lookup() {
    let app = TestApp::spawn().await;
    app.mock_lookup("02134", -14400, 42.3563, -71.1226).await;

    let created = app.create_user("jane doe", json!(2134)).await;

    assert_eq!(created["zip"], 2134);
    assert_eq!(created["lat"], 42.3563);
}

#[tokio::test]
async fn text_zip_is_preserved() {
    let app = TestApp::spawn().await;
    app.mock_lookup("02134", -14400, 42.3563, -71.1226).await;

    let created = app.create_user("jane doe", json!("02134")).await;

    assert_eq!(created["zip"], "02134");
    assert_eq!(created["timezone"], -14400);
}

#[tokio::test]
async fn get_unknown_user_returns_404() {
    let app = TestApp::spawn().await;

    let response = app.get_user("does-not-exist").await;

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("does-not-exist"));
}

#[tokio::test]
async fn invalid_user_id_returns_400() {
    let app = TestApp::spawn().await;

    let response = app.get_user("bad$id").await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn update_overlays_fields_and_refreshes_location() {
    let app = TestApp::spawn().await;
    app.mock_lookup("12345", -18000, 42.8142, -73.9396).await;
    app.mock_lookup("54321", -21600, 43.6112, -89.4734).await;
    let created = app.create_user("john doe", json!(12345)).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .patch_user(id, &json!({ "name": "Updated John Doe", "zip": 54321 }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(
        updated,
        json!({
            "id": id,
            "name": "Updated John Doe",
            "zip": 54321,
            "timezone": -21600,
            "lat": 43.6112,
            "lon": -89.4734
        })
    );
    assert_eq!(app.get_user(id).await.json::<Value>().await.unwrap(), updated);
}

#[tokio::test]
async fn rename_keeps_location_without_lookup() {
    let app = TestApp::spawn().await;
    app.mock_lookup("12345", -18000, 42.8142, -73.9396).await;
    let created = app.create_user("john doe", json!(12345)).await;
    let id = created["id"].as_str().unwrap();

    let response = app.patch_user(id, &json!({ "name": "Jane Doe" })).await;

    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["name"], "Jane Doe");
    assert_eq!(updated["zip"], created["zip"]);
    assert_eq!(updated["timezone"], created["timezone"]);

    let lookups = app.geo_server.received_requests().await.unwrap();
    assert_eq!(lookups.len(), 1);
}

#[tokio::test]
async fn update_of_unknown_user_returns_404() {
    let app = TestApp::spawn().await;

    let response = app.patch_user("missing", &json!({ "name": "Nobody" })).await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn empty_update_returns_400() {
    let app = TestApp::spawn().await;
    app.mock_lookup("12345", -18000, 42.8142, -73.9396).await;
    let created = app.create_user("john doe", json!(12345)).await;

    let response = app
        .patch_user(created["id"].as_str().unwrap(), &json!({}))
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn invalid_fields_return_422() {
    let app = TestApp::spawn().await;

    let cases = [
        json!({ "name": "", "zip": 12345 }),
        json!({ "name": "John Doe", "zip": 0 }),
        json!({ "name": "John Doe", "zip": "not/a/zip" }),
        json!({ "name": "x".repeat(101), "zip": 12345 }),
    ];

    for body in cases {
        let response = app.post_user(&body).await;
        assert_eq!(
            response.status().as_u16(),
            422,
            "The API did not reject {}",
            body
        );
    }

    let lookups = app.geo_server.received_requests().await.unwrap();
    assert!(lookups.is_empty());
}

#[tokio::test]
async fn malformed_or_incomplete_body_returns_400() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/users", app.address))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = app.post_user(&json!({ "name": "John Doe" })).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_zip_returns_400_and_stores_nothing() {
    let app = TestApp::spawn().await;
    app.mock_lookup_status("99999", 404).await;

    let response = app.post_user(&json!({ "name": "John Doe", "zip": 99999 })).await;

    assert_eq!(response.status().as_u16(), 400);
    assert!(app.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn lookup_outage_returns_502() {
    let app = TestApp::spawn().await;
    app.mock_lookup_status("12345", 500).await;

    let response = app.post_user(&json!({ "name": "John Doe", "zip": 12345 })).await;

    assert_eq!(response.status().as_u16(), 502);
    assert!(app.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_api_key_returns_502() {
    let app = TestApp::spawn().await;
    app.mock_lookup_status("12345", 401).await;

    let response = app.post_user(&json!({ "name": "John Doe", "zip": 12345 })).await;

    assert_eq!(response.status().as_u16(), 502);
}

#[tokio::test]
async fn delete_removes_user_and_is_idempotent() {
    let app = TestApp::spawn().await;
    app.mock_lookup("12345", -18000, 42.8142, -73.9396).await;
    let created = app.create_user("john doe", json!(12345)).await;
    let id = created["id"].as_str().unwrap();

    let response = app.delete_user(id).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({ "id": id, "deleted": true })
    );

    assert_eq!(app.get_user(id).await.status().as_u16(), 404);

    let response = app.delete_user(id).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn rate_limit_applies_per_client_ip() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit = RateLimitConfig {
            enabled: true,
            requests: 2,
            window_seconds: 60,
        };
    })
    .await;

    let list_from = |ip: &'static str| {
        app.client
            .get(format!("{}/users", app.address))
            .header("x-forwarded-for", ip)
            .send()
    };

    assert_eq!(list_from("203.0.113.7").await.unwrap().status().as_u16(), 200);
    assert_eq!(list_from("203.0.113.7").await.unwrap().status().as_u16(), 200);

    let limited = list_from("203.0.113.7").await.unwrap();
    assert_eq!(limited.status().as_u16(), 429);
    assert!(limited.headers().contains_key("retry-after"));

    assert_eq!(list_from("198.51.100.1").await.unwrap().status().as_u16(), 200);

    // Probes are never limited
    let health = app
        .client
        .get(format!("{}/health", app.address))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(health.status().as_u16(), 200);
}
