#![allow(dead_code)]

use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use user_service::config::{GeoConfig, RateLimitConfig, StoreConfig, UserServiceConfig};
use user_service::services::UserStore;
use user_service::startup::Application;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GEO_API_KEY: &str = "test-api-key";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub geo_server: MockServer,
    pub store: Arc<dyn UserStore>,
}

/// Memory store, lookups against `geo_url`, no retries, no rate limit.
pub fn test_config(geo_url: &str) -> UserServiceConfig {
    UserServiceConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            ..CoreConfig::default()
        },
        store: StoreConfig::Memory,
        geo: GeoConfig {
            enabled: true,
            api_base_url: geo_url.to_string(),
            api_key: Secret::new(GEO_API_KEY.to_string()),
            country_code: "us".to_string(),
            timeout: Duration::from_secs(5),
            retry_max_elapsed: Duration::ZERO,
        },
        rate_limit: RateLimitConfig {
            enabled: false,
            requests: 100,
            window_seconds: 60,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut UserServiceConfig)) -> Self {
        let geo_server = MockServer::start().await;

        let mut config = test_config(&geo_server.uri());
        customize(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let store = app.store();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            geo_server,
            store,
        }
    }

    /// Resolve `zip` (as sent to the lookup API) to the given location.
    pub async fn mock_lookup(&self, zip: &str, timezone: i32, lat: f64, lon: f64) {
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("zip", format!("{},us", zip)))
            .and(query_param("appid", GEO_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "coord": { "lon": lon, "lat": lat },
                "weather": [{ "id": 800, "main": "Clear" }],
                "timezone": timezone,
                "name": "Test City",
                "cod": 200
            })))
            .mount(&self.geo_server)
            .await;
    }

    pub async fn mock_lookup_status(&self, zip: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("zip", format!("{},us", zip)))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "cod": status.to_string(),
                "message": "lookup failed"
            })))
            .mount(&self.geo_server)
            .await;
    }

    pub async fn post_user(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/users", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_user(&self, id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/users/{}", self.address, id))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn list_users(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/users", self.address))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch_user(&self, id: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(format!("{}/users/{}", self.address, id))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete_user(&self, id: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}/users/{}", self.address, id))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Create a user and return the stored record.
    pub async fn create_user(&self, name: &str, zip: Value) -> Value {
        let response = self.post_user(&json!({ "name": name, "zip": zip })).await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse JSON")
    }
}
