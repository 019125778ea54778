//! Firebase Realtime Database backend, spoken to over its REST API.
//!
//! Every node is addressable as `{database_url}/{path}.json`; GET returns the
//! node (or `null`), PUT replaces it and DELETE removes it.

use super::UserStore;
use crate::config::FirebaseConfig;
use crate::models::{User, UserId};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::Value;
use service_core::error::AppError;
use service_core::observability::TracedRequestExt;

#[derive(Debug, Deserialize)]
struct FirebaseErrorResponse {
    error: String,
}

#[derive(Clone)]
pub struct FirebaseUserStore {
    client: Client,
    database_url: Url,
    collection: String,
    auth_token: Option<Secret<String>>,
}

impl FirebaseUserStore {
    pub fn new(config: FirebaseConfig) -> Result<Self, AppError> {
        let database_url = Url::parse(&config.database_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Invalid Firebase database URL {:?}",
                    config.database_url
                ))
            })?;
        UserId::parse(&config.collection).map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid collection name {:?}",
                config.collection
            ))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Failed to build HTTP client: {}",
                    e.without_url()
                ))
            })?;

        Ok(Self {
            client,
            database_url,
            collection: config.collection,
            auth_token: config.auth_token,
        })
    }

    /// `{database_url}/{node...}.json`, each segment percent-encoded so keys
    /// holding `?` or `%` address their own node.
    fn node_url(&self, node: &[&str]) -> Result<Url, AppError> {
        let mut url = self.database_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AppError::ConfigError(anyhow::anyhow!("Firebase database URL cannot have a path"))
            })?;
            segments.pop_if_empty();
            if let Some((last, parents)) = node.split_last() {
                segments.extend(parents);
                segments.push(&format!("{}.json", last));
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, node: &[&str]) -> Result<RequestBuilder, AppError> {
        let mut request = self.client.request(method, self.node_url(node)?);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token.expose_secret().as_str())]);
        }
        Ok(request.with_trace_context())
    }

    fn user_request(&self, method: Method, id: &UserId) -> Result<RequestBuilder, AppError> {
        self.request(method, &[self.collection.as_str(), id.as_str()])
    }

    /// Send and return the body of a successful response.
    async fn execute(&self, request: RequestBuilder, operation: &str) -> Result<String, AppError> {
        // The URL carries the auth token and must never reach logs or clients.
        let transport_error = |e: reqwest::Error| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Firebase {} failed: {}",
                operation,
                e.without_url()
            ))
        };

        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<FirebaseErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        tracing::error!(status = %status, operation, error = %message, "Firebase request rejected");
        Err(AppError::DatabaseError(anyhow::anyhow!(
            "Firebase {} returned {}: {}",
            operation,
            status,
            message
        )))
    }
}

fn decode_error(err: serde_json::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Malformed Firebase response: {}", err))
}

/// Records are stored with their id, but the node key is authoritative.
fn with_key(mut record: Value, key: &str) -> Value {
    if let Value::Object(fields) = &mut record {
        fields.insert("id".to_string(), Value::String(key.to_string()));
    }
    record
}

/// Children of a collection node. Integer-like keys come back as a sparse
/// array rather than an object.
fn children(node: Value) -> Result<Vec<(String, Value)>, AppError> {
    match node {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect()),
        other => Err(AppError::DatabaseError(anyhow::anyhow!(
            "Expected a collection node, got {}",
            other
        ))),
    }
}

#[async_trait]
impl UserStore for FirebaseUserStore {
    async fn get(&self, id: &UserId) -> Result<Option<User>, AppError> {
        let body = self
            .execute(self.user_request(Method::GET, id)?, "get")
            .await?;

        match serde_json::from_str::<Value>(&body).map_err(decode_error)? {
            Value::Null => Ok(None),
            record => serde_json::from_value(with_key(record, id.as_str()))
                .map(Some)
                .map_err(decode_error),
        }
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let body = self
            .execute(self.request(Method::GET, &[self.collection.as_str()])?, "list")
            .await?;
        let node = serde_json::from_str::<Value>(&body).map_err(decode_error)?;

        let mut users = Vec::new();
        for (key, record) in children(node)? {
            match serde_json::from_value::<User>(with_key(record, &key)) {
                Ok(user) => users.push(user),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping malformed user record")
                }
            }
        }

        Ok(users)
    }

    async fn set(&self, user: &User) -> Result<(), AppError> {
        self.execute(
            self.user_request(Method::PUT, &user.id)?.json(user),
            "set",
        )
        .await?;
        Ok(())
    }

    async fn remove(&self, id: &UserId) -> Result<(), AppError> {
        self.execute(self.user_request(Method::DELETE, id)?, "remove")
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.execute(
            self.request(Method::GET, &[self.collection.as_str()])?
                .query(&[("shallow", "true")]),
            "health check",
        )
        .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "firebase"
    }
}
