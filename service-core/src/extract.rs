//! Request extractors.

use crate::error::AppError;
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that has passed `validator` rules.
///
/// Unparseable bodies are rejected with 400, rule violations with 422.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e.body_text())))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::post};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Greeting {
        #[validate(length(min = 1, message = "Name cannot be empty"))]
        name: String,
    }

    async fn greet(ValidatedJson(body): ValidatedJson<Greeting>) -> String {
        body.name
    }

    async fn call(body: &'static str) -> StatusCode {
        let app = Router::new().route("/", post(greet));
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        assert_eq!(call(r#"{"name":"Ada"}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_malformed_json_with_400() {
        assert_eq!(call(r#"{"name":"#).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_rule_violation_with_422() {
        assert_eq!(call(r#"{"name":""}"#).await, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
