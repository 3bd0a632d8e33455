//! Validated JSON extractor for Axum
//!
//! Deserializes the body like `axum::Json` and then runs `Validate`.
//! A malformed body and a failed rule both end as `DomainError::Validation`.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiError;
use crate::domain::DomainError;

/// JSON body that has passed `Validate`. Rejects with `ApiError`.
pub struct ValidatedJson<T>(pub T);

/// Flatten field errors into `field: message` pairs, sorted for stable output.
fn describe(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs {
            match &err.message {
                Some(message) => parts.push(format!("{}: {}", field, message)),
                None => parts.push(format!("{}: {}", field, err.code)),
            }
        }
    }
    if parts.is_empty() {
        return "validation failed".to_string();
    }
    parts.sort();
    parts.join("; ")
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => value,
            Err(rejection) => {
                return Err(DomainError::Validation(format!(
                    "invalid JSON: {}",
                    rejection.body_text()
                ))
                .into())
            }
        };
        if let Err(errors) = value.validate() {
            return Err(DomainError::Validation(describe(&errors)).into());
        }
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Credentials {
        #[validate(email(message = "invalid email format"))]
        email: String,
        #[validate(length(min = 6, message = "too short"))]
        password: String,
    }

    async fn handler(ValidatedJson(body): ValidatedJson<Credentials>) -> String {
        format!("{}:{}", body.email, body.password.len())
    }

    async fn send(body: &'static str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/test")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = Router::new()
            .route("/test", post(handler))
            .oneshot(req)
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, _) = send(r#"{"email":"ann@example.com","password":"secret1"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let (status, json) = send("not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "validation");
    }

    #[tokio::test]
    async fn test_field_errors_are_listed() {
        let (status, json) = send(r#"{"email":"nope","password":"x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("email: invalid email format"));
        assert!(message.contains("password: too short"));
    }
}
