//! Authorization pipeline for Axum
//!
//! Layers run in order: [`auth_middleware`] establishes the caller,
//! [`role_gate`] restricts a route group to a role set and
//! [`control_gate`] checks ownership of the machine a control request
//! targets. Each stage stops the request with the matching error response.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use super::common::ApiError;
use super::modules::servers::ControlRequest;
use super::router::AppState;
use crate::application::authorize_control;
use crate::application::require_role;
use crate::domain::{DomainError, User, UserRole};
use crate::infrastructure::crypto::jwt::TokenSubject;

/// Upper bound on a buffered control request body.
const MAX_CONTROL_BODY: usize = 16 * 1024;

/// Roles allowed through admin-only route groups
pub const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

/// The authenticated caller, taken from a valid access token.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unauthorized(message: &str) -> Response {
    ApiError(DomainError::Unauthorized(message.to_string())).into_response()
}

/// Bearer access-token authentication
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_token)
        .map(String::from);
    let Some(token) = token else {
        return unauthorized("missing bearer token");
    };

    match state.auth.validate(&token, TokenSubject::Access) {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(e) => ApiError(e).into_response(),
    }
}

/// Let the request through only when the caller's role is in `allowed`.
pub async fn role_gate(
    State(allowed): State<&'static [UserRole]>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>() else {
        return unauthorized("authentication required");
    };
    if let Err(e) = require_role(user, allowed) {
        info!(user_id = %user.id, path = %request.uri().path(), "Role gate denied request");
        return ApiError(e).into_response();
    }
    next.run(request).await
}

/// Ownership check for `POST /servers/control`.
///
/// Buffers the JSON body, resolves the target machine and attaches it as a
/// `ControlTarget` extension. The body is re-attached for the handler.
pub async fn control_gate(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>().cloned() else {
        return unauthorized("authentication required");
    };

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_CONTROL_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Control body unreadable");
            return ApiError(DomainError::Validation("request body unreadable".into()))
                .into_response();
        }
    };
    let payload: ControlRequest = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(e) => {
            return ApiError(DomainError::Validation(format!("invalid JSON: {}", e)))
                .into_response()
        }
    };

    match authorize_control(
        state.servers.as_ref(),
        &user,
        payload.server_id,
        &payload.command,
    )
    .await
    {
        Ok(target) => {
            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(target);
            next.run(request).await
        }
        Err(e) => {
            if matches!(e, DomainError::Forbidden(_)) {
                info!(user_id = %user.id, server_id = payload.server_id, "Control gate denied request");
            }
            ApiError(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_token("Bearer   "), None);
        assert_eq!(extract_token("Basic dXNlcg=="), None);
        assert_eq!(extract_token("abc.def"), None);
    }
}
