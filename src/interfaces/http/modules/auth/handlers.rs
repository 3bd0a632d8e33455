//! Authentication API handlers

use axum::{extract::State, Extension};

use super::dto::{RefreshRequest, SignInRequest, TokenResponse, UserInfo};
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::CurrentUser;
use crate::interfaces::http::router::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    tag = "Authentication",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> ApiResult<TokenResponse> {
    let sign_in = state.auth.sign_in(&request.email, &request.password).await?;
    ok(sign_in.into())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Refresh token invalid, expired or already used")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> ApiResult<TokenResponse> {
    let rotated = state.auth.refresh(&request.refresh_token).await?;
    ok(rotated.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Caller as embedded in the access token", body = ApiResponse<UserInfo>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ApiResult<UserInfo> {
    ok(UserInfo::from(&user))
}
