//! User management API handlers
//!
//! Admin-only endpoints; the role gate runs before any of these.
//! Delegates to `UserService` from the application/identity layer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::dto::{
    parse_role, CreateUserRequest, DeletedResponse, SetServersRequest, UpdateUserRequest,
};
use crate::domain::{NewUser, UserEdit};
use crate::interfaces::http::common::{ok, ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::modules::auth::UserInfo;
use crate::interfaces::http::modules::servers::ServerDto;
use crate::interfaces::http::router::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users ordered by email", body = ApiResponse<Vec<UserInfo>>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserInfo>> {
    let users = state.users.list_users().await?;
    ok(users.iter().map(UserInfo::from).collect())
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserInfo>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ApiError> {
    let role = parse_role(&request.role)?;
    let user = state
        .users
        .create_user(NewUser {
            name: request.name,
            email: request.email,
            company: request.company,
            role,
            password: request.password,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserInfo::from(&user))),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserInfo>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<UserInfo> {
    let current = state.users.get_user(&id).await?;
    let role = match request.role.as_deref() {
        Some(role) => parse_role(role)?,
        None => current.role,
    };
    let edit = UserEdit {
        name: request.name.unwrap_or(current.name),
        company: request.company.unwrap_or(current.company),
        role,
        password: request.password,
    };
    let user = state.users.edit_user(&id, edit).await?;
    ok(UserInfo::from(&user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<DeletedResponse>),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    state.users.delete_user(&id).await?;
    ok(DeletedResponse { id })
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/servers",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Servers assigned to the user", body = ApiResponse<Vec<ServerDto>>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_servers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ServerDto>> {
    let servers = state.users.user_servers(&id).await?;
    ok(servers.into_iter().map(ServerDto::from).collect())
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/servers",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = SetServersRequest,
    responses(
        (status = 200, description = "Assignments replaced", body = ApiResponse<Vec<ServerDto>>),
        (status = 400, description = "Invalid server id"),
        (status = 404, description = "User or server not found")
    )
)]
pub async fn set_user_servers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<SetServersRequest>,
) -> ApiResult<Vec<ServerDto>> {
    state.users.set_user_servers(&id, &request.server_ids).await?;
    let servers = state.users.user_servers(&id).await?;
    ok(servers.into_iter().map(ServerDto::from).collect())
}
