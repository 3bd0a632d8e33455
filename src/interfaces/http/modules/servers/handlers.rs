//! Server listing and control handlers

use axum::{extract::State, Extension};

use super::dto::{ControlRequest, ControlResponse, ServerDto, SyncResponse};
use crate::application::ControlTarget;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult};
use crate::interfaces::http::middleware::CurrentUser;
use crate::interfaces::http::router::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/servers",
    tag = "Servers",
    responses(
        (status = 200, description = "Machines visible to the caller, with live state", body = ApiResponse<Vec<ServerDto>>),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Hosts or store unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_servers(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Vec<ServerDto>> {
    let servers = state.inventory.servers_for(&user).await?;
    ok(servers.into_iter().map(ServerDto::from).collect())
}

/// The control gate has already resolved and authorized the target; the
/// body is only documented here.
#[utoipa::path(
    post,
    path = "/api/v1/servers/control",
    tag = "Servers",
    request_body = ControlRequest,
    responses(
        (status = 200, description = "Command executed", body = ApiResponse<ControlResponse>),
        (status = 400, description = "Malformed body or unknown command"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller does not own the server"),
        (status = 404, description = "Server does not exist (admins only)"),
        (status = 500, description = "Host rejected the instruction")
    ),
    security(("bearer_auth" = []))
)]
pub async fn control_server(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(target): Extension<ControlTarget>,
) -> ApiResult<ControlResponse> {
    let command = state
        .control
        .execute(&user, &target.server, &target.command)
        .await?;
    ok(ControlResponse {
        server_id: target.server.id,
        name: target.server.name,
        hv: target.server.hv,
        command: command.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/servers/sync",
    tag = "Servers",
    responses(
        (status = 200, description = "Host inventory written to the store", body = ApiResponse<SyncResponse>),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Hosts or store unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn sync_servers(State(state): State<AppState>) -> ApiResult<SyncResponse> {
    let synced = state.inventory.sync_store().await?;
    ok(SyncResponse { synced })
}
