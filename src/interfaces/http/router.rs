//! API router and OpenAPI document

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::application::{
    AuthService, ControlService, InventoryService, SharedStateCache, UserService,
};
use crate::domain::ServerRepository;

use super::common::EmptyData;
use super::middleware::{auth_middleware, control_gate, role_gate, ADMIN_ONLY};
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::request_id::request_id_middleware;
use super::modules::{auth, health, servers, users};

/// Shared state of every route. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub control: Arc<ControlService>,
    pub inventory: Arc<InventoryService>,
    /// Used by the control gate to resolve targets.
    pub servers: Arc<dyn ServerRepository>,
    pub cache: SharedStateCache,
    pub started_at: Instant,
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token from /api/v1/auth/signin"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signin,
        auth::refresh,
        auth::me,
        servers::list_servers,
        servers::control_server,
        servers::sync_servers,
        users::list_users,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::get_user_servers,
        users::set_user_servers,
    ),
    components(
        schemas(
            EmptyData,
            health::HealthResponse,
            auth::SignInRequest,
            auth::RefreshRequest,
            auth::TokenResponse,
            auth::UserInfo,
            servers::ServerDto,
            servers::ControlRequest,
            servers::ControlResponse,
            servers::SyncResponse,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            users::SetServersRequest,
            users::DeletedResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Authentication", description = "Sign-in and refresh token rotation"),
        (name = "Servers", description = "Virtual machines: live state, power and network control, inventory sync"),
        (name = "Users", description = "Admin-only account and server assignment management"),
    ),
    info(
        title = "WVMC API",
        version = "1.0.0",
        description = "Control plane for Hyper-V virtual machines",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full router.
///
/// `/metrics` is mounted only when a Prometheus handle is given.
pub fn create_api_router(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api-doc/openapi.json", get(openapi_json))
        .route("/api/v1/auth/signin", post(auth::signin))
        .route("/api/v1/auth/refresh", post(auth::refresh));

    // Any authenticated caller; control additionally passes the ownership gate
    let control_routes = Router::new()
        .route("/api/v1/servers/control", post(servers::control_server))
        .route_layer(middleware::from_fn_with_state(state.clone(), control_gate));
    let user_routes = Router::new()
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/servers", get(servers::list_servers))
        .merge(control_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin only
    let admin_routes = Router::new()
        .route("/api/v1/servers/sync", post(servers::sync_servers))
        .route(
            "/api/v1/users",
            get(users::list_users).post(users::create_user),
        )
        .route(
            "/api/v1/users/{id}",
            patch(users::update_user).delete(users::delete_user),
        )
        .route(
            "/api/v1/users/{id}/servers",
            get(users::get_user_servers).put(users::set_user_servers),
        )
        .route_layer(middleware::from_fn_with_state(ADMIN_ONLY, role_gate))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mut router = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes);

    if let Some(handle) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(prometheus_metrics))
                .with_state::<AppState>(MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/auth/signin",
            "/api/v1/auth/refresh",
            "/api/v1/auth/me",
            "/api/v1/servers",
            "/api/v1/servers/control",
            "/api/v1/servers/sync",
            "/api/v1/users",
            "/api/v1/users/{id}",
            "/api/v1/users/{id}/servers",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
