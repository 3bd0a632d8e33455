//! Authorization policy shared by the HTTP middleware
//!
//! Role checks and the ownership check for control requests. Kept free of
//! HTTP types so the rules can be tested directly against a store.

use tracing::debug;

use crate::domain::{DomainError, DomainResult, Server, ServerRepository, User, UserRole};

/// A control request that passed the ownership check
#[derive(Debug, Clone)]
pub struct ControlTarget {
    pub server: Server,
    pub command: String,
}

/// Fail with `Forbidden` unless the user's role is in `allowed`.
pub fn require_role(user: &User, allowed: &[UserRole]) -> DomainResult<()> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    debug!(user_id = %user.id, role = %user.role, "Role not permitted");
    Err(DomainError::Forbidden("insufficient role".into()))
}

/// Decide whether `user` may run `command` against server `server_id`.
///
/// Admins may target any existing server. Everyone else must own it; a
/// server they do not own and a server that does not exist look the same.
pub async fn authorize_control(
    servers: &dyn ServerRepository,
    user: &User,
    server_id: i64,
    command: &str,
) -> DomainResult<ControlTarget> {
    let command = command.trim();
    if server_id <= 0 || command.is_empty() {
        return Err(DomainError::Validation(
            "server_id and command are required".into(),
        ));
    }

    if user.is_admin() {
        let server = servers.get_server(server_id).await?;
        return Ok(ControlTarget {
            server,
            command: command.to_string(),
        });
    }

    let owned = servers.list_servers_for_user(&user.id).await?;
    match owned.into_iter().find(|s| s.id == server_id) {
        Some(server) => Ok(ControlTarget {
            server,
            command: command.to_string(),
        }),
        None => {
            debug!(user_id = %user.id, server_id, "Control denied: server not owned");
            Err(DomainError::Forbidden(
                "you do not have access to this server".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::UserRepository;
    use crate::infrastructure::storage::InMemoryStore;

    async fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store
            .create_user(User {
                id: "u-1".into(),
                email: "u@x.io".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .upsert_servers(&[
                Server {
                    name: "mine".into(),
                    hv: "hv".into(),
                    ..Default::default()
                },
                Server {
                    name: "theirs".into(),
                    hv: "hv".into(),
                    ..Default::default()
                },
            ])
            .await
            .unwrap();
        store.set_user_servers("u-1", &[1]).await.unwrap();
        store
    }

    fn user(role: UserRole) -> User {
        User {
            id: "u-1".into(),
            role,
            ..Default::default()
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&user(UserRole::Admin), &[UserRole::Admin]).is_ok());
        let err = require_role(&user(UserRole::User), &[UserRole::Admin]).unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert!(require_role(&user(UserRole::User), &[UserRole::User, UserRole::Admin]).is_ok());
    }

    #[tokio::test]
    async fn test_missing_fields_are_validation_errors() {
        let store = store().await;
        for (id, cmd) in [(0, "stop_power"), (1, "  "), (-3, "stop_power")] {
            let err = authorize_control(store.as_ref(), &user(UserRole::Admin), id, cmd)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "validation");
        }
    }

    #[tokio::test]
    async fn test_owner_passes() {
        let store = store().await;
        let target = authorize_control(store.as_ref(), &user(UserRole::User), 1, "stop_power")
            .await
            .unwrap();
        assert_eq!(target.server.name, "mine");
        assert_eq!(target.command, "stop_power");
    }

    #[tokio::test]
    async fn test_non_owner_forbidden_even_if_missing() {
        let store = store().await;
        let other = authorize_control(store.as_ref(), &user(UserRole::User), 2, "stop_power")
            .await
            .unwrap_err();
        let missing = authorize_control(store.as_ref(), &user(UserRole::User), 99, "stop_power")
            .await
            .unwrap_err();
        assert_eq!(other.kind(), "forbidden");
        assert_eq!(missing.kind(), "forbidden");
    }

    #[tokio::test]
    async fn test_admin_any_server_but_not_missing() {
        let store = store().await;
        let target = authorize_control(store.as_ref(), &user(UserRole::Admin), 2, "start_power")
            .await
            .unwrap();
        assert_eq!(target.server.name, "theirs");

        let err = authorize_control(store.as_ref(), &user(UserRole::Admin), 99, "start_power")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
