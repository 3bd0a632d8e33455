use async_trait::async_trait;

use super::Server;
use crate::domain::DomainResult;

/// Persistence port for machine identity, metadata and ownership.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Returns `DomainError::NotFound` when no server has this id.
    async fn get_server(&self, id: i64) -> DomainResult<Server>;

    async fn list_servers(&self) -> DomainResult<Vec<Server>>;

    /// Servers assigned to a user; empty when the user owns none.
    async fn list_servers_for_user(&self, user_id: &str) -> DomainResult<Vec<Server>>;

    /// Insert or update records matched by (name, hv). Volatile fields are ignored.
    async fn upsert_servers(&self, servers: &[Server]) -> DomainResult<usize>;

    /// Replace the full set of servers assigned to a user.
    async fn set_user_servers(&self, user_id: &str, server_ids: &[i64]) -> DomainResult<()>;
}
