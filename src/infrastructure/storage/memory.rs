//! In-memory storage implementation

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{
    DomainError, DomainResult, RefreshTokenRepository, Server, ServerKey, ServerRepository, User,
    UserRepository, UserRole,
};

/// In-memory store for development and testing
pub struct InMemoryStore {
    users: DashMap<String, User>,
    /// email -> user id
    emails: DashMap<String, String>,
    servers: DashMap<i64, Server>,
    server_keys: DashMap<ServerKey, i64>,
    /// user id -> owned server ids
    ownership: DashMap<String, Vec<i64>>,
    /// user id -> current refresh token
    refresh_tokens: DashMap<String, String>,
    server_counter: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            servers: DashMap::new(),
            server_keys: DashMap::new(),
            ownership: DashMap::new(),
            refresh_tokens: DashMap::new(),
            server_counter: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: User) -> DomainResult<User> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(DomainError::Conflict(format!(
                    "user with email '{}' already exists",
                    user.email
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<User> {
        self.users
            .get(id)
            .map(|u| u.clone())
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<User> {
        self.emails
            .get(email)
            .and_then(|id| self.users.get(id.value()).map(|u| u.clone()))
            .ok_or_else(|| DomainError::not_found("User", "email", email))
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn update_user(
        &self,
        id: &str,
        name: &str,
        company: &str,
        role: UserRole,
        password_hash: Option<&str>,
    ) -> DomainResult<()> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("User", "id", id))?;
        user.name = name.to_string();
        user.company = company.to_string();
        user.role = role;
        if let Some(hash) = password_hash {
            user.password_hash = hash.to_string();
        }
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let (_, user) = self
            .users
            .remove(id)
            .ok_or_else(|| DomainError::not_found("User", "id", id))?;
        self.emails.remove(&user.email);
        self.ownership.remove(id);
        self.refresh_tokens.remove(id);
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryStore {
    async fn upsert_refresh_token(&self, user_id: &str, token: &str) -> DomainResult<()> {
        self.refresh_tokens
            .insert(user_id.to_string(), token.to_string());
        Ok(())
    }

    async fn get_refresh_token(&self, user_id: &str) -> DomainResult<Option<String>> {
        Ok(self.refresh_tokens.get(user_id).map(|t| t.clone()))
    }

    async fn find_refresh_token_owner(&self, token: &str) -> DomainResult<Option<String>> {
        Ok(self
            .refresh_tokens
            .iter()
            .find(|entry| entry.value() == token)
            .map(|entry| entry.key().clone()))
    }
}

#[async_trait]
impl ServerRepository for InMemoryStore {
    async fn get_server(&self, id: i64) -> DomainResult<Server> {
        self.servers
            .get(&id)
            .map(|s| s.clone())
            .ok_or_else(|| DomainError::not_found("Server", "id", id))
    }

    async fn list_servers(&self) -> DomainResult<Vec<Server>> {
        let mut servers: Vec<Server> = self.servers.iter().map(|s| s.clone()).collect();
        servers.sort_by_key(|s| s.id);
        Ok(servers)
    }

    async fn list_servers_for_user(&self, user_id: &str) -> DomainResult<Vec<Server>> {
        let ids = self
            .ownership
            .get(user_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        let mut servers: Vec<Server> = ids
            .iter()
            .filter_map(|id| self.servers.get(id).map(|s| s.clone()))
            .collect();
        servers.sort_by_key(|s| s.id);
        Ok(servers)
    }

    /// Insert new machines, refresh live fields of known ones. Metadata of
    /// known machines (ip, company, description) is kept.
    async fn upsert_servers(&self, servers: &[Server]) -> DomainResult<usize> {
        for server in servers {
            match self.server_keys.entry(server.key()) {
                Entry::Occupied(slot) => {
                    if let Some(mut stored) = self.servers.get_mut(slot.get()) {
                        stored.vm_id = server.vm_id.clone();
                        stored.state = server.state.clone();
                        stored.network = server.network.clone();
                    }
                }
                Entry::Vacant(slot) => {
                    let id = self.server_counter.fetch_add(1, Ordering::SeqCst);
                    slot.insert(id);
                    self.servers.insert(
                        id,
                        Server {
                            id,
                            ..server.clone()
                        },
                    );
                }
            }
        }
        Ok(servers.len())
    }

    async fn set_user_servers(&self, user_id: &str, server_ids: &[i64]) -> DomainResult<()> {
        if !self.users.contains_key(user_id) {
            return Err(DomainError::not_found("User", "id", user_id));
        }
        let mut ids = Vec::with_capacity(server_ids.len());
        for id in server_ids {
            if !self.servers.contains_key(id) {
                return Err(DomainError::not_found("Server", "id", id));
            }
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        self.ownership.insert(user_id.to_string(), ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            name: id.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    fn server(name: &str, hv: &str) -> Server {
        Server {
            vm_id: format!("{}-vm", name),
            name: name.into(),
            hv: hv.into(),
            ip: "10.0.0.1".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryStore::new();
        store.create_user(user("u1", "a@x.io")).await.unwrap();
        let err = store.create_user(user("u2", "a@x.io")).await.unwrap_err();
        assert_eq!(err.kind(), "conflict");
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let store = InMemoryStore::new();
        assert!(store.get_user_by_id("nope").await.unwrap_err().is_not_found());
        assert!(store.get_user_by_email("n@x.io").await.unwrap_err().is_not_found());
        assert!(store.get_server(42).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_refresh_token_upsert_replaces() {
        let store = InMemoryStore::new();
        store.upsert_refresh_token("u1", "t1").await.unwrap();
        store.upsert_refresh_token("u1", "t2").await.unwrap();

        assert_eq!(store.get_refresh_token("u1").await.unwrap().as_deref(), Some("t2"));
        assert_eq!(store.find_refresh_token_owner("t1").await.unwrap(), None);
        assert_eq!(
            store.find_refresh_token_owner("t2").await.unwrap().as_deref(),
            Some("u1")
        );
    }

    #[tokio::test]
    async fn test_upsert_servers_keeps_metadata() {
        let store = InMemoryStore::new();
        store.upsert_servers(&[server("web01", "hv-a")]).await.unwrap();

        let mut live = server("web01", "hv-a");
        live.ip = String::new();
        live.state = "Off".into();
        store.upsert_servers(&[live, server("db01", "hv-a")]).await.unwrap();

        let all = store.list_servers().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, 1);
        assert_eq!(all[0].ip, "10.0.0.1");
        assert_eq!(all[0].state, "Off");
        assert_eq!(all[1].id, 2);
    }

    #[tokio::test]
    async fn test_set_user_servers_replaces_ownership() {
        let store = InMemoryStore::new();
        store.create_user(user("u1", "a@x.io")).await.unwrap();
        store
            .upsert_servers(&[server("a", "hv"), server("b", "hv")])
            .await
            .unwrap();

        store.set_user_servers("u1", &[1, 2, 1]).await.unwrap();
        assert_eq!(store.list_servers_for_user("u1").await.unwrap().len(), 2);

        store.set_user_servers("u1", &[2]).await.unwrap();
        let owned = store.list_servers_for_user("u1").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name, "b");

        assert!(store.set_user_servers("u1", &[9]).await.unwrap_err().is_not_found());
        assert!(store.set_user_servers("ghost", &[1]).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_user_frees_email() {
        let store = InMemoryStore::new();
        store.create_user(user("u1", "a@x.io")).await.unwrap();
        store.upsert_refresh_token("u1", "t").await.unwrap();

        store.delete_user("u1").await.unwrap();

        assert!(store.get_refresh_token("u1").await.unwrap().is_none());
        store.create_user(user("u2", "a@x.io")).await.unwrap();
    }
}
