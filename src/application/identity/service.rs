//! User management service
//!
//! Admin-only use-cases: user CRUD and server assignment.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{
    DomainError, DomainResult, NewUser, Server, ServerRepository, User, UserEdit, UserRepository,
};
use crate::infrastructure::crypto::password::hash_password_with_cost;

pub const MIN_PASSWORD_LEN: usize = 6;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    servers: Arc<dyn ServerRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        servers: Arc<dyn ServerRepository>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            servers,
            bcrypt_cost,
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn list_users(&self) -> DomainResult<Vec<User>> {
        self.users.list_users().await
    }

    pub async fn get_user(&self, id: &str) -> DomainResult<User> {
        self.users.get_user_by_id(id).await
    }

    /// Servers assigned to the user.
    pub async fn user_servers(&self, id: &str) -> DomainResult<Vec<Server>> {
        self.users.get_user_by_id(id).await?;
        self.servers.list_servers_for_user(id).await
    }

    // ── Commands ────────────────────────────────────────────────

    pub async fn create_user(&self, new: NewUser) -> DomainResult<User> {
        let name = new.name.trim();
        let email = new.email.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("name is required".into()));
        }
        if !email.contains('@') {
            return Err(DomainError::Validation("invalid email address".into()));
        }
        check_password(&new.password)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            company: new.company.trim().to_string(),
            role: new.role,
            password_hash: self.hash(&new.password)?,
        };
        let user = self.users.create_user(user).await?;

        info!(user_id = %user.id, email = %user.email, role = %user.role, "User created");
        Ok(user)
    }

    /// Create the user unless the email is already taken. Returns whether it was created.
    pub async fn ensure_user(&self, new: NewUser) -> DomainResult<bool> {
        match self.users.get_user_by_email(new.email.trim()).await {
            Ok(_) => Ok(false),
            Err(e) if e.is_not_found() => match self.create_user(new).await {
                Ok(_) => Ok(true),
                // Lost a race with a concurrent creator.
                Err(DomainError::Conflict(_)) => Ok(false),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    pub async fn edit_user(&self, id: &str, edit: UserEdit) -> DomainResult<User> {
        self.users.get_user_by_id(id).await?;

        let name = edit.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("name is required".into()));
        }
        let password_hash = match edit.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => {
                check_password(password)?;
                Some(self.hash(password)?)
            }
            None => None,
        };

        self.users
            .update_user(
                id,
                name,
                edit.company.trim(),
                edit.role,
                password_hash.as_deref(),
            )
            .await?;

        info!(user_id = %id, role = %edit.role, password_changed = password_hash.is_some(), "User updated");
        self.users.get_user_by_id(id).await
    }

    pub async fn delete_user(&self, id: &str) -> DomainResult<()> {
        self.users.delete_user(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Replace the user's server assignments.
    pub async fn set_user_servers(&self, id: &str, server_ids: &[i64]) -> DomainResult<()> {
        if server_ids.iter().any(|sid| *sid <= 0) {
            return Err(DomainError::Validation("server ids must be positive".into()));
        }
        self.servers.set_user_servers(id, server_ids).await?;
        info!(user_id = %id, count = server_ids.len(), "User servers replaced");
        Ok(())
    }

    fn hash(&self, password: &str) -> DomainResult<String> {
        hash_password_with_cost(password, self.bcrypt_cost)
            .map_err(|e| DomainError::Upstream(format!("failed to hash password: {}", e)))
    }
}

fn check_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
