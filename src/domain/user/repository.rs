use async_trait::async_trait;

use super::{User, UserRole};
use crate::domain::DomainResult;

/// Persistence port for user accounts.
///
/// Lookups return `DomainError::NotFound` when the user does not exist.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; `user.id` and `user.password_hash` must already be set.
    async fn create_user(&self, user: User) -> DomainResult<User>;

    async fn get_user_by_id(&self, id: &str) -> DomainResult<User>;
    async fn get_user_by_email(&self, email: &str) -> DomainResult<User>;
    async fn list_users(&self) -> DomainResult<Vec<User>>;

    /// Update profile fields, and the password hash when `password_hash` is `Some`.
    async fn update_user(
        &self,
        id: &str,
        name: &str,
        company: &str,
        role: UserRole,
        password_hash: Option<&str>,
    ) -> DomainResult<()>;

    async fn delete_user(&self, id: &str) -> DomainResult<()>;
}

/// Persistence port for the single active refresh token of each user.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Store `token` as the user's refresh token, replacing any previous one.
    async fn upsert_refresh_token(&self, user_id: &str, token: &str) -> DomainResult<()>;

    /// Currently persisted refresh token of a user, if any.
    async fn get_refresh_token(&self, user_id: &str) -> DomainResult<Option<String>>;

    /// Owner of a persisted refresh token, if the token is current.
    async fn find_refresh_token_owner(&self, token: &str) -> DomainResult<Option<String>>;
}
