//! Token service: sign-in, access/refresh issuing, validation and rotation
//!
//! A user has at most one live refresh token, the one persisted in the
//! store. Presenting it rotates it; presenting any older one fails.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    DomainError, DomainResult, RefreshTokenRepository, User, UserRepository, UserRole,
};
use crate::infrastructure::crypto::jwt::{create_token, verify_token, JwtConfig, TokenSubject};
use crate::infrastructure::crypto::password::verify_password;

const INVALID_CREDENTIALS: &str = "invalid email or password";
const INVALID_TOKEN: &str = "invalid or expired token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful sign-in or refresh
#[derive(Debug, Clone)]
pub struct SignIn {
    pub tokens: TokenPair,
    pub user: User,
}

impl SignIn {
    pub fn role(&self) -> UserRole {
        self.user.role
    }
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    jwt_config: JwtConfig,
    /// Serializes refresh rotation per user id.
    rotation_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        jwt_config: JwtConfig,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt_config,
            rotation_locks: DashMap::new(),
        }
    }

    /// Authenticate by email and password and issue a fresh token pair.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn sign_in(&self, email: &str, password: &str) -> DomainResult<SignIn> {
        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return Err(DomainError::Validation(
                "email and password are required".into(),
            ));
        }

        let user = match self.users.get_user_by_email(email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                debug!(email, "Sign-in for unknown email");
                return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
            }
            Err(e) => return Err(e),
        };

        if !verify_password(password, &user.password_hash).unwrap_or(false) {
            debug!(user_id = %user.id, "Sign-in with wrong password");
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let tokens = self.issue_pair(&user).await?;
        info!(user_id = %user.id, role = %user.role, "User signed in");
        Ok(SignIn {
            tokens,
            user: user.without_password(),
        })
    }

    /// Short-lived token carrying the user snapshot.
    pub fn issue_access(&self, user: &User) -> DomainResult<String> {
        self.sign(user, TokenSubject::Access)
    }

    /// Long-lived token; persisting it invalidates the user's previous one.
    pub async fn issue_refresh(&self, user: &User) -> DomainResult<String> {
        let token = self.sign(user, TokenSubject::Refresh)?;
        self.refresh_tokens
            .upsert_refresh_token(&user.id, &token)
            .await?;
        Ok(token)
    }

    /// Check signature, issuer, expiry and kind; return the embedded user.
    pub fn validate(&self, token: &str, expected: TokenSubject) -> DomainResult<User> {
        let claims = verify_token(token, &self.jwt_config).map_err(|e| {
            debug!(error = %e, "Token rejected");
            DomainError::Unauthorized(INVALID_TOKEN.into())
        })?;
        if claims.sub != expected {
            debug!(expected = %expected, actual = %claims.sub, "Token of wrong kind");
            return Err(DomainError::Unauthorized(INVALID_TOKEN.into()));
        }
        Ok(claims.user)
    }

    /// Exchange a refresh token for a new pair, invalidating the presented one.
    ///
    /// Concurrent calls with the same token: exactly one succeeds.
    pub async fn refresh(&self, token: &str) -> DomainResult<SignIn> {
        let result = self.rotate(token).await;
        let outcome = if result.is_ok() { "ok" } else { "rejected" };
        metrics::counter!("wvmc_token_refresh_total", "outcome" => outcome).increment(1);
        result
    }

    async fn rotate(&self, token: &str) -> DomainResult<SignIn> {
        let Some(owner) = self.refresh_tokens.find_refresh_token_owner(token).await? else {
            warn!("refresh token already used");
            return Err(DomainError::Unauthorized(INVALID_TOKEN.into()));
        };

        let lock = self.rotation_lock(&owner);
        let result = {
            let _guard = lock.lock().await;
            self.rotate_owned(&owner, token).await
        };
        drop(lock);
        // Drop the entry once no rotation holds it.
        self.rotation_locks
            .remove_if(&owner, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Runs under the owner's rotation lock.
    async fn rotate_owned(&self, owner: &str, token: &str) -> DomainResult<SignIn> {
        let current = self.refresh_tokens.get_refresh_token(owner).await?;
        if current.as_deref() != Some(token) {
            warn!(user_id = %owner, "refresh token already used");
            return Err(DomainError::Unauthorized(INVALID_TOKEN.into()));
        }

        let embedded = self.validate(token, TokenSubject::Refresh)?;
        if embedded.id != owner {
            warn!(user_id = %owner, "Refresh token owner mismatch");
            return Err(DomainError::Unauthorized(INVALID_TOKEN.into()));
        }

        // New tokens carry the stored user, so role edits apply on rotation.
        let user = match self.users.get_user_by_id(owner).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                return Err(DomainError::Unauthorized(INVALID_TOKEN.into()))
            }
            Err(e) => return Err(e),
        };

        let tokens = self.issue_pair(&user).await?;
        debug!(user_id = %owner, "Refresh token rotated");
        Ok(SignIn {
            tokens,
            user: user.without_password(),
        })
    }

    async fn issue_pair(&self, user: &User) -> DomainResult<TokenPair> {
        let access_token = self.issue_access(user)?;
        let refresh_token = self.issue_refresh(user).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn sign(&self, user: &User, subject: TokenSubject) -> DomainResult<String> {
        create_token(user, subject, &self.jwt_config)
            .map_err(|e| DomainError::Upstream(format!("failed to sign {} token: {}", subject, e)))
    }

    fn rotation_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.rotation_locks
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }
}
