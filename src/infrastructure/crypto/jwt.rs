//! JWT Token handling

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::domain::User;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
    /// Issuer claim
    pub issuer: String,
}

impl From<&SecurityConfig> for JwtConfig {
    fn from(security: &SecurityConfig) -> Self {
        Self {
            secret: security.token_secret.clone(),
            access_ttl_secs: security.access_ttl_secs,
            refresh_ttl_secs: security.refresh_ttl_secs,
            issuer: security.issuer.clone(),
        }
    }
}

impl JwtConfig {
    fn ttl(&self, subject: TokenSubject) -> Duration {
        let secs = match subject {
            TokenSubject::Access => self.access_ttl_secs,
            TokenSubject::Refresh => self.refresh_ttl_secs,
        };
        Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
    }
}

/// Which of the two token kinds a JWT is. Carried in `sub`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSubject {
    Access,
    Refresh,
}

impl fmt::Display for TokenSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT TokenClaims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Token kind
    pub sub: TokenSubject,
    /// Snapshot of the user at issue time (no password hash)
    pub user: User,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Unique token id
    pub jti: String,
}

impl TokenClaims {
    pub fn new(user: &User, subject: TokenSubject, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + config.ttl(subject);

        Self {
            sub: subject,
            user: user.without_password(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Create a signed token of the given kind for a user
pub fn create_token(
    user: &User,
    subject: TokenSubject,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = TokenClaims::new(user, subject, config);

    encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify signature, issuer and expiry, and decode the claims.
///
/// The subject is *not* checked here.
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS512);
    validation.set_issuer(&[&config.issuer]);
    validation.leeway = 0;

    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            access_ttl_secs: 60,
            refresh_ttl_secs: 600,
            issuer: "wvmc-test".into(),
        }
    }

    fn user() -> User {
        User {
            id: "u-1".into(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            company: "ACME".into(),
            role: UserRole::Admin,
            password_hash: "$2b$04$hash".into(),
        }
    }

    #[test]
    fn test_create_and_verify() {
        let token = create_token(&user(), TokenSubject::Access, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();

        assert_eq!(claims.sub, TokenSubject::Access);
        assert_eq!(claims.user, user().without_password());
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_same_second_tokens_differ() {
        let a = create_token(&user(), TokenSubject::Refresh, &config()).unwrap();
        let b = create_token(&user(), TokenSubject::Refresh, &config()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(&user(), TokenSubject::Access, &config()).unwrap();
        let other = JwtConfig {
            secret: "other".into(),
            ..config()
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = create_token(&user(), TokenSubject::Access, &config()).unwrap();
        let other = JwtConfig {
            issuer: "someone-else".into(),
            ..config()
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_expired_rejected() {
        let mut claims = TokenClaims::new(&user(), TokenSubject::Access, &config());
        claims.exp = Utc::now().timestamp() - 5;
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = verify_token(&token, &config()).unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = TokenClaims::new(&user(), TokenSubject::Access, &config());
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(verify_token(&token, &config()).is_err());
    }
}
