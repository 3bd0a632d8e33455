//! User management DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{DomainError, DomainResult, UserRole};

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "company must be at most 100 characters"))]
    pub company: String,
    /// `user` (default) or `admin`
    #[serde(default = "default_role")]
    pub role: String,
    #[validate(length(min = 6, max = 128, message = "password must be 6-128 characters"))]
    pub password: String,
}

fn default_role() -> String {
    UserRole::User.to_string()
}

/// Partial update; omitted fields keep their current value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 100, message = "company must be at most 100 characters"))]
    pub company: Option<String>,
    pub role: Option<String>,
    /// New password; empty or omitted keeps the current one
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetServersRequest {
    /// Complete set of server ids the user may control
    #[validate(length(max = 1000, message = "at most 1000 servers per user"))]
    pub server_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub id: String,
}

pub(crate) fn parse_role(role: &str) -> DomainResult<UserRole> {
    role.parse::<UserRole>()
        .map_err(|_| DomainError::Validation(format!("role must be 'user' or 'admin', got '{}'", role)))
}
