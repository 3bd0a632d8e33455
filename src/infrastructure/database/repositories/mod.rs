//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories.

pub mod server_repository;
pub mod user_repository;

pub use server_repository::SeaOrmServerRepository;
pub use user_repository::SeaOrmUserRepository;

use crate::domain::DomainError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Upstream(format!("Database error: {}", e))
}
