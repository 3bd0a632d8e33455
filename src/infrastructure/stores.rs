//! Repository bundle handed to the application services

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::{RefreshTokenRepository, ServerRepository, UserRepository};

use super::database::{SeaOrmServerRepository, SeaOrmUserRepository};
use super::storage::InMemoryStore;

#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub servers: Arc<dyn ServerRepository>,
}

impl Stores {
    /// Process-local store; contents are lost on exit.
    pub fn memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            refresh_tokens: store.clone(),
            servers: store,
        }
    }

    pub fn sea_orm(db: DatabaseConnection) -> Self {
        let users = Arc::new(SeaOrmUserRepository::new(db.clone()));
        Self {
            users: users.clone(),
            refresh_tokens: users,
            servers: Arc::new(SeaOrmServerRepository::new(db)),
        }
    }
}
