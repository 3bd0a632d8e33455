//! SQLite persistence through sea-orm

pub mod entities;
pub mod migrator;
pub mod repositories;

pub use repositories::{SeaOrmServerRepository, SeaOrmUserRepository};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

/// Connection settings, built from `[database]` in the config file.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// e.g. `sqlite://./wvmc.db?mode=rwc`
    pub url: String,
}

/// Initialize database connection
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    info!("Connecting to database: {}", config.url);
    let mut options = ConnectOptions::new(config.url.clone());
    options.sqlx_logging(false);
    // Every in-memory SQLite connection is its own database.
    if config.url.contains(":memory:") {
        options.max_connections(1);
    }
    let db = Database::connect(options).await?;
    info!("Database connected successfully");
    Ok(db)
}
