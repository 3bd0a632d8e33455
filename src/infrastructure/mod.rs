//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod hypervisor;
pub mod notifier;
pub mod storage;
pub mod stores;

pub use database::{init_database, DatabaseConfig};
pub use hypervisor::PowerShellExecutor;
pub use notifier::{NoopNotifier, WebhookNotifier};
pub use storage::InMemoryStore;
pub use stores::Stores;
