//! # WVMC
//!
//! Control plane for Hyper-V virtual machines: sign-in with rotating refresh
//! tokens, role and ownership checks, a live state cache refreshed in the
//! background, and power/network commands dispatched to the hosts.
//!
//! ## Architecture
//!
//! - **domain**: entities, error taxonomy and the ports the core depends on
//! - **application**: token service, access policy, state cache, scheduler,
//!   command dispatcher, inventory and user management
//! - **infrastructure**: sea-orm and in-memory stores, JWT/bcrypt, the
//!   PowerShell executor and the notification webhook
//! - **interfaces**: REST API (axum) with its authorization middleware
//! - **server**: runtime wiring and lifecycle

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, ConfigError};
pub use infrastructure::{init_database, DatabaseConfig, Stores};
pub use interfaces::http::{create_api_router, AppState};
pub use server::{build_scheduler, build_state, ServerHandle, ServerOptions};
