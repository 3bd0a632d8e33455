//! Server (virtual machine) aggregate

pub mod command;
pub mod model;
pub mod repository;

pub use command::{CacheEffect, ControlCommand};
pub use model::{Server, ServerKey, NETWORK_DISCONNECTED, POWER_OFF, POWER_RUNNING};
pub use repository::ServerRepository;
