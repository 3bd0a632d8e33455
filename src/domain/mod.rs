//! Domain layer: entities, errors and the ports the application depends on.

pub mod error;
pub mod ports;
pub mod server;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use ports::{HypervisorExecutor, NotificationSink};
pub use server::{
    CacheEffect, ControlCommand, Server, ServerKey, ServerRepository, NETWORK_DISCONNECTED,
    POWER_OFF, POWER_RUNNING,
};
pub use user::{NewUser, RefreshTokenRepository, User, UserEdit, UserRepository, UserRole};
