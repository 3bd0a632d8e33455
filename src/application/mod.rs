//! Application layer: use-cases orchestrating the domain and its ports

pub mod access;
pub mod cache;
pub mod identity;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{authorize_control, require_role, ControlTarget};
pub use cache::{SharedStateCache, StateCache};
pub use identity::{AuthService, SignIn, TokenPair, UserService};
pub use services::{ControlService, InventoryConfig, InventoryService, Scheduler};
