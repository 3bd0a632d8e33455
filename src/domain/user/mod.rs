//! User aggregate
//!
//! Contains the User entity, input types, and repository interfaces.

pub mod model;
pub mod repository;

pub use model::{NewUser, User, UserEdit, UserRole};
pub use repository::{RefreshTokenRepository, UserRepository};
