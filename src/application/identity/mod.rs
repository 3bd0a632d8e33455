//! Identity: authentication and user management
//!
//! `AuthService` owns the token lifecycle (sign-in, refresh rotation).
//! `UserService` covers the admin use-cases: user CRUD and server assignment.

pub mod auth;
pub mod service;

pub use auth::{AuthService, SignIn, TokenPair};
pub use service::{UserService, MIN_PASSWORD_LEN};
