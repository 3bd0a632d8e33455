//! Authentication module: sign-in, token refresh, current user

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
