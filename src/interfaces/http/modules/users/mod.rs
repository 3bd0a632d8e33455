//! Users module: admin-only account and server assignment management

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
