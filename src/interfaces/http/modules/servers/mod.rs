//! Servers module: listing, power/network control, inventory sync

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
