//! Database entities module

pub mod refresh_token;
pub mod server;
pub mod user;
pub mod user_server;

pub use refresh_token::Entity as RefreshToken;
pub use server::Entity as Server;
pub use user::Entity as User;
pub use user_server::Entity as UserServer;
