//! HTTP handlers.

pub mod auth_handler;
pub mod health_handler;
pub mod user_handler;

pub use auth_handler::{admin_auth_routes, public_auth_routes, session_auth_routes};
pub use health_handler::health_routes;
pub use user_handler::{admin_user_routes, member_user_routes};
