//! Middleware for authentication, authorization and rate limiting.

mod auth;
mod rate_limit;

pub use auth::{auth_middleware, require_role, BearerToken, CurrentUser, RoleGate};
pub use rate_limit::{rate_limit_auth_middleware, rate_limit_middleware, RateLimiter};
