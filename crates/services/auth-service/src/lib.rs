//! Auth Service Library
//!
//! Token issuance and verification, the revocation store, and the
//! authentication flow (register, login, refresh, logout and the password
//! reset/change operations). The user directory comes from `user-service`.

pub mod config;
pub mod revocation;
pub mod service;
pub mod token;

pub use config::AuthServiceConfig;
pub use revocation::{InMemoryRevocationStore, RedisRevocationStore, RevocationStore};
pub use service::{
    AccountUpdate, AuthService, Authenticator, Identity, RegisterInput, TokenPair,
};
pub use token::{AccessClaims, RefreshClaims, TokenService};
