//! Authentication business logic.

mod auth_service;

pub use auth_service::{
    AccountUpdate, AuthService, Authenticator, Identity, RegisterInput, TokenPair,
};
