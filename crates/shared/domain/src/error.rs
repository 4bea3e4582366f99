//! Business rule violations, independent of HTTP and storage.

use thiserror::Error;

use crate::constants::{DUPLICATE_IDENTITY_MESSAGE, VALID_ROLES};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Password fails the strength policy; the message names the rule
    #[error("{0}")]
    WeakPassword(String),

    /// Argon2 could not produce a hash
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Username or email already taken. One message for both so callers
    /// cannot tell which.
    #[error("{}", DUPLICATE_IDENTITY_MESSAGE)]
    DuplicateIdentity,

    #[error("Role must be one of: {}", VALID_ROLES.join(", "))]
    UnknownRole(String),
}

impl DomainError {
    pub fn weak_password(msg: impl Into<String>) -> Self {
        DomainError::WeakPassword(msg.into())
    }

    pub fn hashing(msg: impl Into<String>) -> Self {
        DomainError::Hashing(msg.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
