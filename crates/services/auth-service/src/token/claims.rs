//! Signed token payloads.

use serde::{Deserialize, Serialize};

/// Access token claims. Password reset tokens use the same shape with
/// `role = "reset"` and the email as subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Username (email for reset tokens)
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique token ID; keeps token strings distinct within one second
    pub jti: String,
}

/// Refresh token claims. Never carries a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Just enough of any token to compute its remaining lifetime.
#[derive(Debug, Deserialize)]
pub(crate) struct ExpiryClaim {
    pub exp: i64,
}
