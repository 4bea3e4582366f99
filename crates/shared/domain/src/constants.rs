//! Domain-level constants.
//!
//! These constants define business rules, session lifetimes and validation
//! requirements. Deployments override most of them through configuration.

// =============================================================================
// User Roles
// =============================================================================

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

/// Regular customer role, assigned to self-registered users
pub const ROLE_CLIENT: &str = "client";

/// Role tag carried only by password reset tokens
pub const ROLE_RESET: &str = "reset";

/// Role assigned to new users
pub const DEFAULT_ROLE: &str = ROLE_CLIENT;

/// Roles a user record may hold
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_CLIENT];

/// Check if a role value is valid for a user record
pub fn is_valid_role(role: &str) -> bool {
    VALID_ROLES.contains(&role)
}

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum username length requirement
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length requirement
pub const MAX_USERNAME_LENGTH: usize = 64;

// =============================================================================
// Authentication
// =============================================================================

/// Access token lifetime when the role has no entry in the lifetime table
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 15;

/// Refresh token lifetime, independent of role
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 1;

/// Password reset token lifetime
pub const RESET_TOKEN_MINUTES: i64 = 15;

/// Retention for revocations whose remaining lifetime cannot be decoded
pub const REVOCATION_FALLBACK_SECONDS: u64 = 900;

/// Minimum signing secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

/// Token type reported to clients
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// Key namespace for revocation entries
pub const REVOKED_TOKEN_PREFIX: &str = "revoked_token:";

/// Value stored under a revocation key
pub const REVOKED_TOKEN_SENTINEL: &str = "revoked";

/// Seconds per minute (for token expiration calculation)
pub const SECONDS_PER_MINUTE: i64 = 60;

/// Reported for both a taken username and a taken email, in one message
pub const DUPLICATE_IDENTITY_MESSAGE: &str = "A user with that username or email already exists";
