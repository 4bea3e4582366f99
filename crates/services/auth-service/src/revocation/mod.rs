//! Revocation store: records tokens that were invalidated before expiry.
//!
//! Entries live under `revoked_token:<token>` and expire on their own once
//! the token could no longer verify anyway.

mod memory;
mod redis_store;

use async_trait::async_trait;

use common::AppResult;
use domain::REVOKED_TOKEN_PREFIX;

pub use self::memory::InMemoryRevocationStore;
pub use self::redis_store::RedisRevocationStore;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Shared key-value store of revoked tokens.
///
/// Errors mean the store could not be reached; callers fail closed.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `token` as revoked for `ttl_seconds`.
    async fn put(&self, token: &str, ttl_seconds: u64) -> AppResult<()>;

    /// Check whether `token` has a live revocation entry.
    async fn exists(&self, token: &str) -> AppResult<bool>;

    /// Raw token strings with a live revocation entry.
    async fn list(&self) -> AppResult<Vec<String>>;

    /// Check connectivity.
    async fn ping(&self) -> AppResult<()>;
}

/// Namespaced key for a token.
pub fn revocation_key(token: &str) -> String {
    format!("{}{}", REVOKED_TOKEN_PREFIX, token)
}

/// Strip the namespace from a stored key.
fn token_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(REVOKED_TOKEN_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespace() {
        assert_eq!(revocation_key("abc.def"), "revoked_token:abc.def");
        assert_eq!(token_from_key("revoked_token:abc.def"), Some("abc.def"));
        assert_eq!(token_from_key("rate_limit:abc"), None);
    }
}
