//! Process-local revocation store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use common::AppResult;

use super::{revocation_key, token_from_key, RevocationStore};

/// Revocation store kept in memory, expiring entries on the tokio clock.
///
/// Suitable for tests and single-process development runs; revocations are
/// not shared between processes.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<String, Instant>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn put(&self, token: &str, ttl_seconds: u64) -> AppResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, expires_at| *expires_at > now);
        entries.insert(
            revocation_key(token),
            now + Duration::from_secs(ttl_seconds),
        );
        Ok(())
    }

    async fn exists(&self, token: &str) -> AppResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(&revocation_key(token))
            .is_some_and(|expires_at| *expires_at > now))
    }

    async fn list(&self) -> AppResult<Vec<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|(_, expires_at)| **expires_at > now)
            .filter_map(|(key, _)| token_from_key(key))
            .map(str::to_string)
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
