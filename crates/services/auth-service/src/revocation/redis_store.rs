//! Redis-backed revocation store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisResult};
use tokio::time::sleep;

use common::{AppError, AppResult, CacheConfig};
use domain::{REVOKED_TOKEN_PREFIX, REVOKED_TOKEN_SENTINEL};

use super::{revocation_key, token_from_key, RevocationStore};

const SCAN_BATCH: usize = 100;

/// Revocation store on a shared Redis instance.
///
/// Each command is attempted up to `retry_attempts` times with a fixed delay;
/// after that the store reports itself unavailable.
#[derive(Clone)]
pub struct RedisRevocationStore {
    connection: ConnectionManager,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl RedisRevocationStore {
    /// Connect to Redis.
    pub async fn connect(config: &CacheConfig) -> AppResult<Self> {
        let client = Client::open(config.url())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!(host = %config.host, port = config.port, "Revocation store connected");

        Ok(Self {
            connection,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn run<T, F, Fut>(&self, operation: &str, command: F) -> AppResult<T>
    where
        F: Fn(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match command(self.connection.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry_attempts => {
                    tracing::warn!(attempt, error = %e, "Revocation store {} failed, retrying", operation);
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        attempts = self.retry_attempts,
                        error = %e,
                        "Revocation store {} failed",
                        operation
                    );
                    return Err(AppError::service_unavailable("revocation store"));
                }
            }
        }
    }
}

/// Collect keys matching `pattern` with a SCAN cursor.
async fn scan_keys(mut conn: ConnectionManager, pattern: String) -> RedisResult<Vec<String>> {
    let mut cursor: u64 = 0;
    let mut keys = Vec::new();
    loop {
        let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(&pattern)
            .arg("COUNT")
            .arg(SCAN_BATCH)
            .query_async(&mut conn)
            .await?;
        keys.extend(batch);
        if next == 0 {
            return Ok(keys);
        }
        cursor = next;
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn put(&self, token: &str, ttl_seconds: u64) -> AppResult<()> {
        let key = revocation_key(token);
        self.run("put", move |mut conn| {
            let key = key.clone();
            async move {
                conn.set_ex::<_, _, ()>(key, REVOKED_TOKEN_SENTINEL, ttl_seconds)
                    .await
            }
        })
        .await
    }

    async fn exists(&self, token: &str) -> AppResult<bool> {
        let key = revocation_key(token);
        self.run("exists", move |mut conn| {
            let key = key.clone();
            async move { conn.exists::<_, bool>(key).await }
        })
        .await
    }

    async fn list(&self) -> AppResult<Vec<String>> {
        let pattern = format!("{}*", REVOKED_TOKEN_PREFIX);
        let keys = self
            .run("list", move |conn| scan_keys(conn, pattern.clone()))
            .await?;

        Ok(keys
            .iter()
            .filter_map(|key| token_from_key(key))
            .map(str::to_string)
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        let _pong: String = self
            .run("ping", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }
}
