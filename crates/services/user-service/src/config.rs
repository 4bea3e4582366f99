//! User service configuration.

use std::env;

use common::{env_or, DatabaseConfig};

/// User service configuration.
#[derive(Debug, Clone, Default)]
pub struct UserServiceConfig {
    pub database: DatabaseConfig,
}

impl UserServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// `DATABASE_URL` wins; otherwise the URL is assembled from
    /// `DB_USER`, `DB_PASSWORD`, `DB_HOST`, `DB_PORT` and `DB_NAME`.
    pub fn from_env() -> Self {
        let defaults = DatabaseConfig::default();
        let url = env::var("DATABASE_URL")
            .ok()
            .or_else(database_url_from_parts)
            .unwrap_or(defaults.url);

        Self {
            database: DatabaseConfig {
                url,
                max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
                min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            },
        }
    }
}

fn database_url_from_parts() -> Option<String> {
    let user = env::var("DB_USER").ok()?;
    let password = env::var("DB_PASSWORD").unwrap_or_default();
    let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let name = env::var("DB_NAME").ok()?;
    Some(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, name
    ))
}
