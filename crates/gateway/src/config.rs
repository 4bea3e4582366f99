//! Gateway configuration.

use std::env;

use common::{env_or, RateLimitConfig};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Disable to skip rate limiting entirely (no Redis round trip)
    pub rate_limit_enabled: bool,
    /// Limit for authenticated API routes
    pub rate_limit: RateLimitConfig,
    /// Stricter limit for the public authentication routes
    pub auth_rate_limit: RateLimitConfig,
    /// Key rate limits on `X-Forwarded-For` / `X-Real-IP`. Only safe behind
    /// a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("SERVER_HOST").unwrap_or(defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            rate_limit_enabled: env_or("RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
            rate_limit: RateLimitConfig {
                max_requests: env_or("RATE_LIMIT_REQUESTS", defaults.rate_limit.max_requests),
                window_seconds: env_or(
                    "RATE_LIMIT_WINDOW_SECONDS",
                    defaults.rate_limit.window_seconds,
                ),
            },
            auth_rate_limit: RateLimitConfig {
                max_requests: env_or(
                    "RATE_LIMIT_AUTH_REQUESTS",
                    defaults.auth_rate_limit.max_requests,
                ),
                window_seconds: env_or(
                    "RATE_LIMIT_AUTH_WINDOW_SECONDS",
                    defaults.auth_rate_limit.window_seconds,
                ),
            },
            trust_proxy_headers: env_or("TRUST_PROXY_HEADERS", defaults.trust_proxy_headers),
        }
    }

    /// Socket address string for the listener.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            rate_limit_enabled: true,
            rate_limit: RateLimitConfig::default(),
            auth_rate_limit: RateLimitConfig {
                max_requests: 10,
                window_seconds: 60,
            },
            trust_proxy_headers: false,
        }
    }
}
