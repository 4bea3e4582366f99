//! Rate limiting middleware backed by Redis counters.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::{aio::ConnectionManager, AsyncCommands, Client};

use common::{AppError, AppResult, CacheConfig, RateLimitConfig};

use crate::state::AppState;

/// Cache key prefix for rate limiting
const CACHE_PREFIX_RATE_LIMIT: &str = "rate_limit:";

/// Fixed-window request counter per client and path.
pub struct RateLimiter {
    conn: ConnectionManager,
}

impl RateLimiter {
    /// Connect to Redis.
    pub async fn connect(config: &CacheConfig) -> AppResult<Self> {
        let client = Client::open(config.url())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Check rate limit and increment counter.
    /// Returns (current_count, allowed).
    pub async fn check(&self, identifier: &str, limit: &RateLimitConfig) -> AppResult<(u64, bool)> {
        let key = format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier);
        let mut conn = self.conn.clone();

        let count: u64 = conn.incr(&key, 1).await?;

        // First request opens the window
        if count == 1 {
            conn.expire::<_, ()>(&key, limit.window_seconds as i64).await?;
        }

        Ok((count, count <= limit.max_requests))
    }
}

/// Rate limit middleware for authenticated endpoints.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let limit = state.config.rate_limit.clone();
    rate_limit_internal(state, connect_info, request, next, limit).await
}

/// Rate limit middleware for the public auth endpoints (stricter).
pub async fn rate_limit_auth_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let limit = state.config.auth_rate_limit.clone();
    rate_limit_internal(state, connect_info, request, next, limit).await
}

async fn rate_limit_internal(
    state: AppState,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
    limit: RateLimitConfig,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return next.run(request).await;
    };

    let ip = client_ip(&request, connect_info, state.config.trust_proxy_headers);
    let identifier = format!("{}:{}", request.uri().path(), ip);

    let count = match limiter.check(&identifier, &limit).await {
        Ok((count, true)) => count,
        Ok((_, false)) => {
            tracing::warn!(client = %ip, path = %request.uri().path(), "Rate limit exceeded");
            return rate_limit_exceeded_response(&limit);
        }
        Err(e) => {
            // Fail closed
            tracing::error!(error = %e, "Rate limiter unavailable");
            return rate_limit_exceeded_response(&limit);
        }
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit.max_requests));
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from(limit.max_requests.saturating_sub(count)),
    );

    response
}

/// Client address for the limiter key. Forwarded headers are client
/// controlled, so they count only when a trusted proxy sets them.
fn client_ip(
    request: &Request,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        let forwarded = request
            .headers()
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        let real_ip = request
            .headers()
            .get("X-Real-IP")
            .and_then(|h| h.to_str().ok())
            .map(str::trim);

        if let Some(ip) = forwarded.or(real_ip) {
            return ip.to_string();
        }
    }

    connect_info
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn rate_limit_exceeded_response(limit: &RateLimitConfig) -> Response {
    let mut response = AppError::TooManyRequests.into_response();

    let headers = response.headers_mut();
    headers.insert("Retry-After", HeaderValue::from(limit.window_seconds));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit.max_requests));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from_proxy() -> Request {
        Request::builder()
            .uri("/api/auth/login")
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .header("X-Real-IP", "203.0.113.10")
            .body(Body::empty())
            .unwrap()
    }

    fn peer() -> Option<ConnectInfo<SocketAddr>> {
        Some(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 40000))))
    }

    #[test]
    fn test_forwarded_headers_ignored_by_default() {
        assert_eq!(client_ip(&request_from_proxy(), peer(), false), "192.0.2.7");
    }

    #[test]
    fn test_forwarded_headers_used_behind_trusted_proxy() {
        assert_eq!(client_ip(&request_from_proxy(), peer(), true), "203.0.113.9");
    }

    #[test]
    fn test_missing_peer_address() {
        assert_eq!(client_ip(&request_from_proxy(), None, false), "unknown");
    }
}
