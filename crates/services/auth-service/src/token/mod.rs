//! Token service: issues, verifies and revokes signed tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with independent
//! secrets. A token is valid only while its signature checks out, it has
//! not expired (no leeway), and the revocation store has no entry for it.

mod claims;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use common::{AppError, AppResult, TokenConfig};
use domain::{ROLE_RESET, SECONDS_PER_MINUTE};

use crate::revocation::RevocationStore;

pub use claims::{AccessClaims, RefreshClaims};
use claims::ExpiryClaim;

/// Issues and checks access, refresh and password reset tokens.
#[derive(Clone)]
pub struct TokenService {
    config: TokenConfig,
    store: Arc<dyn RevocationStore>,
}

impl TokenService {
    pub fn new(config: TokenConfig, store: Arc<dyn RevocationStore>) -> Self {
        Self { config, store }
    }

    /// Access token lifetime for `role`, falling back to the default.
    /// `None` when the configured minutes do not fit a duration.
    pub fn access_lifetime(&self, role: &str) -> Option<Duration> {
        let minutes = self
            .config
            .role_access_minutes
            .get(role)
            .copied()
            .unwrap_or(self.config.access_default_minutes);
        Duration::try_minutes(minutes)
    }

    /// Issue an access token. `ttl` overrides the role-based lifetime.
    pub fn issue_access(&self, subject: &str, role: &str, ttl: Option<Duration>) -> AppResult<String> {
        let now = Utc::now();
        let lifetime = ttl.or_else(|| self.access_lifetime(role));
        let claims = AccessClaims {
            sub: subject.to_string(),
            role: role.to_string(),
            exp: expires_at(now, lifetime)?,
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.access_secret.as_bytes()),
        )?)
    }

    /// Issue a refresh token with the configured fixed lifetime.
    pub fn issue_refresh(&self, subject: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: subject.to_string(),
            exp: expires_at(now, Duration::try_days(self.config.refresh_days))?,
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.refresh_secret.as_bytes()),
        )?)
    }

    /// Issue a password reset token for `email`.
    pub fn issue_reset(&self, email: &str) -> AppResult<String> {
        let lifetime = Duration::try_minutes(self.config.reset_minutes)
            .ok_or_else(|| AppError::internal("reset token lifetime out of range"))?;
        self.issue_access(email, ROLE_RESET, Some(lifetime))
    }

    /// Verify an access (or reset) token.
    ///
    /// `Ok(None)` covers every way a token can be invalid. `Err` means the
    /// revocation store could not be consulted.
    pub async fn verify_access(&self, token: &str) -> AppResult<Option<AccessClaims>> {
        let Some(claims) = decode_claims::<AccessClaims>(token, &self.config.access_secret)
        else {
            return Ok(None);
        };
        if self.is_revoked(token).await? {
            tracing::debug!(jti = %claims.jti, "Rejected revoked access token");
            return Ok(None);
        }
        Ok(Some(claims))
    }

    /// Verify a refresh token, including the revocation check.
    pub async fn verify_refresh(&self, token: &str) -> AppResult<Option<RefreshClaims>> {
        let Some(claims) = decode_claims::<RefreshClaims>(token, &self.config.refresh_secret)
        else {
            return Ok(None);
        };
        if self.is_revoked(token).await? {
            tracing::debug!(jti = %claims.jti, "Rejected revoked refresh token");
            return Ok(None);
        }
        Ok(Some(claims))
    }

    /// Revoke `token` until it would expire on its own.
    ///
    /// With no `ttl_seconds`, the retention is the remaining lifetime of a
    /// token that still verifies. Expired, malformed or foreign tokens get
    /// the configured fallback. Only a non-positive explicit `ttl_seconds`
    /// stores nothing.
    pub async fn revoke(&self, token: &str, ttl_seconds: Option<i64>) -> AppResult<()> {
        let ttl = ttl_seconds.unwrap_or_else(|| self.remaining_lifetime(token));
        if ttl <= 0 {
            return Ok(());
        }
        self.store.put(token, ttl as u64).await
    }

    /// Check the revocation store for `token`.
    pub async fn is_revoked(&self, token: &str) -> AppResult<bool> {
        self.store.exists(token).await
    }

    /// Raw tokens currently revoked.
    pub async fn revoked_tokens(&self) -> AppResult<Vec<String>> {
        self.store.list().await
    }

    fn remaining_lifetime(&self, token: &str) -> i64 {
        let expiry = decode_claims::<ExpiryClaim>(token, &self.config.access_secret)
            .or_else(|| decode_claims::<ExpiryClaim>(token, &self.config.refresh_secret));

        match expiry {
            Some(claim) => claim.exp - Utc::now().timestamp(),
            None => i64::try_from(self.config.revocation_fallback_seconds)
                .unwrap_or(15 * SECONDS_PER_MINUTE),
        }
    }
}

fn expires_at(now: DateTime<Utc>, lifetime: Option<Duration>) -> AppResult<i64> {
    lifetime
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .map(|at| at.timestamp())
        .ok_or_else(|| AppError::internal("token lifetime out of range"))
}

fn decode_claims<T: DeserializeOwned>(token: &str, secret: &str) -> Option<T> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    match decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(error = %e, "Token failed verification");
            None
        }
    }
}
