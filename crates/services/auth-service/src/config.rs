//! Auth service configuration.

use std::env;

use common::{
    default_role_access_minutes, env_or, parse_role_minutes, AppError, AppResult, CacheConfig,
    TokenConfig,
};
use domain::{
    PasswordPolicy, DEFAULT_ACCESS_TOKEN_MINUTES, DEFAULT_REFRESH_TOKEN_DAYS,
    MIN_JWT_SECRET_LENGTH, MIN_PASSWORD_LENGTH, RESET_TOKEN_MINUTES, REVOCATION_FALLBACK_SECONDS,
};

const DEV_ACCESS_SECRET: &str = "dev-access-secret-minimum-32-chars!!";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret-minimum-32-chars!";

/// Upper bound for any configured token lifetime in minutes (one year)
const MAX_LIFETIME_MINUTES: i64 = 365 * 24 * 60;

/// Auth service configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthServiceConfig {
    pub tokens: TokenConfig,
    /// Revocation store connection
    pub cache: CacheConfig,
    pub password_policy: PasswordPolicy,
}

impl AuthServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails when a signing secret is missing in a release build, shorter
    /// than the minimum, or when both secrets are identical.
    pub fn from_env() -> AppResult<Self> {
        let access_secret = secret_from_env("ACCESS_TOKEN_SECRET", DEV_ACCESS_SECRET)?;
        let refresh_secret = secret_from_env("REFRESH_TOKEN_SECRET", DEV_REFRESH_SECRET)?;
        validate_secrets(&access_secret, &refresh_secret)?;

        let role_access_minutes = env::var("ACCESS_TOKEN_ROLE_MINUTES")
            .map(|raw| parse_role_minutes(&raw))
            .unwrap_or_else(|_| default_role_access_minutes());

        let tokens = TokenConfig {
            access_secret,
            refresh_secret,
            access_default_minutes: env_or(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                DEFAULT_ACCESS_TOKEN_MINUTES,
            ),
            role_access_minutes,
            refresh_days: env_or("REFRESH_TOKEN_EXPIRE_DAYS", DEFAULT_REFRESH_TOKEN_DAYS),
            reset_minutes: env_or("RESET_TOKEN_EXPIRE_MINUTES", RESET_TOKEN_MINUTES),
            revocation_fallback_seconds: env_or(
                "REVOCATION_FALLBACK_SECONDS",
                REVOCATION_FALLBACK_SECONDS,
            ),
        };
        validate_lifetimes(&tokens)?;

        let cache_defaults = CacheConfig::default();
        let cache = CacheConfig {
            host: env::var("REDIS_HOST").unwrap_or(cache_defaults.host),
            port: env_or("REDIS_PORT", cache_defaults.port),
            retry_attempts: env_or("REVOCATION_RETRY_ATTEMPTS", cache_defaults.retry_attempts),
            retry_delay_ms: env_or("REVOCATION_RETRY_DELAY_MS", cache_defaults.retry_delay_ms),
        };

        let password_policy = PasswordPolicy {
            min_length: env_or("PASSWORD_MIN_LENGTH", MIN_PASSWORD_LENGTH),
            require_uppercase: env_or("PASSWORD_REQUIRE_UPPERCASE", true),
            require_lowercase: env_or("PASSWORD_REQUIRE_LOWERCASE", true),
            require_digit: env_or("PASSWORD_REQUIRE_DIGIT", true),
            require_special: env_or("PASSWORD_REQUIRE_SPECIAL", true),
        };

        Ok(Self {
            tokens,
            cache,
            password_policy,
        })
    }
}

fn secret_from_env(key: &str, dev_default: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(secret) => Ok(secret),
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("{} not set, using insecure default for development", key);
            Ok(dev_default.to_string())
        }
        Err(_) => Err(AppError::internal(format!(
            "{} environment variable must be set in production",
            key
        ))),
    }
}

/// Check secret length and that access and refresh tokens use distinct keys.
pub fn validate_secrets(access_secret: &str, refresh_secret: &str) -> AppResult<()> {
    for (name, secret) in [
        ("ACCESS_TOKEN_SECRET", access_secret),
        ("REFRESH_TOKEN_SECRET", refresh_secret),
    ] {
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::internal(format!(
                "{} must be at least {} characters long",
                name, MIN_JWT_SECRET_LENGTH
            )));
        }
    }

    if access_secret == refresh_secret {
        return Err(AppError::internal(
            "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ",
        ));
    }

    Ok(())
}

/// Every lifetime must be positive and at most a year.
pub fn validate_lifetimes(tokens: &TokenConfig) -> AppResult<()> {
    let check = |name: &str, minutes: Option<i64>| match minutes {
        Some(m) if (1..=MAX_LIFETIME_MINUTES).contains(&m) => Ok(()),
        _ => Err(AppError::internal(format!(
            "{} must be between 1 minute and {} minutes",
            name, MAX_LIFETIME_MINUTES
        ))),
    };

    check("ACCESS_TOKEN_EXPIRE_MINUTES", Some(tokens.access_default_minutes))?;
    check("RESET_TOKEN_EXPIRE_MINUTES", Some(tokens.reset_minutes))?;
    check(
        "REFRESH_TOKEN_EXPIRE_DAYS",
        tokens.refresh_days.checked_mul(24 * 60),
    )?;
    for (role, minutes) in &tokens.role_access_minutes {
        check(&format!("ACCESS_TOKEN_ROLE_MINUTES[{}]", role), Some(*minutes))?;
    }

    Ok(())
}
