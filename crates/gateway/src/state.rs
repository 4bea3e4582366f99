//! Application state for dependency injection.

use std::sync::Arc;

use auth_service_lib::{AuthService, RevocationStore};
use user_service_lib::infra::Database;
use user_service_lib::service::UserService;

use crate::config::GatewayConfig;
use crate::middleware::RateLimiter;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    /// Checked by the health check
    pub revocation_store: Arc<dyn RevocationStore>,
    /// Checked by the health check when present
    pub database: Option<Database>,
    /// `None` disables rate limiting
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub config: GatewayConfig,
}

impl AppState {
    /// Create new app state without database check or rate limiter.
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        revocation_store: Arc<dyn RevocationStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            revocation_store,
            database: None,
            rate_limiter: None,
            config,
        }
    }

    /// Attach the database handle used by the health check.
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    /// Attach a rate limiter.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }
}
