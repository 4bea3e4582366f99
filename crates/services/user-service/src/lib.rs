//! User directory: the `users` table, its migrations, and the repository
//! that the authentication flow and the user management endpoints go
//! through.

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

pub use infra::{MigrateAction, MigrationState};

use crate::config::UserServiceConfig;
use crate::infra::Database;

/// Apply a schema action against the configured database without starting
/// the server.
pub async fn run_migrations(
    config: &UserServiceConfig,
    action: MigrateAction,
) -> Result<Vec<MigrationState>, sea_orm::DbErr> {
    Database::open(&config.database).await?.migrate(action).await
}
