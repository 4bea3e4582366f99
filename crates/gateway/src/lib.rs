//! API Gateway Library
//!
//! The HTTP surface of the order backend: authentication and user
//! management routes, the authorization gate, rate limiting and the
//! OpenAPI document. Services are wired in-process.

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use auth_service_lib::{
    AuthService, AuthServiceConfig, Authenticator, RedisRevocationStore, RegisterInput,
    TokenService,
};
use domain::User;
use user_service_lib::config::UserServiceConfig;
use user_service_lib::infra::Database;
use user_service_lib::repository::{UserRepository, UserStore};
use user_service_lib::service::UserManager;

use crate::config::GatewayConfig;
use crate::middleware::RateLimiter;
use crate::routes::create_router;
use crate::state::AppState;

/// Connect to PostgreSQL and Redis, apply migrations, and serve HTTP.
pub async fn run_server(config: GatewayConfig) -> Result<(), Box<dyn Error>> {
    let auth_config = AuthServiceConfig::from_env()?;
    let user_config = UserServiceConfig::from_env();

    let database = Database::connect(&user_config.database).await?;
    let revocation_store = Arc::new(RedisRevocationStore::connect(&auth_config.cache).await?);

    let (auth_service, users) = build_services(&auth_config, &database, revocation_store.clone());
    let user_service = Arc::new(UserManager::new(users));

    let mut state = AppState::new(auth_service, user_service, revocation_store, config.clone())
        .with_database(database);
    if config.rate_limit_enabled {
        let limiter = RateLimiter::connect(&auth_config.cache).await?;
        state = state.with_rate_limiter(Arc::new(limiter));
    }

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Create a user with an explicit role, bypassing self-registration rules.
pub async fn create_admin(
    username: String,
    email: String,
    password: String,
    role: String,
) -> Result<User, Box<dyn Error>> {
    let auth_config = AuthServiceConfig::from_env()?;
    let user_config = UserServiceConfig::from_env();

    let database = Database::connect(&user_config.database).await?;
    let revocation_store = Arc::new(RedisRevocationStore::connect(&auth_config.cache).await?);
    let (auth_service, _) = build_services(&auth_config, &database, revocation_store);

    let user = auth_service
        .provision(RegisterInput {
            username,
            email,
            password,
            role: Some(role),
        })
        .await?;

    Ok(user)
}

fn build_services(
    auth_config: &AuthServiceConfig,
    database: &Database,
    revocation_store: Arc<RedisRevocationStore>,
) -> (Arc<dyn AuthService>, Arc<dyn UserRepository>) {
    let users: Arc<dyn UserRepository> = Arc::new(UserStore::new(database.get_connection()));
    let tokens = TokenService::new(auth_config.tokens.clone(), revocation_store);
    let auth_service: Arc<dyn AuthService> = Arc::new(Authenticator::new(
        users.clone(),
        tokens,
        auth_config.password_policy.clone(),
    ));

    (auth_service, users)
}
