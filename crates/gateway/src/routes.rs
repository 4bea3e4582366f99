//! Route configuration.

use axum::{middleware, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use domain::{ROLE_ADMIN, ROLE_CLIENT};

use crate::handlers::{
    admin_auth_routes, admin_user_routes, health_routes, member_user_routes, public_auth_routes,
    session_auth_routes,
};
use crate::middleware::{
    auth_middleware, rate_limit_auth_middleware, rate_limit_middleware, require_role, RoleGate,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Roles allowed on administrative endpoints
const ADMIN_ONLY: &[&str] = &[ROLE_ADMIN];

/// Roles allowed on the directory's self-service endpoints
const MEMBERS: &[&str] = &[ROLE_ADMIN, ROLE_CLIENT];

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let authenticated = || middleware::from_fn_with_state(state.clone(), auth_middleware);
    let gate = |allowed: &'static [&'static str]| {
        middleware::from_fn_with_state(RoleGate::new(state.clone(), allowed), require_role)
    };

    let auth = Router::new()
        .merge(public_auth_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_auth_middleware,
        )))
        .merge(session_auth_routes().route_layer(authenticated()))
        .merge(admin_auth_routes().route_layer(gate(ADMIN_ONLY)));

    let users = Router::new()
        .merge(member_user_routes().route_layer(gate(MEMBERS)))
        .merge(admin_user_routes().route_layer(gate(ADMIN_ONLY)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        // Health check (no auth, no rate limit)
        .nest("/health", health_routes())
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api/auth", auth)
        .nest("/api/users", users)
        .with_state(state)
}
