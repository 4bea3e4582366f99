//! OpenAPI document served under `/api-docs/openapi.json`.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use domain::UserResponse;

use crate::handlers::{auth_handler as auth, health_handler as health, user_handler as users};

/// Name of the security scheme referenced by protected paths.
const BEARER_SCHEME: &str = "bearer_auth";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order API",
        description = "Accounts, sessions and password recovery for the order backend"
    ),
    paths(
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::forgot_password,
        auth::reset_password,
        auth::change_password,
        auth::list_revoked_tokens,
        auth::revoke_token,
        users::get_current_user,
        users::list_users,
        users::create_user,
        users::get_user,
        users::update_user,
        users::update_user_role,
        users::delete_user,
        health::health_check,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginForm,
        auth::RefreshRequest,
        auth::ForgotPasswordForm,
        auth::ResetPasswordForm,
        auth::ChangePasswordForm,
        auth::RevokeTokenForm,
        auth::TokenResponse,
        auth::AccessTokenResponse,
        auth::MessageResponse,
        auth::ResetTokenResponse,
        users::UpdateRoleRequest,
        users::CreateUserRequest,
        users::UpdateUserRequest,
        health::HealthReport,
        health::Dependencies,
        health::DependencyCheck,
        health::DependencyStatus,
        UserResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Authentication", description = "Sessions, tokens and password recovery"),
        (name = "Users", description = "Directory lookups, self-service updates and role management"),
        (name = "Health", description = "Dependency checks"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                BEARER_SCHEME,
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_auth_surface() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/register",
            "/api/auth/login",
            "/api/auth/refresh",
            "/api/auth/logout",
            "/api/auth/forgot-password",
            "/api/auth/reset-password",
            "/api/auth/change-password",
            "/api/auth/revoked-tokens",
            "/api/auth/revoke-token",
            "/api/users/me",
            "/api/users",
            "/api/users/{id}",
            "/api/users/{id}/role",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key(BEARER_SCHEME));
    }
}
