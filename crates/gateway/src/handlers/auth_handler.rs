//! Authentication handlers.
//!
//! Login and the password recovery endpoints take form bodies; register and
//! refresh take JSON.

use axum::{
    extract::{Extension, State},
    response::{Json, Redirect},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use auth_service_lib::{Identity, RegisterInput};
use common::AppResult;
use domain::{UserResponse, TOKEN_TYPE_BEARER};

use crate::extractors::{ValidatedForm, ValidatedJson};
use crate::middleware::{BearerToken, CurrentUser};
use crate::state::AppState;

/// User registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Login name
    #[validate(length(
        min = 3,
        max = 64,
        message = "Username must be between 3 and 64 characters"
    ))]
    #[schema(example = "alice")]
    pub username: String,
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Must satisfy the password policy
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "SecurePass123!")]
    pub password: String,
    /// Only "client" may be requested
    #[schema(example = "client")]
    pub role: Option<String>,
}

/// Login form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Username is required"))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

/// Refresh request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Forgot password form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordForm {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
}

/// Reset password form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordForm {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Change password form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordForm {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Revoke token form
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RevokeTokenForm {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

/// Tokens issued at login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "bearer"
    #[schema(example = "bearer")]
    pub token_type: String,
}

/// Access token minted from a refresh token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

/// Plain confirmation message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Password reset token handed back by forgot-password
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetTokenResponse {
    pub message: String,
    pub token: String,
}

/// Routes open to anonymous callers
pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Routes requiring a valid session
pub fn session_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
}

/// Routes requiring the admin role
pub fn admin_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/revoked-tokens", get(list_revoked_tokens))
        .route("/revoke-token", post(revoke_token))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = UserResponse),
        (status = 400, description = "Validation error, weak password or duplicate identity")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .auth_service
        .register(RegisterInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            role: payload.role,
        })
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Login and get access and refresh tokens
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state
        .auth_service
        .login(&form.username, &form.password)
        .await?;

    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: pair.token_type,
    }))
}

/// Exchange the current refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 404, description = "Refresh token is not the current one for any user")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    let access_token = state.auth_service.refresh(&payload.refresh_token).await?;

    Ok(Json(AccessTokenResponse {
        access_token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
    }))
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> AppResult<Json<MessageResponse>> {
    state
        .auth_service
        .logout(&Identity::from(current_user), &token)
        .await?;

    Ok(MessageResponse::new("Successfully logged out"))
}

/// Request a password reset token
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Authentication",
    request_body(content = ForgotPasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Reset token issued", body = ResetTokenResponse),
        (status = 404, description = "No user with that email")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<ForgotPasswordForm>,
) -> AppResult<Json<ResetTokenResponse>> {
    let token = state.auth_service.forgot_password(&form.email).await?;

    Ok(Json(ResetTokenResponse {
        message: "Password reset token generated".to_string(),
        token,
    }))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Authentication",
    request_body(content = ResetPasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Password reset, redirect to the start page"),
        (status = 400, description = "Weak password"),
        (status = 401, description = "Invalid, expired or used reset token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<ResetPasswordForm>,
) -> AppResult<Redirect> {
    state
        .auth_service
        .reset_password(&form.token, &form.new_password)
        .await?;

    Ok(Redirect::to("/"))
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body(content = ChangePasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Weak password or unchanged password"),
        (status = 401, description = "Unauthorized or wrong current password")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    ValidatedForm(form): ValidatedForm<ChangePasswordForm>,
) -> AppResult<Json<MessageResponse>> {
    state
        .auth_service
        .change_password(
            &Identity::from(current_user),
            &form.current_password,
            &form.new_password,
        )
        .await?;

    Ok(MessageResponse::new("Password changed successfully"))
}

/// List revoked tokens (admin only)
#[utoipa::path(
    get,
    path = "/api/auth/revoked-tokens",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Revoked token strings", body = Vec<String>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_revoked_tokens(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.auth_service.list_revoked().await?))
}

/// Revoke a token (admin only)
#[utoipa::path(
    post,
    path = "/api/auth/revoke-token",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body(content = RevokeTokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 400, description = "Token already revoked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn revoke_token(
    State(state): State<AppState>,
    ValidatedForm(form): ValidatedForm<RevokeTokenForm>,
) -> AppResult<Json<MessageResponse>> {
    state.auth_service.revoke_token(&form.token).await?;

    Ok(MessageResponse::new("Token revoked"))
}
