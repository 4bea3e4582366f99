//! Directory endpoints.
//!
//! Member routes are open to admins and clients; a client only ever sees or
//! changes their own record. Account creation and role changes sit behind
//! the admin gate.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use auth_service_lib::{AccountUpdate, RegisterInput};
use common::{AppError, AppResult};
use domain::{User, UserResponse};

use crate::extractors::ValidatedJson;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    #[schema(example = "admin")]
    pub role: String,
}

/// Account created by an administrator
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 64,
        message = "Username must be between 3 and 64 characters"
    ))]
    #[schema(example = "bob")]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "bob@example.com")]
    pub email: String,
    /// Must satisfy the password policy
    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "SecurePass123!")]
    pub password: String,
    /// Defaults to "client"
    #[schema(example = "admin")]
    pub role: Option<String>,
}

/// Fields to change on a user record; omitted fields keep their value.
/// Roles are changed through `/api/users/{id}/role`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(
        min = 3,
        max = 64,
        message = "Username must be between 3 and 64 characters"
    ))]
    #[schema(example = "alice")]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: Option<String>,
}

pub fn member_user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_current_user))
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub fn admin_user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/:id/role", put(update_user_role))
}

fn render(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

fn ensure_may_act_on(caller: &CurrentUser, id: Uuid, message: &str) -> AppResult<()> {
    if caller.may_act_on(id) {
        return Ok(());
    }

    tracing::warn!(user_id = %caller.id, target = %id, "Access to another user's record denied");
    Err(AppError::not_owner(message))
}

/// Profile of the caller, as the directory currently has it
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 401, description = "Missing, expired or revoked token")
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> AppResult<Json<UserResponse>> {
    state.user_service.get_user(caller.id).await.map(render)
}

/// All users for an admin; a client gets a list holding only their own record
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = Vec<UserResponse>),
        (status = 403, description = "Caller is neither admin nor client")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = if caller.is_admin() {
        state.user_service.list_users().await?
    } else {
        vec![state.user_service.get_user(caller.id).await?]
    };
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, body = UserResponse),
        (status = 400, description = "Weak password, unknown role or identity in use"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .auth_service
        .provision(RegisterInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            role: payload.role,
        })
        .await?;

    tracing::info!(admin = %caller.username, user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, render(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, body = UserResponse),
        (status = 403, description = "Client asked for another user's record"),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    ensure_may_act_on(&caller, id, "You can only view your own user data")?;
    state.user_service.get_user(id).await.map(render)
}

/// Change login name, email or password. Existing access tokens carry the
/// old login name, so renaming ends them.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, body = UserResponse),
        (status = 400, description = "Weak password or identity in use"),
        (status = 403, description = "Client targeted another user"),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    ensure_may_act_on(&caller, id, "You can only update your own user data")?;

    let user = state
        .auth_service
        .update_account(
            id,
            AccountUpdate {
                username: payload.username,
                email: payload.email,
                password: payload.password,
            },
        )
        .await?;

    tracing::info!(caller = %caller.username, user_id = %id, "User updated");
    Ok(render(user))
}

/// Change a user's role. Sessions already issued to that user pick up the
/// new role on their next request.
#[utoipa::path(
    put,
    path = "/api/users/{id}/role",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, body = UserResponse),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such user")
    )
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.update_role(id, &payload.role).await?;
    tracing::info!(admin = %caller.username, user_id = %id, role = %user.role, "Role changed");
    Ok(render(user))
}

/// Delete an account. Clients may close their own; admins may remove anyone
/// but themselves.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Admins cannot delete their own account"),
        (status = 403, description = "Client targeted another user"),
        (status = 404, description = "No such user")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ensure_may_act_on(&caller, id, "You can only delete your own account")?;
    if caller.is_admin() && caller.id == id {
        return Err(AppError::validation("Cannot delete your own account"));
    }

    state.user_service.delete_user(id).await?;
    tracing::info!(caller = %caller.username, user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
