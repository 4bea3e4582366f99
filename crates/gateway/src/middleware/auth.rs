//! Authentication and role-based authorization middleware.
//!
//! Every request re-resolves the caller against the user directory, so a
//! role change or account deletion applies to tokens already issued.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use auth_service_lib::Identity;
use common::{AppError, AppResult};
use domain::UserRole;

use crate::state::AppState;

/// Current authenticated user, resolved from the directory.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Check if user has admin role.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Admins act on any record, everyone else only on their own.
    pub fn may_act_on(&self, id: Uuid) -> bool {
        self.is_admin() || self.id == id
    }
}

impl From<Identity> for CurrentUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            role: identity.role,
        }
    }
}

impl From<CurrentUser> for Identity {
    fn from(user: CurrentUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// Raw bearer token of the current request (needed to revoke it on logout).
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// State for [`require_role`]: the app state plus the roles let through.
#[derive(Clone)]
pub struct RoleGate {
    state: AppState,
    allowed: &'static [&'static str],
}

impl RoleGate {
    pub fn new(state: AppState, allowed: &'static [&'static str]) -> Self {
        Self { state, allowed }
    }
}

/// Authentication middleware: any valid session passes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(bearer)?;
    let current_user = resolve(&state, &token).await?;

    attach(&mut request, current_user, token);
    Ok(next.run(request).await)
}

/// Authorization middleware: the caller's current role must be allowed.
pub async fn require_role(
    State(gate): State<RoleGate>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(bearer)?;
    let current_user = resolve(&gate.state, &token).await?;

    if !current_user.role.is_one_of(gate.allowed) {
        tracing::warn!(
            user_id = %current_user.id,
            role = %current_user.role,
            path = %request.uri().path(),
            "Access denied"
        );
        return Err(AppError::Forbidden);
    }

    attach(&mut request, current_user, token);
    Ok(next.run(request).await)
}

fn bearer_token(bearer: Option<TypedHeader<Authorization<Bearer>>>) -> AppResult<String> {
    bearer
        .map(|TypedHeader(auth)| auth.token().to_string())
        .ok_or(AppError::Unauthorized)
}

async fn resolve(state: &AppState, token: &str) -> AppResult<CurrentUser> {
    let identity = state.auth_service.authenticate(token).await?;
    Ok(CurrentUser::from(identity))
}

fn attach(request: &mut Request, current_user: CurrentUser, token: String) {
    request.extensions_mut().insert(current_user);
    request.extensions_mut().insert(BearerToken(token));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            role,
        }
    }

    #[test]
    fn test_client_may_only_act_on_own_record() {
        let client = caller(UserRole::Client);
        assert!(client.may_act_on(client.id));
        assert!(!client.may_act_on(Uuid::new_v4()));
    }

    #[test]
    fn test_admin_may_act_on_any_record() {
        let admin = caller(UserRole::Admin);
        assert!(admin.may_act_on(admin.id));
        assert!(admin.may_act_on(Uuid::new_v4()));
    }
}
