//! Authentication service - credentials, sessions and password recovery.
//!
//! Uses the domain `Password` value object for hashing and the
//! `TokenService` for everything signed.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{
    DomainError, NewUser, Password, PasswordPolicy, User, UserRole, DEFAULT_ROLE, ROLE_RESET,
    TOKEN_TYPE_BEARER,
};
use user_service_lib::repository::UserRepository;

use crate::token::TokenService;

/// Verified against when the username is unknown, so both login failures
/// cost one Argon2 verification.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    Password::hash("dummy-password-for-timing")
        .map(Password::into_string)
        .unwrap_or_default()
});

/// Access and refresh tokens returned by a successful login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "bearer"
    pub token_type: String,
}

/// Caller identity resolved from a verified access token and the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    /// Role currently stored for the user, not the one in the token
    pub role: UserRole,
}

/// Registration request
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Requested role; only the default role may be self-assigned
    pub role: Option<String>,
}

/// Changes a user may make to their own record; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new client account
    async fn register(&self, input: RegisterInput) -> AppResult<User>;

    /// Create an account with any valid role (operator provisioning)
    async fn provision(&self, input: RegisterInput) -> AppResult<User>;

    /// Update login name, email or password of an existing account
    async fn update_account(&self, id: Uuid, update: AccountUpdate) -> AppResult<User>;

    /// Check credentials and start a session
    async fn login(&self, username: &str, password: &str) -> AppResult<TokenPair>;

    /// Mint a new access token from the user's current refresh token
    async fn refresh(&self, refresh_token: &str) -> AppResult<String>;

    /// End the session: drop the refresh token and revoke the access token
    async fn logout(&self, identity: &Identity, access_token: &str) -> AppResult<()>;

    /// Issue a password reset token for the account with this email
    async fn forgot_password(&self, email: &str) -> AppResult<String>;

    /// Set a new password using a reset token; the token is consumed
    async fn reset_password(&self, reset_token: &str, new_password: &str) -> AppResult<()>;

    /// Change the caller's password after re-checking the current one
    async fn change_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()>;

    /// Resolve a bearer access token to the caller's identity
    async fn authenticate(&self, access_token: &str) -> AppResult<Identity>;

    /// Tokens currently held in the revocation store
    async fn list_revoked(&self) -> AppResult<Vec<String>>;

    /// Revoke an arbitrary token
    async fn revoke_token(&self, token: &str) -> AppResult<()>;
}

/// Concrete implementation of AuthService over the user directory.
pub struct Authenticator {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    password_policy: PasswordPolicy,
}

impl Authenticator {
    /// Create new auth service instance
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            users,
            tokens,
            password_policy,
        }
    }

    /// Token service used by this authenticator
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    async fn create_user(&self, input: RegisterInput, role: UserRole) -> AppResult<User> {
        self.password_policy.validate(&input.password)?;

        if self
            .users
            .exists_by_username_or_email(&input.username, &input.email)
            .await?
        {
            return Err(DomainError::DuplicateIdentity.into());
        }

        let password_hash = Password::hash(&input.password)?.into_string();

        self.users
            .create(NewUser {
                username: input.username,
                email: input.email,
                password_hash,
                role,
            })
            .await
    }

    /// True when another account already uses this username or email
    async fn identity_taken_by_other(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
    ) -> AppResult<bool> {
        let by_username = self.users.find_by_username(username).await?;
        let by_email = self.users.find_by_email(email).await?;

        Ok(by_username
            .into_iter()
            .chain(by_email)
            .any(|other| other.id != id))
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, input: RegisterInput) -> AppResult<User> {
        if let Some(role) = input.role.as_deref() {
            if role != DEFAULT_ROLE {
                return Err(AppError::validation(format!(
                    "Only the '{}' role can be requested at registration",
                    DEFAULT_ROLE
                )));
            }
        }

        let user = self.create_user(input, UserRole::from(DEFAULT_ROLE)).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    async fn provision(&self, input: RegisterInput) -> AppResult<User> {
        let role = UserRole::parse(input.role.as_deref().unwrap_or(DEFAULT_ROLE))?;
        let user = self.create_user(input, role).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User provisioned");
        Ok(user)
    }

    async fn update_account(&self, id: Uuid, update: AccountUpdate) -> AppResult<User> {
        let user = self.users.find_by_id(id).await?.ok_or_not_found("User")?;

        if let Some(password) = update.password.as_deref() {
            self.password_policy.validate(password)?;
        }

        let username = update.username.unwrap_or_else(|| user.username.clone());
        let email = update.email.unwrap_or_else(|| user.email.clone());
        if self.identity_taken_by_other(id, &username, &email).await? {
            return Err(DomainError::DuplicateIdentity.into());
        }

        let mut updated = if username != user.username || email != user.email {
            self.users.update_identity(id, username, email).await?
        } else {
            user
        };

        if let Some(password) = update.password {
            let password_hash = Password::hash(&password)?.into_string();
            self.users
                .set_password_hash(id, password_hash.clone())
                .await?;
            updated.password_hash = password_hash;
        }

        tracing::info!(user_id = %id, "Account updated");
        Ok(updated)
    }

    async fn login(&self, username: &str, password: &str) -> AppResult<TokenPair> {
        let user = self.users.find_by_username(username).await?;

        // Verify against a dummy hash for unknown users so both failure
        // paths look the same from outside.
        let stored = match &user {
            Some(user) => Password::from_hash(user.password_hash.as_str()),
            None => Password::from_hash(DUMMY_HASH.as_str()),
        };
        let password_valid = stored.verify(password);

        let user = match user {
            Some(user) if password_valid => user,
            _ => {
                tracing::warn!(username = %username, "Failed login attempt");
                return Err(AppError::InvalidCredentials);
            }
        };

        let access_token = self
            .tokens
            .issue_access(&user.username, user.role.as_str(), None)?;
        let refresh_token = self.tokens.issue_refresh(&user.username)?;
        self.users
            .set_refresh_token(user.id, Some(refresh_token.clone()))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        if self.tokens.verify_refresh(refresh_token).await?.is_none() {
            return Err(AppError::InvalidToken);
        }

        // Only the most recently issued refresh token is bound to a user
        let user = self
            .users
            .find_by_refresh_token(refresh_token)
            .await?
            .ok_or_not_found("User")?;

        self.tokens
            .issue_access(&user.username, user.role.as_str(), None)
    }

    async fn logout(&self, identity: &Identity, access_token: &str) -> AppResult<()> {
        self.users.set_refresh_token(identity.id, None).await?;
        self.tokens.revoke(access_token, None).await?;

        tracing::info!(user_id = %identity.id, "User logged out");
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> AppResult<String> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::warn!("Password reset requested for unknown email");
                return Err(AppError::not_found("User"));
            }
        };

        let token = self.tokens.issue_reset(&user.email)?;
        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(token)
    }

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> AppResult<()> {
        let claims = match self.tokens.verify_access(reset_token).await? {
            Some(claims) if claims.role == ROLE_RESET => claims,
            _ => {
                tracing::warn!("Invalid password reset token presented");
                return Err(AppError::InvalidToken);
            }
        };

        let user = self
            .users
            .find_by_email(&claims.sub)
            .await?
            .ok_or_not_found("User")?;

        self.password_policy.validate(new_password)?;
        let password_hash = Password::hash(new_password)?.into_string();
        self.users.set_password_hash(user.id, password_hash).await?;

        self.tokens.revoke(reset_token, None).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    async fn change_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let user = self
            .users
            .find_by_id(identity.id)
            .await?
            .ok_or_not_found("User")?;

        if !Password::from_hash(user.password_hash.as_str()).verify(current_password) {
            tracing::warn!(user_id = %user.id, "Password change with wrong current password");
            return Err(AppError::InvalidCredentials);
        }

        if current_password == new_password {
            return Err(AppError::validation(
                "New password must differ from the current password",
            ));
        }

        self.password_policy.validate(new_password)?;
        let password_hash = Password::hash(new_password)?.into_string();
        self.users.set_password_hash(user.id, password_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> AppResult<Identity> {
        let claims = match self.tokens.verify_access(access_token).await? {
            Some(claims) if claims.role != ROLE_RESET => claims,
            _ => return Err(AppError::InvalidToken),
        };

        let user = self
            .users
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(Identity {
            id: user.id,
            username: user.username,
            role: user.role,
        })
    }

    async fn list_revoked(&self) -> AppResult<Vec<String>> {
        self.tokens.revoked_tokens().await
    }

    async fn revoke_token(&self, token: &str) -> AppResult<()> {
        if self.tokens.is_revoked(token).await? {
            return Err(AppError::bad_request("Token is already revoked"));
        }

        self.tokens.revoke(token, None).await?;
        tracing::info!("Token revoked by administrator");
        Ok(())
    }
}
