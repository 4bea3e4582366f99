//! In-memory user directory for tests and local runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use common::{AppResult, OptionExt};
use domain::{DomainError, NewUser, User, UserRole};

use super::UserRepository;

/// `UserRepository` kept in a map, with the same uniqueness rules as the
/// `users` table.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify<F>(&self, id: Uuid, apply: F) -> AppResult<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or_not_found("User")?;
        apply(user);
        user.updated_at = chrono::Utc::now();
        Ok(user.clone())
    }

    async fn find_where<P>(&self, predicate: P) -> Option<User>
    where
        P: Fn(&User) -> bool,
    {
        self.users
            .read()
            .await
            .values()
            .find(|user| predicate(user))
            .cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.find_where(|u| u.username == username).await)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.find_where(|u| u.email == email).await)
    }

    async fn find_by_refresh_token(&self, token: &str) -> AppResult<Option<User>> {
        Ok(self.find_where(|u| u.holds_refresh_token(token)).await)
    }

    async fn exists_by_username_or_email(&self, username: &str, email: &str) -> AppResult<bool> {
        Ok(self
            .find_where(|u| u.username == username || u.email == email)
            .await
            .is_some())
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(DomainError::DuplicateIdentity.into());
        }

        let user = User::new(new_user);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> AppResult<()> {
        self.modify(id, |user| user.refresh_token = token).await?;
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> AppResult<()> {
        self.modify(id, |user| user.password_hash = password_hash)
            .await?;
        Ok(())
    }

    async fn update_identity(
        &self,
        id: Uuid,
        username: String,
        email: String,
    ) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != id && (u.username == username || u.email == email))
        {
            return Err(DomainError::DuplicateIdentity.into());
        }

        let user = users.get_mut(&id).ok_or_not_found("User")?;
        user.username = username;
        user.email = email;
        user.updated_at = chrono::Utc::now();
        Ok(user.clone())
    }

    async fn update_role(&self, id: Uuid, role: String) -> AppResult<User> {
        self.modify(id, |user| user.role = UserRole::from(role)).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_not_found("User")
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }
}
