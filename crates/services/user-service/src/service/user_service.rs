//! User service - administration of existing user records.
//!
//! Account creation and credentials live in the auth service; this layer
//! covers lookups, role changes and deletion.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use common::{AppResult, OptionExt};
use domain::{User, UserRole};

use crate::repository::UserRepository;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get user by ID
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    /// List all users
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Change a user's role; takes effect on that user's next request
    async fn update_role(&self, id: Uuid, role: &str) -> AppResult<User>;

    /// Delete a user
    async fn delete_user(&self, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.repo.find_by_id(id).await?.ok_or_not_found("User")
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repo.list().await
    }

    async fn update_role(&self, id: Uuid, role: &str) -> AppResult<User> {
        let role = UserRole::parse(role)?;
        let user = self.repo.update_role(id, role.to_string()).await?;
        tracing::info!(user_id = %id, role = %role, "User role changed");
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        self.repo.delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use common::AppError;
    use domain::NewUser;
    use mockall::predicate::eq;

    fn sample_user(role: UserRole) -> User {
        User::new(NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            role,
        })
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = UserManager::new(Arc::new(repo));
        let err = service.get_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(entity) if entity == "User"));
    }

    #[tokio::test]
    async fn test_update_role_rejects_unknown_role() {
        let mut repo = MockUserRepository::new();
        repo.expect_update_role().never();

        let service = UserManager::new(Arc::new(repo));
        let err = service
            .update_role(Uuid::new_v4(), "superuser")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_role_delegates_to_repository() {
        let id = Uuid::new_v4();
        let mut repo = MockUserRepository::new();
        repo.expect_update_role()
            .with(eq(id), eq("admin".to_string()))
            .times(1)
            .returning(|_, _| Ok(sample_user(UserRole::Admin)));

        let service = UserManager::new(Arc::new(repo));
        let user = service.update_role(id, "admin").await.unwrap();
        assert!(user.is_admin());
    }
}
