use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::user::User;

#[async_trait]
pub(crate) trait UserRepository: Send + Sync {
    async fn create_user(&self, username: &str) -> Result<User, DomainError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;
}

#[async_trait]
impl<T> UserRepository for Arc<T>
where
    T: UserRepository + ?Sized,
{
    async fn create_user(&self, username: &str) -> Result<User, DomainError> {
        (**self).create_user(username).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        (**self).find_by_username(username).await
    }
}
