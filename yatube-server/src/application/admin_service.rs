use tracing::info;

use crate::data::group_repository::{GroupRepository, NewGroup};
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::group::{Group, NewGroupRequest};
use crate::domain::user::{User, normalize_username};
use crate::infrastructure::jwt::JwtService;

#[derive(Debug, Clone)]
pub(crate) struct IssuedToken {
    pub(crate) user: User,
    pub(crate) access_token: String,
}

/// Back-office operations: seeding users and groups, minting bearer tokens.
pub(crate) struct AdminService<U: UserRepository, G: GroupRepository> {
    users: U,
    groups: G,
    jwt: JwtService,
}

impl<U: UserRepository, G: GroupRepository> AdminService<U, G> {
    pub(crate) fn new(users: U, groups: G, jwt: JwtService) -> Self {
        Self { users, groups, jwt }
    }

    pub(crate) async fn create_user(&self, username: &str) -> Result<User, DomainError> {
        let username = normalize_username(username)?;
        let user = self.users.create_user(&username).await?;
        info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub(crate) async fn create_group(&self, req: NewGroupRequest) -> Result<Group, DomainError> {
        let req = req.validate()?;
        let group = self
            .groups
            .create_group(NewGroup {
                title: req.title,
                slug: req.slug,
                description: req.description,
            })
            .await?;
        info!(group_id = group.id, slug = %group.slug, "group created");
        Ok(group)
    }

    pub(crate) async fn issue_token(&self, username: &str) -> Result<IssuedToken, DomainError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("username: {}", username.trim())))?;

        let access_token = self
            .jwt
            .generate_token(user.id, &user.username)
            .map_err(|err| DomainError::Unexpected(err.to_string()))?;

        Ok(IssuedToken { user, access_token })
    }
}
