use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::password;
use crate::entities::user::{Role, User};
use crate::use_cases::auth::{NewUser, UserRepo};

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct UpdateUser {
    pub username: String,
    pub name: String,
    pub role: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Clone)]
pub struct UserUseCases {
    users: Arc<dyn UserRepo>,
}

impl UserUseCases {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: CreateUser) -> AppResult<User> {
        if input.username.trim().is_empty()
            || input.name.trim().is_empty()
            || input.password.is_empty()
            || input.role.trim().is_empty()
        {
            return Err(AppError::InvalidInput(
                "Username, name, password, and role are required.".into(),
            ));
        }

        let role = Role::parse(input.role.trim())
            .ok_or_else(|| AppError::InvalidInput("Role must be admin or user.".into()))?;

        let username = input.username.trim().to_string();
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("Username already exists.".into()));
        }

        let password_hash = password::hash_password(&input.password)?;
        self.users
            .create(NewUser {
                username,
                name: input.name.trim().to_string(),
                password_hash,
                role,
            })
            .await
    }

    pub async fn list_users(&self, role: Option<Role>) -> AppResult<Vec<User>> {
        self.users.list(role).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(&self, id: Uuid, input: UpdateUser) -> AppResult<User> {
        if input.username.trim().is_empty()
            || input.name.trim().is_empty()
            || input.role.trim().is_empty()
        {
            return Err(AppError::InvalidInput(
                "Username, name, and role are required.".into(),
            ));
        }

        let role = Role::parse(input.role.trim())
            .ok_or_else(|| AppError::InvalidInput("Role must be admin or user.".into()))?;

        let mut user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        let username = input.username.trim().to_string();
        if username != user.username
            && self.users.find_by_username(&username).await?.is_some()
        {
            return Err(AppError::Conflict("Username already exists.".into()));
        }

        user.username = username;
        user.name = input.name.trim().to_string();
        user.role = role;
        if let Some(new_password) = input.password.filter(|p| !p.is_empty()) {
            user.password_hash = password::hash_password(&new_password)?;
        }

        self.users.update(&user).await
    }

    pub async fn delete_user(&self, id: Uuid) -> AppResult<()> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        self.users.delete(id).await
    }

    /// Self-service update; role is deliberately untouchable here.
    #[instrument(skip(self, input))]
    pub async fn update_profile(&self, user_id: Uuid, input: UpdateProfile) -> AppResult<User> {
        if input.username.is_none() && input.name.is_none() && input.password.is_none() {
            return Err(AppError::InvalidInput(
                "Provide username, name, or password to update.".into(),
            ));
        }

        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        if let Some(username) = input.username.map(|u| u.trim().to_string())
            && !username.is_empty()
            && username != user.username
        {
            if self.users.find_by_username(&username).await?.is_some() {
                return Err(AppError::Conflict("Username already exists.".into()));
            }
            user.username = username;
        }

        if let Some(name) = input.name.map(|n| n.trim().to_string())
            && !name.is_empty()
        {
            user.name = name;
        }

        if let Some(new_password) = input.password.filter(|p| !p.is_empty()) {
            let current = input.current_password.ok_or_else(|| {
                AppError::InvalidInput("Current password is required to change password.".into())
            })?;
            if !password::verify_password(&current, &user.password_hash)? {
                return Err(AppError::InvalidInput(
                    "Current password is incorrect.".into(),
                ));
            }
            user.password_hash = password::hash_password(&new_password)?;
        }

        self.users.update(&user).await
    }
}
