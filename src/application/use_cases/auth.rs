use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use time::Duration;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::{jwt, password};
use crate::entities::user::{Role, User};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, new_user: NewUser) -> AppResult<User>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn list(&self, role: Option<Role>) -> AppResult<Vec<User>>;
    async fn update(&self, user: &User) -> AppResult<User>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct AuthUseCases {
    users: Arc<dyn UserRepo>,
    jwt_secret: SecretString,
    token_ttl: Duration,
}

impl AuthUseCases {
    pub fn new(users: Arc<dyn UserRepo>, jwt_secret: SecretString, token_ttl: Duration) -> Self {
        Self {
            users,
            jwt_secret,
            token_ttl,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::InvalidInput(
                "Username and password are required.".into(),
            ));
        }

        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !password::verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let token = jwt::issue(user.id, &self.jwt_secret, self.token_ttl)?;
        Ok((token, user))
    }

    /// Resolve a bearer token to its user. Fails closed on any token defect.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        let claims = jwt::verify(token, &self.jwt_secret)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token.".into()))?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryUserRepo, create_test_user};

    fn use_cases(users: Arc<InMemoryUserRepo>) -> AuthUseCases {
        AuthUseCases::new(
            users,
            SecretString::new("test_jwt_secret".into()),
            Duration::hours(1),
        )
    }

    #[tokio::test]
    async fn login_returns_token_accepted_by_authenticate() {
        let user = create_test_user(|u| u.username = "alice".into());
        let users = Arc::new(InMemoryUserRepo::with_users(vec![user.clone()]));
        let auth = use_cases(users);

        let (token, logged_in) = auth.login("alice", "password123").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        let resolved = auth.authenticate(&token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let user = create_test_user(|u| u.username = "alice".into());
        let auth = use_cases(Arc::new(InMemoryUserRepo::with_users(vec![user])));

        let err = auth.login("alice", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_rejects_unknown_user() {
        let auth = use_cases(Arc::new(InMemoryUserRepo::default()));

        let err = auth.login("ghost", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let auth = use_cases(Arc::new(InMemoryUserRepo::default()));

        let err = auth.login("", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let err = auth.login("alice", "").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn authenticate_rejects_token_for_deleted_user() {
        let user = create_test_user(|u| u.username = "alice".into());
        let users = Arc::new(InMemoryUserRepo::with_users(vec![user.clone()]));
        let auth = use_cases(users.clone());

        let (token, _) = auth.login("alice", "password123").await.unwrap();
        users.delete(user.id).await.unwrap();

        let err = auth.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
