use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::adapters::http::app_state::AppState;
use crate::app_error::{AppError, AppResult};
use crate::entities::user::User;

fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized.".into()))
}

/// Resolve the caller from the Authorization header; fails closed.
pub async fn current_user(app_state: &AppState, headers: &HeaderMap) -> AppResult<User> {
    let token = bearer_token(headers)?;
    app_state.auth_use_cases.authenticate(token).await
}
