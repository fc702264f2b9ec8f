use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::adapters::http::{app_state::AppState, extract::current_user};
use crate::app_error::AppResult;
use crate::entities::user::PublicUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Deserialize)]
struct LoginPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: PublicUser,
}

async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    let (token, user) = app_state
        .auth_use_cases
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        user: user.public(),
    }))
}

#[derive(Serialize)]
struct MeResponse {
    user: PublicUser,
}

async fn me(State(app_state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    let user = current_user(&app_state, &headers).await?;
    Ok(Json(MeResponse {
        user: user.public(),
    }))
}
