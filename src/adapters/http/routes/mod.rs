pub mod admin;
pub mod auth;
pub mod events;
pub mod mail;
pub mod user;

use axum::{Json, Router, routing::get};

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/mails", mail::router())
        .nest("/users", user::router())
        .route("/events", get(events::events))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
