use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;

use crate::adapters::http::{app_state::AppState, extract::current_user};
use crate::app_error::AppResult;
use crate::application::policy::{Action, Ownership, require};
use crate::use_cases::requests::NewEmailRequest;
use crate::use_cases::users::UpdateProfile;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", put(update_me))
        .route("/requests", get(list_requests).post(submit_requests))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMePayload {
    username: Option<String>,
    name: Option<String>,
    password: Option<String>,
    current_password: Option<String>,
}

async fn update_me(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateMePayload>,
) -> AppResult<impl IntoResponse> {
    let caller = current_user(&app_state, &headers).await?;
    require(caller.role, Action::UpdateOwnProfile, Ownership::Own)?;

    let updated = app_state
        .user_use_cases
        .update_profile(
            caller.id,
            UpdateProfile {
                username: payload.username,
                name: payload.name,
                password: payload.password,
                current_password: payload.current_password,
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "Profile updated.",
        "user": updated.public(),
    })))
}

#[derive(Deserialize)]
struct RequestItemPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    reason: String,
}

#[derive(Deserialize)]
struct SubmitRequestsPayload {
    #[serde(default)]
    requests: Vec<RequestItemPayload>,
}

async fn submit_requests(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitRequestsPayload>,
) -> AppResult<impl IntoResponse> {
    let caller = current_user(&app_state, &headers).await?;
    require(caller.role, Action::SubmitRequest, Ownership::Own)?;

    let items: Vec<NewEmailRequest> = payload
        .requests
        .into_iter()
        .map(|item| NewEmailRequest {
            username: item.username,
            reason: item.reason,
        })
        .collect();

    let created = app_state.request_use_cases.submit(&caller, items).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Email requests submitted successfully.",
            "requests": created,
        })),
    ))
}

async fn list_requests(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let caller = current_user(&app_state, &headers).await?;
    require(caller.role, Action::SubmitRequest, Ownership::Own)?;

    let requests = app_state.request_use_cases.list_own(caller.id).await?;
    Ok(Json(json!({ "requests": requests })))
}
