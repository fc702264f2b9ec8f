use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::adapters::http::{app_state::AppState, extract::current_user};
use crate::app_error::{AppError, AppResult};
use crate::application::policy::{Action, Ownership, require};
use crate::entities::user::Role;
use crate::ports::mail_server::RemoteMailboxUpdate;
use crate::use_cases::mail::ImportMailbox;
use crate::use_cases::requests::ApproveRequest;
use crate::use_cases::users::{CreateUser, UpdateUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .route("/domain", get(get_domain).put(put_domain))
        .route("/requests", get(list_requests))
        .route("/requests/{id}", put(update_request))
        .route("/requests/{id}/approve", put(approve_request))
        .route("/mail-server-mailboxes", get(list_remote_mailboxes))
        .route(
            "/mail-server-mailboxes/{email}",
            put(update_remote_mailbox).delete(delete_remote_mailbox),
        )
        .route("/import-mailbox", post(import_mailbox))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    role: String,
}

async fn create_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateUserPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ManageUsers, Ownership::NotApplicable)?;

    let created = app_state
        .user_use_cases
        .create_user(CreateUser {
            username: payload.username,
            name: payload.name,
            password: payload.password,
            role: payload.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully.",
            "user": created.public(),
        })),
    ))
}

#[derive(Deserialize)]
struct ListUsersQuery {
    role: Option<String>,
}

async fn list_users(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ManageUsers, Ownership::NotApplicable)?;

    let role = match query.role.as_deref() {
        Some(raw) => Some(
            Role::parse(raw)
                .ok_or_else(|| AppError::InvalidInput("Role must be admin or user.".into()))?,
        ),
        None => None,
    };

    let users = app_state.user_use_cases.list_users(role).await?;
    let users: Vec<_> = users.iter().map(|u| u.public()).collect();
    Ok(Json(json!({ "users": users })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    role: String,
    password: Option<String>,
}

async fn update_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ManageUsers, Ownership::NotApplicable)?;

    let updated = app_state
        .user_use_cases
        .update_user(
            id,
            UpdateUser {
                username: payload.username,
                name: payload.name,
                role: payload.role,
                password: payload.password,
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "User updated successfully.",
        "user": updated.public(),
    })))
}

async fn delete_user(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ManageUsers, Ownership::NotApplicable)?;

    app_state.user_use_cases.delete_user(id).await?;
    Ok(Json(json!({ "message": "User deleted successfully." })))
}

async fn get_domain(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ManageDomain, Ownership::NotApplicable)?;

    let domain = app_state.domain_use_cases.get_or_init().await?;
    Ok(Json(json!({ "domain": domain.domain })))
}

#[derive(Deserialize)]
struct PutDomainPayload {
    #[serde(default)]
    domain: String,
}

async fn put_domain(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PutDomainPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ManageDomain, Ownership::NotApplicable)?;

    let domain = app_state.domain_use_cases.set(&payload.domain).await?;
    Ok(Json(json!({
        "message": "Domain updated successfully.",
        "domain": domain.domain,
    })))
}

async fn list_requests(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ReviewRequests, Ownership::NotApplicable)?;

    let requests = app_state.request_use_cases.list_all().await?;
    Ok(Json(json!({ "requests": requests })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApprovePayload {
    #[serde(default)]
    password: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    create_on_server: bool,
}

async fn approve_request(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApprovePayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ReviewRequests, Ownership::NotApplicable)?;

    let mail = app_state
        .request_use_cases
        .approve(
            id,
            ApproveRequest {
                password: payload.password,
                status: payload.status,
                create_on_server: payload.create_on_server,
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "Request approved and mail created successfully.",
        "mail": mail,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequestPayload {
    status: Option<String>,
    admin_reply: Option<String>,
}

/// Rejection/annotation only; approval goes through the approve endpoint so a
/// request can never be marked approved without its mailbox.
async fn update_request(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRequestPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ReviewRequests, Ownership::NotApplicable)?;

    let status = payload
        .status
        .ok_or_else(|| AppError::InvalidInput("Status is required.".into()))?;
    if status != "rejected" {
        return Err(AppError::InvalidInput("Status must be rejected.".into()));
    }

    let request = app_state
        .request_use_cases
        .reject(id, payload.admin_reply.as_deref())
        .await?;

    Ok(Json(json!({
        "message": "Request updated successfully.",
        "request": request,
    })))
}

#[derive(Deserialize)]
struct ListRemoteQuery {
    all: Option<String>,
}

async fn list_remote_mailboxes(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListRemoteQuery>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(
        admin.role,
        Action::ManageRemoteMailboxes,
        Ownership::NotApplicable,
    )?;

    let all = query.all.as_deref() == Some("true");
    let mailboxes = app_state.mail_use_cases.list_remote(all).await?;
    Ok(Json(json!({ "mailboxes": mailboxes })))
}

#[derive(Deserialize)]
struct UpdateRemotePayload {
    password: Option<String>,
    active: Option<bool>,
}

async fn update_remote_mailbox(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(email): Path<String>,
    Json(payload): Json<UpdateRemotePayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(
        admin.role,
        Action::ManageRemoteMailboxes,
        Ownership::NotApplicable,
    )?;

    app_state
        .mail_use_cases
        .update_remote(
            &email,
            &RemoteMailboxUpdate {
                password: payload.password,
                active: payload.active,
            },
        )
        .await?;

    Ok(Json(json!({
        "message": "Mailbox updated successfully on mail server.",
    })))
}

async fn delete_remote_mailbox(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(
        admin.role,
        Action::ManageRemoteMailboxes,
        Ownership::NotApplicable,
    )?;

    app_state.mail_use_cases.delete_remote(&email).await?;
    Ok(Json(json!({
        "message": "Mailbox deleted successfully from mail server.",
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportMailboxPayload {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    user_id: Option<Uuid>,
}

async fn import_mailbox(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ImportMailboxPayload>,
) -> AppResult<impl IntoResponse> {
    let admin = current_user(&app_state, &headers).await?;
    require(admin.role, Action::ImportMailbox, Ownership::NotApplicable)?;

    let mail = app_state
        .mail_use_cases
        .import_mailbox(
            &admin,
            ImportMailbox {
                email: payload.email,
                password: payload.password,
                user_id: payload.user_id,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Mailbox imported successfully.",
            "mail": mail,
        })),
    ))
}
