use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::adapters::http::{app_state::AppState, extract::current_user};
use crate::app_error::AppResult;
use crate::application::policy::{Action, Ownership, require};
use crate::entities::user::Role;
use crate::use_cases::mail::{CreateMailEntry, UpdateMailEntry};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/{id}", put(update_entry).delete(delete_entry))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMailPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    user: Option<Uuid>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    create_on_server: bool,
}

async fn create_entry(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateMailPayload>,
) -> AppResult<impl IntoResponse> {
    let caller = current_user(&app_state, &headers).await?;
    require(caller.role, Action::CreateMailEntry, Ownership::NotApplicable)?;

    let user_id = payload.user.ok_or_else(|| {
        crate::app_error::AppError::InvalidInput("All mail fields are required.".into())
    })?;

    let entry = app_state
        .mail_use_cases
        .create_entry(CreateMailEntry {
            username: payload.username,
            password: payload.password,
            user_id,
            status: payload.status,
            reason: payload.reason,
            create_on_server: payload.create_on_server,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Mail entry created.", "entry": entry })),
    ))
}

async fn list_entries(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let caller = current_user(&app_state, &headers).await?;
    require(caller.role, Action::ViewMailEntry, Ownership::Own)?;

    let entries = app_state.mail_use_cases.list_for(&caller).await?;
    Ok(Json(json!({ "entries": entries })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMailPayload {
    email: Option<String>,
    password: Option<String>,
    user: Option<Uuid>,
    status: Option<String>,
    reason: Option<String>,
}

async fn update_entry(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMailPayload>,
) -> AppResult<impl IntoResponse> {
    let caller = current_user(&app_state, &headers).await?;

    let entry = app_state.mail_use_cases.get_entry(id).await?;
    let ownership = if entry.user_id == caller.id {
        Ownership::Own
    } else {
        Ownership::Other
    };
    let action = match caller.role {
        Role::Admin => Action::UpdateMailEntry,
        Role::User => Action::UpdateMailEntryPassword,
    };
    require(caller.role, action, ownership)?;

    let updated = app_state
        .mail_use_cases
        .update_entry(
            &caller,
            entry,
            UpdateMailEntry {
                email: payload.email,
                password: payload.password,
                user_id: payload.user,
                status: payload.status,
                reason: payload.reason,
            },
        )
        .await?;

    Ok(Json(json!({ "message": "Mail entry updated.", "entry": updated })))
}

async fn delete_entry(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let caller = current_user(&app_state, &headers).await?;
    require(caller.role, Action::DeleteMailEntry, Ownership::NotApplicable)?;

    app_state.mail_use_cases.delete_entry(id).await?;
    Ok(Json(json!({ "message": "Mail entry deleted." })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    use crate::entities::mail_entry::MailboxStatus;
    use crate::entities::user::User;
    use crate::test_utils::{
        TestApp, TestAppStateBuilder, create_test_mail_entry, create_test_user, token_for,
    };

    fn server(app: &TestApp) -> TestServer {
        TestServer::new(router().with_state(app.state.clone())).unwrap()
    }

    fn admin() -> User {
        create_test_user(|u| {
            u.username = "root".into();
            u.role = Role::Admin;
        })
    }

    #[tokio::test]
    async fn admin_creates_an_entry_for_a_user() {
        let root = admin();
        let alice = create_test_user(|u| u.username = "alice".into());
        let app = TestAppStateBuilder::new()
            .with_user(root.clone())
            .with_user(alice.clone())
            .with_domain("example.com")
            .build();
        let server = server(&app);

        let response = server
            .post("/")
            .add_header("authorization", format!("Bearer {}", token_for(&root)))
            .json(&json!({
                "username": "alice.w",
                "password": "secret",
                "user": alice.id,
                "status": "active",
                "reason": "work",
                "createOnServer": true,
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["entry"]["email"], "alice.w@example.com");
        assert_eq!(app.mail_server.created_calls(), vec!["alice.w@example.com"]);
    }

    #[tokio::test]
    async fn non_admin_cannot_create_entries() {
        let alice = create_test_user(|u| u.username = "alice".into());
        let app = TestAppStateBuilder::new()
            .with_user(alice.clone())
            .with_domain("example.com")
            .build();
        let server = server(&app);

        let response = server
            .post("/")
            .add_header("authorization", format!("Bearer {}", token_for(&alice)))
            .json(&json!({
                "username": "alice.w",
                "password": "secret",
                "user": alice.id,
                "status": "active",
                "reason": "work",
            }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_caller_for_non_admins() {
        let root = admin();
        let alice = create_test_user(|u| u.username = "alice".into());
        let bob = create_test_user(|u| u.username = "bob".into());
        let alice_entry =
            create_test_mail_entry(alice.id, |e| e.email = "alice@example.com".into());
        let bob_entry = create_test_mail_entry(bob.id, |e| e.email = "bob@example.com".into());
        let app = TestAppStateBuilder::new()
            .with_user(root.clone())
            .with_user(alice.clone())
            .with_user(bob)
            .with_domain("example.com")
            .with_mail_entry(alice_entry)
            .with_mail_entry(bob_entry)
            .build();
        let server = server(&app);

        let response = server
            .get("/")
            .add_header("authorization", format!("Bearer {}", token_for(&alice)))
            .await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["entries"].as_array().unwrap().len(), 1);
        assert_eq!(body["entries"][0]["email"], "alice@example.com");
        assert_eq!(body["entries"][0]["user"]["username"], "alice");

        let response = server
            .get("/")
            .add_header("authorization", format!("Bearer {}", token_for(&root)))
            .await;
        let body: serde_json::Value = response.json();
        assert_eq!(body["entries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn foreign_entry_update_by_non_admin_is_403_and_unchanged() {
        let alice = create_test_user(|u| u.username = "alice".into());
        let bob = create_test_user(|u| u.username = "bob".into());
        let bob_entry = create_test_mail_entry(bob.id, |e| {
            e.email = "bob@example.com".into();
            e.password = "original".into();
        });
        let app = TestAppStateBuilder::new()
            .with_user(alice.clone())
            .with_user(bob)
            .with_domain("example.com")
            .with_mail_entry(bob_entry.clone())
            .build();
        let server = server(&app);

        let response = server
            .put(&format!("/{}", bob_entry.id))
            .add_header("authorization", format!("Bearer {}", token_for(&alice)))
            .json(&json!({ "password": "stolen" }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(app.entries.get(bob_entry.id).unwrap().password, "original");
    }

    #[tokio::test]
    async fn owner_updates_password_but_not_other_fields() {
        let alice = create_test_user(|u| u.username = "alice".into());
        let entry = create_test_mail_entry(alice.id, |e| {
            e.email = "alice@example.com".into();
            e.status = MailboxStatus::Active;
        });
        let app = TestAppStateBuilder::new()
            .with_user(alice.clone())
            .with_domain("example.com")
            .with_mail_entry(entry.clone())
            .build();
        let server = server(&app);

        let response = server
            .put(&format!("/{}", entry.id))
            .add_header("authorization", format!("Bearer {}", token_for(&alice)))
            .json(&json!({ "password": "rotated", "status": "deactive" }))
            .await;

        response.assert_status(StatusCode::OK);
        let stored = app.entries.get(entry.id).unwrap();
        assert_eq!(stored.password, "rotated");
        assert_eq!(stored.status, MailboxStatus::Active);
        // Password change was pushed to the mail server as well.
        assert_eq!(app.mail_server.updated_calls(), vec!["alice@example.com"]);
    }

    #[tokio::test]
    async fn admin_update_can_reassign_and_deactivate() {
        let root = admin();
        let alice = create_test_user(|u| u.username = "alice".into());
        let bob = create_test_user(|u| u.username = "bob".into());
        let entry = create_test_mail_entry(alice.id, |e| e.email = "shared@example.com".into());
        let app = TestAppStateBuilder::new()
            .with_user(root.clone())
            .with_user(alice)
            .with_user(bob.clone())
            .with_domain("example.com")
            .with_mail_entry(entry.clone())
            .build();
        let server = server(&app);

        let response = server
            .put(&format!("/{}", entry.id))
            .add_header("authorization", format!("Bearer {}", token_for(&root)))
            .json(&json!({ "user": bob.id, "status": "deactive" }))
            .await;

        response.assert_status(StatusCode::OK);
        let stored = app.entries.get(entry.id).unwrap();
        assert_eq!(stored.user_id, bob.id);
        assert_eq!(stored.status, MailboxStatus::Deactive);
        // No password change, so nothing was synced remotely.
        assert!(app.mail_server.updated_calls().is_empty());
    }

    #[tokio::test]
    async fn delete_is_admin_only_and_removes_remotely_best_effort() {
        let root = admin();
        let alice = create_test_user(|u| u.username = "alice".into());
        let entry = create_test_mail_entry(alice.id, |e| e.email = "alice@example.com".into());
        let app = TestAppStateBuilder::new()
            .with_user(root.clone())
            .with_user(alice.clone())
            .with_domain("example.com")
            .with_mail_entry(entry.clone())
            .build();
        app.mail_server.fail_delete();
        let server = server(&app);

        let response = server
            .delete(&format!("/{}", entry.id))
            .add_header("authorization", format!("Bearer {}", token_for(&alice)))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server
            .delete(&format!("/{}", entry.id))
            .add_header("authorization", format!("Bearer {}", token_for(&root)))
            .await;
        response.assert_status(StatusCode::OK);
        assert!(app.entries.get(entry.id).is_none());
    }

    #[tokio::test]
    async fn unknown_entry_is_404() {
        let root = admin();
        let app = TestAppStateBuilder::new().with_user(root.clone()).build();
        let server = server(&app);

        let response = server
            .put(&format!("/{}", Uuid::new_v4()))
            .add_header("authorization", format!("Bearer {}", token_for(&root)))
            .json(&json!({ "password": "x" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
