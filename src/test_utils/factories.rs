//! Test data factories. Each function creates a complete, valid object with
//! sensible defaults; use the closure parameter to override fields.

use chrono::NaiveDateTime;
use secrecy::SecretString;
use time::Duration;
use uuid::Uuid;

use crate::application::jwt;
use crate::entities::email_request::{EmailRequest, RequestStatus};
use crate::entities::mail_entry::{MailEntry, MailboxStatus};
use crate::entities::user::{Role, User};
use crate::ports::mail_server::RemoteMailbox;

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// Every factory user can log in with this password.
pub const TEST_PASSWORD: &str = "password123";

pub fn test_datetime() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Issue a valid bearer token for the given user, signed with the test secret.
pub fn token_for(user: &User) -> String {
    jwt::issue(
        user.id,
        &SecretString::new(TEST_JWT_SECRET.into()),
        Duration::hours(1),
    )
    .unwrap()
}

pub fn create_test_user(overrides: impl FnOnce(&mut User)) -> User {
    // Low bcrypt cost to keep login tests fast.
    let mut user = User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        name: "Alice".to_string(),
        password_hash: bcrypt::hash(TEST_PASSWORD, 4).unwrap(),
        role: Role::User,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut user);
    user
}

pub fn create_test_mail_entry(user_id: Uuid, overrides: impl FnOnce(&mut MailEntry)) -> MailEntry {
    let mut entry = MailEntry {
        id: Uuid::new_v4(),
        email: "alice.w@example.com".to_string(),
        password: "secret".to_string(),
        user_id,
        status: MailboxStatus::Active,
        reason: "work".to_string(),
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut entry);
    entry
}

pub fn create_test_request(
    user_id: Uuid,
    overrides: impl FnOnce(&mut EmailRequest),
) -> EmailRequest {
    let mut request = EmailRequest {
        id: Uuid::new_v4(),
        user_id,
        username: "alice.w".to_string(),
        reason: "work".to_string(),
        status: RequestStatus::Pending,
        admin_reply: String::new(),
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut request);
    request
}

pub fn create_test_remote_mailbox(username: &str) -> RemoteMailbox {
    RemoteMailbox {
        username: username.to_string(),
        name: Some("Mailbox".to_string()),
        active: Some(serde_json::json!(1)),
        messages: Some(serde_json::json!(0)),
        created: Some(serde_json::json!("2024-01-01")),
    }
}
