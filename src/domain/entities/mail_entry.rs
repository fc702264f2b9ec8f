use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::PublicUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailboxStatus {
    Active,
    Deactive,
}

impl MailboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailboxStatus::Active => "active",
            MailboxStatus::Deactive => "deactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MailboxStatus::Active),
            "deactive" => Some(MailboxStatus::Deactive),
            _ => None,
        }
    }

    pub fn from_stored(s: &str) -> Self {
        MailboxStatus::parse(s).unwrap_or(MailboxStatus::Deactive)
    }
}

/// Locally persisted record of a provisioned mailbox.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailEntry {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub user_id: Uuid,
    pub status: MailboxStatus,
    pub reason: String,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MailEntryWithUser {
    #[serde(flatten)]
    pub entry: MailEntry,
    pub user: PublicUser,
}
