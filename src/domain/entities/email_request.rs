use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn from_stored(s: &str) -> Self {
        match s {
            "approved" => RequestStatus::Approved,
            "rejected" => RequestStatus::Rejected,
            _ => RequestStatus::Pending,
        }
    }
}

/// A user's ask for a new mailbox, subject to admin approval.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub reason: String,
    pub status: RequestStatus,
    pub admin_reply: String,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

impl EmailRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Requester display info attached to admin-facing listings and events.
#[derive(Debug, Clone, Serialize)]
pub struct RequesterInfo {
    pub id: Uuid,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailRequestWithUser {
    #[serde(flatten)]
    pub request: EmailRequest,
    pub user: RequesterInfo,
}
