use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app_error::AppResult;

/// A mailbox as reported by the external mail server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMailbox {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct RemoteMailboxUpdate {
    pub password: Option<String>,
    pub active: Option<bool>,
}

/// Thin client over the third-party mailbox API. Calls are one-shot: no
/// retries here, callers decide whether a failure is fatal.
#[async_trait]
pub trait MailServerClient: Send + Sync {
    async fn create_mailbox(
        &self,
        local_part: &str,
        domain: &str,
        password: &str,
        display_name: &str,
        quota_mb: i64,
    ) -> AppResult<()>;

    async fn list_mailboxes(&self) -> AppResult<Vec<RemoteMailbox>>;

    async fn update_mailbox(&self, email: &str, update: &RemoteMailboxUpdate) -> AppResult<()>;

    async fn delete_mailbox(&self, email: &str) -> AppResult<()>;
}
