use async_trait::async_trait;
use serde::Serialize;

use crate::entities::email_request::EmailRequestWithUser;
use crate::ports::mail_server::RemoteMailbox;

/// Events pushed to connected admin clients. Serialized as
/// `{"event": "...", "data": {...}}` text frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    NewRequest { requests: Vec<EmailRequestWithUser> },
    #[serde(rename_all = "camelCase")]
    NewMailboxes { new_mailboxes: Vec<RemoteMailbox> },
}

/// Fan-out publish; delivery is best-effort to currently connected
/// subscribers only.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, notification: Notification);
}
