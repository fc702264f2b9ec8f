//! HTTP client for the mailcow-style mail server API.
//!
//! Single-shot calls: any transport error, non-success status, or
//! non-success result item is surfaced as a provider error and left to the
//! caller to interpret. No retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::app_error::{AppError, AppResult};
use crate::infra::http_client::build_client;
use crate::ports::mail_server::{MailServerClient, RemoteMailbox, RemoteMailboxUpdate};

#[derive(Clone)]
pub struct MailcowClient {
    client: Client,
    base_url: Url,
    read_api_key: String,
    write_api_key: String,
}

/// One element of the `[{type, msg}]` arrays the write endpoints return.
#[derive(Debug, Deserialize)]
struct MailcowResult {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    msg: serde_json::Value,
}

impl MailcowClient {
    pub fn new(base_url: Url, read_api_key: String, write_api_key: String) -> Self {
        Self {
            client: build_client(),
            base_url,
            read_api_key,
            write_api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn post_write(
        &self,
        path: &str,
        body: serde_json::Value,
        context: &str,
    ) -> AppResult<()> {
        let response = self
            .client
            .post(self.url(path))
            .header("X-API-Key", &self.write_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("{context}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("{context}: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "Mail server error response");
            return Err(AppError::Provider(format!(
                "{context}: {}",
                extract_error_message(&text)
            )));
        }

        check_write_result(&text).map_err(|msg| {
            tracing::error!(body = %text, "Mail server call unsuccessful");
            AppError::Provider(format!("{context}: {msg}"))
        })
    }
}

/// Pull the most useful message out of an error body, falling back to the
/// raw text when it is not the JSON we expect.
fn extract_error_message(body: &str) -> String {
    if let Ok(results) = serde_json::from_str::<Vec<MailcowResult>>(body)
        && let Some(first) = results.first()
    {
        return result_message(&first.msg);
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }

    if body.trim().is_empty() {
        "Unknown error".into()
    } else {
        body.trim().to_string()
    }
}

/// A 200 from a write endpoint still carries success/failure per item.
fn check_write_result(body: &str) -> Result<(), String> {
    match serde_json::from_str::<Vec<MailcowResult>>(body) {
        Ok(results) => match results.first() {
            Some(first) if first.kind == "success" => Ok(()),
            Some(first) => Err(result_message(&first.msg)),
            None => Err("Empty response".into()),
        },
        Err(_) => Err("Invalid response".into()),
    }
}

// msg can be a string or an array of fragments.
fn result_message(msg: &serde_json::Value) -> String {
    match msg {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        serde_json::Value::Null => "Unknown error".into(),
        other => other.to_string(),
    }
}

#[async_trait]
impl MailServerClient for MailcowClient {
    async fn create_mailbox(
        &self,
        local_part: &str,
        domain: &str,
        password: &str,
        display_name: &str,
        quota_mb: i64,
    ) -> AppResult<()> {
        let body = json!({
            "local_part": local_part,
            "domain": domain,
            "password": password,
            "password2": password,
            "name": display_name,
            "quota": quota_mb,
            "active": "1",
        });
        self.post_write(
            "/api/v1/add/mailbox",
            body,
            "Failed to create mailbox on server",
        )
        .await
    }

    async fn list_mailboxes(&self) -> AppResult<Vec<RemoteMailbox>> {
        let response = self
            .client
            .get(self.url("/api/v1/get/mailbox/all"))
            .header("X-API-Key", &self.read_api_key)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to fetch mail server data: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to fetch mail server data: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "Mail server list failed");
            return Err(AppError::Provider("Failed to fetch mail server data".into()));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(body = %text, error = %e, "Failed to parse mail server response");
            AppError::Provider(format!("Failed to parse mail server response: {e}"))
        })
    }

    async fn update_mailbox(&self, email: &str, update: &RemoteMailboxUpdate) -> AppResult<()> {
        let body = json!({
            "items": [email],
            "attr": edit_attr(update),
        });
        self.post_write(
            "/api/v1/edit/mailbox",
            body,
            "Failed to update mailbox on server",
        )
        .await
    }

    async fn delete_mailbox(&self, email: &str) -> AppResult<()> {
        let body = json!({ "items": [email] });
        self.post_write(
            "/api/v1/delete/mailbox",
            body,
            "Failed to delete mailbox from server",
        )
        .await
    }
}

fn edit_attr(update: &RemoteMailboxUpdate) -> serde_json::Value {
    let mut attr = serde_json::Map::new();
    if let Some(password) = &update.password {
        attr.insert("password".into(), json!(password));
        attr.insert("password2".into(), json!(password));
    }
    if let Some(active) = update.active {
        attr.insert("active".into(), json!(if active { "1" } else { "0" }));
    }
    serde_json::Value::Object(attr)
}
