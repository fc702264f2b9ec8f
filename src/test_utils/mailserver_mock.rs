//! Scripted stand-in for the external mail server.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::app_error::{AppError, AppResult};
use crate::ports::mail_server::{MailServerClient, RemoteMailbox, RemoteMailboxUpdate};
use crate::test_utils::create_test_remote_mailbox;

#[derive(Default)]
pub struct MockMailServer {
    mailboxes: Mutex<Vec<RemoteMailbox>>,
    fail_list: AtomicBool,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
    created: Mutex<Vec<String>>,
    updated: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MockMailServer {
    /// Replace the provider-side mailbox list.
    pub fn seed_mailboxes(&self, usernames: Vec<&str>) {
        *self.mailboxes.lock().unwrap() = usernames
            .into_iter()
            .map(create_test_remote_mailbox)
            .collect();
    }

    pub fn fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn unfail_list(&self) {
        self.fail_list.store(false, Ordering::SeqCst);
    }

    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_update(&self) {
        self.fail_update.store(true, Ordering::SeqCst);
    }

    pub fn fail_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub fn created_calls(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated_calls(&self) -> Vec<String> {
        self.updated.lock().unwrap().clone()
    }

    pub fn deleted_calls(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailServerClient for MockMailServer {
    async fn create_mailbox(
        &self,
        local_part: &str,
        domain: &str,
        _password: &str,
        _display_name: &str,
        _quota_mb: i64,
    ) -> AppResult<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Provider(
                "Failed to create mailbox on server: mock failure".into(),
            ));
        }
        let email = format!("{local_part}@{domain}");
        self.created.lock().unwrap().push(email);
        self.mailboxes
            .lock()
            .unwrap()
            .push(create_test_remote_mailbox(local_part));
        Ok(())
    }

    async fn list_mailboxes(&self) -> AppResult<Vec<RemoteMailbox>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::Provider("Failed to fetch mail server data".into()));
        }
        Ok(self.mailboxes.lock().unwrap().clone())
    }

    async fn update_mailbox(&self, email: &str, _update: &RemoteMailboxUpdate) -> AppResult<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(AppError::Provider(
                "Failed to update mailbox on server: mock failure".into(),
            ));
        }
        self.updated.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn delete_mailbox(&self, email: &str) -> AppResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Provider(
                "Failed to delete mailbox from server: mock failure".into(),
            ));
        }
        self.deleted.lock().unwrap().push(email.to_string());
        Ok(())
    }
}
