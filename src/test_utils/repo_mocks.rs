//! In-memory implementations of the repository traits and the notifier port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::entities::email_request::{
    EmailRequest, EmailRequestWithUser, RequestStatus, RequesterInfo,
};
use crate::entities::mail_domain::MailDomain;
use crate::entities::mail_entry::{MailEntry, MailEntryWithUser};
use crate::entities::user::{Role, User};
use crate::ports::notifier::{Notification, Notifier};
use crate::test_utils::test_datetime;
use crate::use_cases::auth::{NewUser, UserRepo};
use crate::use_cases::mail::{MailEntryRepo, NewMailEntry};
use crate::use_cases::mail_domain::DomainRepo;
use crate::use_cases::requests::{EmailRequestRepo, NewEmailRequest};

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepo {
    pub fn with_users(users: Vec<User>) -> Self {
        let map = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(map),
        }
    }

    /// Seed helper bypassing the duplicate check.
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    fn requester_info(&self, id: Uuid) -> RequesterInfo {
        let users = self.users.lock().unwrap();
        match users.get(&id) {
            Some(user) => RequesterInfo {
                id: user.id,
                username: user.username.clone(),
                name: user.name.clone(),
            },
            None => RequesterInfo {
                id,
                username: "<deleted>".to_string(),
                name: String::new(),
            },
        }
    }

    fn public_owner(&self, id: Uuid) -> crate::entities::user::PublicUser {
        let users = self.users.lock().unwrap();
        match users.get(&id) {
            Some(user) => user.public(),
            None => crate::entities::user::PublicUser {
                id,
                username: "<deleted>".to_string(),
                name: String::new(),
                role: Role::User,
            },
        }
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.username == new_user.username) {
            return Err(AppError::Conflict("Username already exists.".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: Some(test_datetime()),
            updated_at: Some(test_datetime()),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list(&self, role: Option<Role>) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(AppError::NotFound("User"));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.users.lock().unwrap().remove(&id);
        Ok(())
    }
}

// ============================================================================
// Domain singleton
// ============================================================================

#[derive(Default)]
pub struct InMemoryDomainRepo {
    domain: Mutex<Option<MailDomain>>,
}

impl InMemoryDomainRepo {
    pub fn with_domain(domain: &str) -> Self {
        Self {
            domain: Mutex::new(Some(MailDomain {
                id: Uuid::new_v4(),
                domain: domain.to_string(),
                created_at: Some(test_datetime()),
                updated_at: Some(test_datetime()),
            })),
        }
    }
}

#[async_trait]
impl DomainRepo for InMemoryDomainRepo {
    async fn get(&self) -> AppResult<Option<MailDomain>> {
        Ok(self.domain.lock().unwrap().clone())
    }

    async fn upsert(&self, domain: &str) -> AppResult<MailDomain> {
        let mut slot = self.domain.lock().unwrap();
        let updated = match slot.take() {
            Some(mut existing) => {
                existing.domain = domain.to_string();
                existing.updated_at = Some(test_datetime());
                existing
            }
            None => MailDomain {
                id: Uuid::new_v4(),
                domain: domain.to_string(),
                created_at: Some(test_datetime()),
                updated_at: Some(test_datetime()),
            },
        };
        *slot = Some(updated.clone());
        Ok(updated)
    }
}

// ============================================================================
// Mail entries
// ============================================================================

pub struct InMemoryMailEntryRepo {
    entries: Mutex<HashMap<Uuid, MailEntry>>,
    users: Arc<InMemoryUserRepo>,
}

impl InMemoryMailEntryRepo {
    pub fn new(users: Arc<InMemoryUserRepo>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            users,
        }
    }

    pub fn insert(&self, entry: MailEntry) {
        self.entries.lock().unwrap().insert(entry.id, entry);
    }

    pub fn get(&self, id: Uuid) -> Option<MailEntry> {
        self.entries.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<MailEntry> {
        self.entries.lock().unwrap().values().cloned().collect()
    }

    fn join(&self, entry: MailEntry) -> MailEntryWithUser {
        MailEntryWithUser {
            user: self.users.public_owner(entry.user_id),
            entry,
        }
    }

    fn sorted_desc(mut entries: Vec<MailEntry>) -> Vec<MailEntry> {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}

#[async_trait]
impl MailEntryRepo for InMemoryMailEntryRepo {
    async fn create(&self, new_entry: NewMailEntry) -> AppResult<MailEntry> {
        let mut entries = self.entries.lock().unwrap();
        if entries
            .values()
            .any(|e| e.email.eq_ignore_ascii_case(&new_entry.email))
        {
            return Err(AppError::Conflict("Email already exists.".into()));
        }
        let entry = MailEntry {
            id: Uuid::new_v4(),
            email: new_entry.email,
            password: new_entry.password,
            user_id: new_entry.user_id,
            status: new_entry.status,
            reason: new_entry.reason,
            created_at: Some(test_datetime()),
            updated_at: Some(test_datetime()),
        };
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MailEntry>> {
        Ok(self.entries.lock().unwrap().get(&id).cloned())
    }

    async fn find_with_user(&self, id: Uuid) -> AppResult<Option<MailEntryWithUser>> {
        let entry = self.entries.lock().unwrap().get(&id).cloned();
        Ok(entry.map(|e| self.join(e)))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<MailEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<MailEntryWithUser>> {
        let entries = Self::sorted_desc(self.all());
        Ok(entries.into_iter().map(|e| self.join(e)).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<MailEntryWithUser>> {
        let entries = Self::sorted_desc(
            self.all()
                .into_iter()
                .filter(|e| e.user_id == user_id)
                .collect(),
        );
        Ok(entries.into_iter().map(|e| self.join(e)).collect())
    }

    async fn list_emails(&self) -> AppResult<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .values()
            .map(|e| e.email.clone())
            .collect())
    }

    async fn update(&self, entry: &MailEntry) -> AppResult<MailEntry> {
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(&entry.id) {
            return Err(AppError::NotFound("Mail entry"));
        }
        entries.insert(entry.id, entry.clone());
        Ok(entry.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.entries.lock().unwrap().remove(&id);
        Ok(())
    }
}

// ============================================================================
// Email requests
// ============================================================================

pub struct InMemoryEmailRequestRepo {
    requests: Mutex<HashMap<Uuid, EmailRequest>>,
    users: Arc<InMemoryUserRepo>,
}

impl InMemoryEmailRequestRepo {
    pub fn new(users: Arc<InMemoryUserRepo>) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            users,
        }
    }

    pub fn insert(&self, request: EmailRequest) {
        self.requests.lock().unwrap().insert(request.id, request);
    }

    pub fn get(&self, id: Uuid) -> Option<EmailRequest> {
        self.requests.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl EmailRequestRepo for InMemoryEmailRequestRepo {
    async fn create(
        &self,
        user_id: Uuid,
        new_request: &NewEmailRequest,
    ) -> AppResult<EmailRequest> {
        let request = EmailRequest {
            id: Uuid::new_v4(),
            user_id,
            username: new_request.username.trim().to_string(),
            reason: new_request.reason.trim().to_string(),
            status: RequestStatus::Pending,
            admin_reply: String::new(),
            created_at: Some(test_datetime()),
            updated_at: Some(test_datetime()),
        };
        self.requests
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<EmailRequest>> {
        Ok(self.requests.lock().unwrap().get(&id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<EmailRequestWithUser>> {
        let mut requests: Vec<EmailRequest> =
            self.requests.lock().unwrap().values().cloned().collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests
            .into_iter()
            .map(|request| EmailRequestWithUser {
                user: self.users.requester_info(request.user_id),
                request,
            })
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<EmailRequest>> {
        let mut requests: Vec<EmailRequest> = self
            .requests
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        admin_reply: Option<&str>,
    ) -> AppResult<EmailRequest> {
        let mut requests = self.requests.lock().unwrap();
        let request = requests.get_mut(&id).ok_or(AppError::NotFound("Request"))?;
        request.status = status;
        if let Some(reply) = admin_reply {
            request.admin_reply = reply.to_string();
        }
        request.updated_at = Some(test_datetime());
        Ok(request.clone())
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Records published notifications for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn published(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, notification: Notification) {
        self.events.lock().unwrap().push(notification);
    }
}
