use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::helpers::email::derive_email;
use crate::application::validators::is_valid_local_part;
use crate::entities::email_request::{
    EmailRequest, EmailRequestWithUser, RequestStatus, RequesterInfo,
};
use crate::entities::mail_entry::{MailEntry, MailboxStatus};
use crate::entities::user::User;
use crate::ports::mail_server::MailServerClient;
use crate::ports::notifier::{Notification, Notifier};
use crate::use_cases::auth::UserRepo;
use crate::use_cases::mail::{MailEntryRepo, NewMailEntry};
use crate::use_cases::mail_domain::DomainUseCases;

#[derive(Debug, Clone)]
pub struct NewEmailRequest {
    pub username: String,
    pub reason: String,
}

#[async_trait]
pub trait EmailRequestRepo: Send + Sync {
    async fn create(&self, user_id: Uuid, new_request: &NewEmailRequest)
    -> AppResult<EmailRequest>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<EmailRequest>>;
    async fn list_all(&self) -> AppResult<Vec<EmailRequestWithUser>>;
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<EmailRequest>>;
    async fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        admin_reply: Option<&str>,
    ) -> AppResult<EmailRequest>;
}

#[derive(Debug, Clone)]
pub struct ApproveRequest {
    pub password: String,
    pub status: String,
    pub create_on_server: bool,
}

#[derive(Clone)]
pub struct RequestUseCases {
    requests: Arc<dyn EmailRequestRepo>,
    users: Arc<dyn UserRepo>,
    mail_entries: Arc<dyn MailEntryRepo>,
    domains: DomainUseCases,
    mail_server: Arc<dyn MailServerClient>,
    notifier: Arc<dyn Notifier>,
    mailbox_quota_mb: i64,
}

impl RequestUseCases {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        requests: Arc<dyn EmailRequestRepo>,
        users: Arc<dyn UserRepo>,
        mail_entries: Arc<dyn MailEntryRepo>,
        domains: DomainUseCases,
        mail_server: Arc<dyn MailServerClient>,
        notifier: Arc<dyn Notifier>,
        mailbox_quota_mb: i64,
    ) -> Self {
        Self {
            requests,
            users,
            mail_entries,
            domains,
            mail_server,
            notifier,
            mailbox_quota_mb,
        }
    }

    /// Creates a batch of pending requests and notifies connected admins.
    #[instrument(skip(self, items))]
    pub async fn submit(
        &self,
        requester: &User,
        items: Vec<NewEmailRequest>,
    ) -> AppResult<Vec<EmailRequest>> {
        if items.is_empty() {
            return Err(AppError::InvalidInput(
                "Requests must be a non-empty array.".into(),
            ));
        }
        for item in &items {
            if !is_valid_local_part(item.username.trim()) || item.reason.trim().is_empty() {
                return Err(AppError::InvalidInput(
                    "Each request needs a valid username and a reason.".into(),
                ));
            }
        }

        // One insert per item; there is no batch atomicity requirement.
        let mut created = Vec::with_capacity(items.len());
        for item in &items {
            created.push(self.requests.create(requester.id, item).await?);
        }

        let with_user: Vec<EmailRequestWithUser> = created
            .iter()
            .cloned()
            .map(|request| EmailRequestWithUser {
                request,
                user: RequesterInfo {
                    id: requester.id,
                    username: requester.username.clone(),
                    name: requester.name.clone(),
                },
            })
            .collect();
        self.notifier
            .publish(Notification::NewRequest {
                requests: with_user,
            })
            .await;

        Ok(created)
    }

    pub async fn list_own(&self, user_id: Uuid) -> AppResult<Vec<EmailRequest>> {
        self.requests.list_for_user(user_id).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<EmailRequestWithUser>> {
        self.requests.list_all().await
    }

    /// pending -> approved. Provisions remotely first when asked; a provider
    /// failure aborts before anything local is written, so local and remote
    /// state cannot diverge on this path.
    #[instrument(skip(self, input))]
    pub async fn approve(&self, id: Uuid, input: ApproveRequest) -> AppResult<MailEntry> {
        if input.password.is_empty() || input.status.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Password and status are required.".into(),
            ));
        }
        let status = MailboxStatus::parse(input.status.trim())
            .ok_or_else(|| AppError::InvalidInput("Status must be active or deactive.".into()))?;

        let request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Request"))?;
        if !request.is_pending() {
            return Err(AppError::Conflict("Request is not pending.".into()));
        }

        let requester = self
            .users
            .find_by_id(request.user_id)
            .await?
            .ok_or(AppError::NotFound("Requesting user"))?;

        let domain = self.domains.require().await?;
        let email = derive_email(&request.username, &domain.domain);

        if self.mail_entries.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists.".into()));
        }

        if input.create_on_server {
            self.mail_server
                .create_mailbox(
                    request.username.trim(),
                    &domain.domain,
                    &input.password,
                    &requester.username,
                    self.mailbox_quota_mb,
                )
                .await?;
        }

        let entry = self
            .mail_entries
            .create(NewMailEntry {
                email,
                password: input.password,
                user_id: request.user_id,
                status,
                reason: request.reason.clone(),
            })
            .await?;

        self.requests
            .set_status(id, RequestStatus::Approved, None)
            .await?;

        Ok(entry)
    }

    /// pending -> rejected, with an optional reply shown to the requester.
    #[instrument(skip(self))]
    pub async fn reject(&self, id: Uuid, admin_reply: Option<&str>) -> AppResult<EmailRequest> {
        let request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Request"))?;
        if !request.is_pending() {
            return Err(AppError::Conflict("Request is not pending.".into()));
        }

        self.requests
            .set_status(id, RequestStatus::Rejected, admin_reply)
            .await
    }
}
