use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::helpers::email::{derive_email, filter_unadopted};
use crate::application::validators::is_valid_local_part;
use crate::entities::mail_entry::{MailEntry, MailEntryWithUser, MailboxStatus};
use crate::entities::user::{Role, User};
use crate::ports::mail_server::{MailServerClient, RemoteMailbox, RemoteMailboxUpdate};
use crate::use_cases::auth::UserRepo;
use crate::use_cases::mail_domain::DomainUseCases;

#[derive(Debug, Clone)]
pub struct NewMailEntry {
    pub email: String,
    pub password: String,
    pub user_id: Uuid,
    pub status: MailboxStatus,
    pub reason: String,
}

#[async_trait]
pub trait MailEntryRepo: Send + Sync {
    async fn create(&self, new_entry: NewMailEntry) -> AppResult<MailEntry>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MailEntry>>;
    async fn find_with_user(&self, id: Uuid) -> AppResult<Option<MailEntryWithUser>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<MailEntry>>;
    async fn list_all(&self) -> AppResult<Vec<MailEntryWithUser>>;
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<MailEntryWithUser>>;
    async fn list_emails(&self) -> AppResult<Vec<String>>;
    async fn update(&self, entry: &MailEntry) -> AppResult<MailEntry>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct CreateMailEntry {
    pub username: String,
    pub password: String,
    pub user_id: Uuid,
    pub status: String,
    pub reason: String,
    pub create_on_server: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMailEntry {
    pub email: Option<String>,
    pub password: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportMailbox {
    pub email: String,
    pub password: String,
    pub user_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct MailUseCases {
    mail_entries: Arc<dyn MailEntryRepo>,
    users: Arc<dyn UserRepo>,
    domains: DomainUseCases,
    mail_server: Arc<dyn MailServerClient>,
    mailbox_quota_mb: i64,
}

impl MailUseCases {
    pub fn new(
        mail_entries: Arc<dyn MailEntryRepo>,
        users: Arc<dyn UserRepo>,
        domains: DomainUseCases,
        mail_server: Arc<dyn MailServerClient>,
        mailbox_quota_mb: i64,
    ) -> Self {
        Self {
            mail_entries,
            users,
            domains,
            mail_server,
            mailbox_quota_mb,
        }
    }

    /// Direct admin creation. A failed remote provision aborts the whole
    /// operation so no local record exists without its mailbox.
    #[instrument(skip(self, input))]
    pub async fn create_entry(&self, input: CreateMailEntry) -> AppResult<MailEntry> {
        if input.username.trim().is_empty()
            || input.password.is_empty()
            || input.status.trim().is_empty()
            || input.reason.trim().is_empty()
        {
            return Err(AppError::InvalidInput("All mail fields are required.".into()));
        }
        let local_part = input.username.trim();
        if !is_valid_local_part(local_part) {
            return Err(AppError::InvalidInput("Invalid mailbox username.".into()));
        }
        let status = MailboxStatus::parse(input.status.trim())
            .ok_or_else(|| AppError::InvalidInput("Status must be active or deactive.".into()))?;

        let assigned = self
            .users
            .find_by_id(input.user_id)
            .await?
            .filter(|u| u.role == Role::User)
            .ok_or_else(|| AppError::InvalidInput("Assigned user not found.".into()))?;

        let domain = self.domains.require().await?;
        let email = derive_email(local_part, &domain.domain);

        if self.mail_entries.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists.".into()));
        }

        if input.create_on_server {
            self.mail_server
                .create_mailbox(
                    local_part,
                    &domain.domain,
                    &input.password,
                    &assigned.username,
                    self.mailbox_quota_mb,
                )
                .await?;
        }

        self.mail_entries
            .create(NewMailEntry {
                email,
                password: input.password,
                user_id: assigned.id,
                status,
                reason: input.reason.trim().to_string(),
            })
            .await
    }

    pub async fn get_entry(&self, id: Uuid) -> AppResult<MailEntry> {
        self.mail_entries
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Mail entry"))
    }

    pub async fn list_for(&self, user: &User) -> AppResult<Vec<MailEntryWithUser>> {
        match user.role {
            Role::Admin => self.mail_entries.list_all().await,
            Role::User => self.mail_entries.list_for_user(user.id).await,
        }
    }

    /// Applies the caller-visible fields and then best-effort syncs a password
    /// change to the mail server. The remote sync is logged, never rolled
    /// back: local state wins once committed.
    #[instrument(skip(self, input))]
    pub async fn update_entry(
        &self,
        actor: &User,
        mut entry: MailEntry,
        input: UpdateMailEntry,
    ) -> AppResult<MailEntryWithUser> {
        let password_changed = input.password.clone();

        match actor.role {
            Role::Admin => {
                if let Some(email) = input.email {
                    entry.email = email.trim().to_ascii_lowercase();
                }
                if let Some(password) = input.password {
                    entry.password = password;
                }
                if let Some(user_id) = input.user_id {
                    self.users
                        .find_by_id(user_id)
                        .await?
                        .ok_or_else(|| AppError::InvalidInput("Assigned user not found.".into()))?;
                    entry.user_id = user_id;
                }
                if let Some(status) = input.status {
                    entry.status = MailboxStatus::parse(status.trim()).ok_or_else(|| {
                        AppError::InvalidInput("Status must be active or deactive.".into())
                    })?;
                }
                if let Some(reason) = input.reason {
                    entry.reason = reason;
                }
            }
            Role::User => {
                // Owners may rotate the mailbox password, nothing else.
                if let Some(password) = input.password {
                    entry.password = password;
                }
            }
        }

        let updated = self.mail_entries.update(&entry).await?;

        if let Some(password) = password_changed {
            self.sync_password_to_server(&updated.email, &password).await;
        }

        self.mail_entries
            .find_with_user(updated.id)
            .await?
            .ok_or(AppError::NotFound("Mail entry"))
    }

    async fn sync_password_to_server(&self, entry_email: &str, password: &str) {
        let domain = match self.domains.require().await {
            Ok(domain) => domain,
            Err(_) => {
                warn!("No domain set, skipping mail server update");
                return;
            }
        };
        let Some((local_part, _)) = entry_email.split_once('@') else {
            warn!(email = %entry_email, "Mail entry email has no local part, skipping mail server update");
            return;
        };
        let target = derive_email(local_part, &domain.domain);
        let update = RemoteMailboxUpdate {
            password: Some(password.to_string()),
            active: None,
        };
        if let Err(e) = self.mail_server.update_mailbox(&target, &update).await {
            warn!(email = %target, error = ?e, "Failed to update mailbox on mail server");
        }
    }

    /// Deletes locally after a best-effort remote delete; a remote failure is
    /// logged and does not keep the local record alive.
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, id: Uuid) -> AppResult<()> {
        let entry = self.get_entry(id).await?;

        if let Ok(domain) = self.domains.require().await {
            if let Some((local_part, _)) = entry.email.split_once('@') {
                let target = derive_email(local_part, &domain.domain);
                if let Err(e) = self.mail_server.delete_mailbox(&target).await {
                    warn!(email = %target, error = ?e, "Failed to delete mailbox from mail server");
                }
            }
        }

        self.mail_entries.delete(id).await
    }

    /// Proxy listing; `all` returns the raw provider view, otherwise only
    /// mailboxes not yet adopted locally.
    pub async fn list_remote(&self, all: bool) -> AppResult<Vec<RemoteMailbox>> {
        let mailboxes = self.mail_server.list_mailboxes().await?;
        if all {
            return Ok(mailboxes);
        }

        let domain = self.domains.require().await?;
        let local: HashSet<String> = self
            .mail_entries
            .list_emails()
            .await?
            .into_iter()
            .map(|e| e.to_ascii_lowercase())
            .collect();
        Ok(filter_unadopted(&mailboxes, &local, &domain.domain))
    }

    pub async fn update_remote(&self, email: &str, update: &RemoteMailboxUpdate) -> AppResult<()> {
        self.mail_server.update_mailbox(email, update).await
    }

    pub async fn delete_remote(&self, email: &str) -> AppResult<()> {
        self.mail_server.delete_mailbox(email).await
    }

    /// Adopt a mailbox that already exists on the mail server into local
    /// storage. Owner defaults to the acting admin.
    #[instrument(skip(self, input))]
    pub async fn import_mailbox(&self, actor: &User, input: ImportMailbox) -> AppResult<MailEntry> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(AppError::InvalidInput(
                "Email and password are required.".into(),
            ));
        }

        let domain = self.domains.require().await?;
        let email = derive_email(&input.email, &domain.domain);

        if self.mail_entries.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "Mailbox already exists in the system.".into(),
            ));
        }

        let owner_id = match input.user_id {
            Some(user_id) => {
                self.users
                    .find_by_id(user_id)
                    .await?
                    .ok_or_else(|| AppError::InvalidInput("Assigned user not found.".into()))?
                    .id
            }
            None => actor.id,
        };

        self.mail_entries
            .create(NewMailEntry {
                email,
                password: input.password,
                user_id: owner_id,
                status: MailboxStatus::Active,
                reason: "Imported from mail server".into(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        InMemoryDomainRepo, InMemoryMailEntryRepo, InMemoryUserRepo, MockMailServer,
        create_test_mail_entry, create_test_user,
    };

    struct Fixture {
        uc: MailUseCases,
        users: Arc<InMemoryUserRepo>,
        entries: Arc<InMemoryMailEntryRepo>,
        mail_server: Arc<MockMailServer>,
    }

    fn fixture(domain: Option<&str>) -> Fixture {
        let users = Arc::new(InMemoryUserRepo::default());
        let entries = Arc::new(InMemoryMailEntryRepo::new(users.clone()));
        let domains = Arc::new(match domain {
            Some(d) => InMemoryDomainRepo::with_domain(d),
            None => InMemoryDomainRepo::default(),
        });
        let mail_server = Arc::new(MockMailServer::default());
        let uc = MailUseCases::new(
            entries.clone(),
            users.clone(),
            DomainUseCases::new(domains),
            mail_server.clone(),
            2048,
        );
        Fixture {
            uc,
            users,
            entries,
            mail_server,
        }
    }

    async fn seed_user(fixture: &Fixture, username: &str, role: Role) -> User {
        let user = create_test_user(|u| {
            u.username = username.into();
            u.role = role;
        });
        fixture.users.insert(user.clone());
        user
    }

    #[tokio::test]
    async fn create_entry_provisions_remotely_when_asked() {
        let f = fixture(Some("example.com"));
        let owner = seed_user(&f, "alice", Role::User).await;

        let entry = f
            .uc
            .create_entry(CreateMailEntry {
                username: "alice.w".into(),
                password: "secret".into(),
                user_id: owner.id,
                status: "active".into(),
                reason: "work".into(),
                create_on_server: true,
            })
            .await
            .unwrap();

        assert_eq!(entry.email, "alice.w@example.com");
        assert_eq!(f.mail_server.created_calls(), vec!["alice.w@example.com"]);
    }

    #[tokio::test]
    async fn create_entry_aborts_when_remote_provision_fails() {
        let f = fixture(Some("example.com"));
        let owner = seed_user(&f, "alice", Role::User).await;
        f.mail_server.fail_create();

        let err = f
            .uc
            .create_entry(CreateMailEntry {
                username: "alice.w".into(),
                password: "secret".into(),
                user_id: owner.id,
                status: "active".into(),
                reason: "work".into(),
                create_on_server: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Provider(_)));
        assert!(f.entries.all().is_empty());
    }

    #[tokio::test]
    async fn create_entry_rejects_admin_as_assigned_user() {
        let f = fixture(Some("example.com"));
        let admin = seed_user(&f, "root", Role::Admin).await;

        let err = f
            .uc
            .create_entry(CreateMailEntry {
                username: "root.m".into(),
                password: "secret".into(),
                user_id: admin.id,
                status: "active".into(),
                reason: "ops".into(),
                create_on_server: false,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn owner_password_update_syncs_remotely_best_effort() {
        let f = fixture(Some("example.com"));
        let owner = seed_user(&f, "alice", Role::User).await;
        let entry = create_test_mail_entry(owner.id, |e| e.email = "alice.w@example.com".into());
        f.entries.insert(entry.clone());
        f.mail_server.fail_update();

        // The remote failure must not surface: local change is committed.
        let updated = f
            .uc
            .update_entry(
                &owner,
                entry.clone(),
                UpdateMailEntry {
                    password: Some("rotated".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.entry.password, "rotated");
    }

    #[tokio::test]
    async fn owner_update_ignores_non_password_fields() {
        let f = fixture(Some("example.com"));
        let owner = seed_user(&f, "alice", Role::User).await;
        let entry = create_test_mail_entry(owner.id, |e| {
            e.email = "alice.w@example.com".into();
            e.reason = "work".into();
        });
        f.entries.insert(entry.clone());

        let updated = f
            .uc
            .update_entry(
                &owner,
                entry,
                UpdateMailEntry {
                    reason: Some("takeover".into()),
                    status: Some("deactive".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.entry.reason, "work");
        assert_eq!(updated.entry.status, MailboxStatus::Active);
    }

    #[tokio::test]
    async fn delete_entry_removes_locally_even_when_remote_delete_fails() {
        let f = fixture(Some("example.com"));
        let owner = seed_user(&f, "alice", Role::User).await;
        let entry = create_test_mail_entry(owner.id, |e| e.email = "alice.w@example.com".into());
        f.entries.insert(entry.clone());
        f.mail_server.fail_delete();

        f.uc.delete_entry(entry.id).await.unwrap();

        assert!(f.entries.all().is_empty());
    }

    #[tokio::test]
    async fn list_remote_filters_adopted_mailboxes() {
        let f = fixture(Some("x.org"));
        let owner = seed_user(&f, "bob", Role::User).await;
        f.entries
            .insert(create_test_mail_entry(owner.id, |e| e.email = "bob@x.org".into()));
        f.mail_server.seed_mailboxes(vec!["bob", "carol"]);

        let unadopted = f.uc.list_remote(false).await.unwrap();
        assert_eq!(unadopted.len(), 1);
        assert_eq!(unadopted[0].username, "carol");

        let all = f.uc.list_remote(true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn import_defaults_owner_to_acting_admin() {
        let f = fixture(Some("x.org"));
        let admin = seed_user(&f, "root", Role::Admin).await;

        let entry = f
            .uc
            .import_mailbox(
                &admin,
                ImportMailbox {
                    email: "Legacy".into(),
                    password: "pw".into(),
                    user_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(entry.email, "legacy@x.org");
        assert_eq!(entry.user_id, admin.id);
        assert_eq!(entry.reason, "Imported from mail server");
    }

    #[tokio::test]
    async fn import_rejects_already_adopted_mailbox() {
        let f = fixture(Some("x.org"));
        let admin = seed_user(&f, "root", Role::Admin).await;
        f.entries
            .insert(create_test_mail_entry(admin.id, |e| e.email = "legacy@x.org".into()));

        let err = f
            .uc
            .import_mailbox(
                &admin,
                ImportMailbox {
                    email: "legacy@x.org".into(),
                    password: "pw".into(),
                    user_id: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }
}
