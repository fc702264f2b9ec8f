//! Builder producing an `AppState` backed by in-memory mocks, plus handles
//! to those mocks for assertions.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;

use crate::adapters::http::app_state::AppState;
use crate::entities::email_request::EmailRequest;
use crate::entities::mail_entry::MailEntry;
use crate::entities::user::User;
use crate::infra::{config::AppConfig, event_bus::EventBus};
use crate::ports::mail_server::MailServerClient;
use crate::ports::notifier::Notifier;
use crate::test_utils::{
    InMemoryDomainRepo, InMemoryEmailRequestRepo, InMemoryMailEntryRepo, InMemoryUserRepo,
    MockMailServer, TEST_JWT_SECRET,
};
use crate::use_cases::auth::{AuthUseCases, UserRepo};
use crate::use_cases::mail::{MailEntryRepo, MailUseCases};
use crate::use_cases::mail_domain::{DomainRepo, DomainUseCases};
use crate::use_cases::reconcile::ReconcileUseCases;
use crate::use_cases::requests::{EmailRequestRepo, RequestUseCases};
use crate::use_cases::users::UserUseCases;

pub struct TestApp {
    pub state: AppState,
    pub users: Arc<InMemoryUserRepo>,
    pub entries: Arc<InMemoryMailEntryRepo>,
    pub requests: Arc<InMemoryEmailRequestRepo>,
    pub mail_server: Arc<MockMailServer>,
}

#[derive(Default)]
pub struct TestAppStateBuilder {
    users: Vec<User>,
    domain: Option<String>,
    entries: Vec<MailEntry>,
    requests: Vec<EmailRequest>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn with_mail_entry(mut self, entry: MailEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_request(mut self, request: EmailRequest) -> Self {
        self.requests.push(request);
        self
    }

    pub fn build(self) -> TestApp {
        let users = Arc::new(InMemoryUserRepo::with_users(self.users));
        let entries = Arc::new(InMemoryMailEntryRepo::new(users.clone()));
        for entry in self.entries {
            entries.insert(entry);
        }
        let requests = Arc::new(InMemoryEmailRequestRepo::new(users.clone()));
        for request in self.requests {
            requests.insert(request);
        }
        let domains = Arc::new(match self.domain.as_deref() {
            Some(domain) => InMemoryDomainRepo::with_domain(domain),
            None => InMemoryDomainRepo::default(),
        });
        let mail_server = Arc::new(MockMailServer::default());
        let events = Arc::new(EventBus::new());

        let config = Arc::new(AppConfig {
            bind_addr: "127.0.0.1:5000".parse().unwrap(),
            database_url: String::new(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            access_token_ttl: Duration::hours(24),
            default_admin_username: None,
            default_admin_password: None,
            mail_server_url: Url::parse("https://mail.test").unwrap(),
            mail_server_read_api_key: "test-read-key".into(),
            mail_server_write_api_key: "test-write-key".into(),
            mailbox_poll_secs: 30,
            mailbox_quota_mb: 2048,
        });

        let user_repo = users.clone() as Arc<dyn UserRepo>;
        let domain_repo = domains as Arc<dyn DomainRepo>;
        let mail_entry_repo = entries.clone() as Arc<dyn MailEntryRepo>;
        let request_repo = requests.clone() as Arc<dyn EmailRequestRepo>;
        let mail_server_port = mail_server.clone() as Arc<dyn MailServerClient>;
        let notifier = events.clone() as Arc<dyn Notifier>;

        let auth_use_cases = AuthUseCases::new(
            user_repo.clone(),
            config.jwt_secret.clone(),
            config.access_token_ttl,
        );
        let user_use_cases = UserUseCases::new(user_repo.clone());
        let domain_use_cases = DomainUseCases::new(domain_repo);
        let mail_use_cases = MailUseCases::new(
            mail_entry_repo.clone(),
            user_repo.clone(),
            domain_use_cases.clone(),
            mail_server_port.clone(),
            config.mailbox_quota_mb,
        );
        let request_use_cases = RequestUseCases::new(
            request_repo,
            user_repo,
            mail_entry_repo.clone(),
            domain_use_cases.clone(),
            mail_server_port.clone(),
            notifier.clone(),
            config.mailbox_quota_mb,
        );
        let reconcile_use_cases = ReconcileUseCases::new(
            domain_use_cases.clone(),
            mail_entry_repo,
            mail_server_port,
            notifier,
        );

        let state = AppState {
            config,
            auth_use_cases: Arc::new(auth_use_cases),
            user_use_cases: Arc::new(user_use_cases),
            domain_use_cases: Arc::new(domain_use_cases),
            mail_use_cases: Arc::new(mail_use_cases),
            request_use_cases: Arc::new(request_use_cases),
            reconcile_use_cases: Arc::new(reconcile_use_cases),
            events,
        };

        TestApp {
            state,
            users,
            entries,
            requests,
            mail_server,
        }
    }
}
