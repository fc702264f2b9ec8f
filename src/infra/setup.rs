use std::fs::File;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::adapters::http::app_state::AppState;
use crate::adapters::mailserver::MailcowClient;
use crate::adapters::persistence::PostgresPersistence;
use crate::app_error::AppResult;
use crate::application::password;
use crate::entities::user::Role;
use crate::infra::{config::AppConfig, db::init_db, event_bus::EventBus};
use crate::ports::mail_server::MailServerClient;
use crate::ports::notifier::Notifier;
use crate::use_cases::auth::{AuthUseCases, NewUser, UserRepo};
use crate::use_cases::mail::{MailEntryRepo, MailUseCases};
use crate::use_cases::mail_domain::{DomainRepo, DomainUseCases};
use crate::use_cases::reconcile::ReconcileUseCases;
use crate::use_cases::requests::{EmailRequestRepo, RequestUseCases};
use crate::use_cases::users::UserUseCases;

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let pool = init_db(&config.database_url).await?;
    let postgres_arc = Arc::new(PostgresPersistence::new(pool));

    let user_repo = postgres_arc.clone() as Arc<dyn UserRepo>;
    let domain_repo = postgres_arc.clone() as Arc<dyn DomainRepo>;
    let mail_entry_repo = postgres_arc.clone() as Arc<dyn MailEntryRepo>;
    let request_repo = postgres_arc.clone() as Arc<dyn EmailRequestRepo>;

    let mail_server = Arc::new(MailcowClient::new(
        config.mail_server_url.clone(),
        config.mail_server_read_api_key.clone(),
        config.mail_server_write_api_key.clone(),
    )) as Arc<dyn MailServerClient>;

    let events = Arc::new(EventBus::new());
    let notifier = events.clone() as Arc<dyn Notifier>;

    ensure_default_admin(user_repo.as_ref(), &config).await?;

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
        mail_server.clone(),
        config.mailbox_quota_mb,
    );
    let request_use_cases = RequestUseCases::new(
        request_repo,
        user_repo.clone(),
        mail_entry_repo.clone(),
        domain_use_cases.clone(),
        mail_server.clone(),
        notifier.clone(),
        config.mailbox_quota_mb,
    );
    let reconcile_use_cases = ReconcileUseCases::new(
        domain_use_cases.clone(),
        mail_entry_repo,
        mail_server,
        notifier,
    );

    Ok(AppState {
        config: Arc::new(config),
        auth_use_cases: Arc::new(auth_use_cases),
        user_use_cases: Arc::new(user_use_cases),
        domain_use_cases: Arc::new(domain_use_cases),
        mail_use_cases: Arc::new(mail_use_cases),
        request_use_cases: Arc::new(request_use_cases),
        reconcile_use_cases: Arc::new(reconcile_use_cases),
        events,
    })
}

async fn ensure_default_admin(users: &dyn UserRepo, config: &AppConfig) -> AppResult<()> {
    let (Some(username), Some(admin_password)) = (
        config.default_admin_username.as_deref(),
        config.default_admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if users.find_by_username(username).await?.is_none() {
        users
            .create(NewUser {
                username: username.to_string(),
                name: username.to_string(),
                password_hash: password::hash_password(admin_password)?,
                role: Role::Admin,
            })
            .await?;
        info!("Default admin created: {username}");
    }

    Ok(())
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mailadmin=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
