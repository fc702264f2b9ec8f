use std::sync::Arc;

use crate::infra::{config::AppConfig, event_bus::EventBus};
use crate::use_cases::{
    auth::AuthUseCases, mail::MailUseCases, mail_domain::DomainUseCases,
    reconcile::ReconcileUseCases, requests::RequestUseCases, users::UserUseCases,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_use_cases: Arc<AuthUseCases>,
    pub user_use_cases: Arc<UserUseCases>,
    pub domain_use_cases: Arc<DomainUseCases>,
    pub mail_use_cases: Arc<MailUseCases>,
    pub request_use_cases: Arc<RequestUseCases>,
    pub reconcile_use_cases: Arc<ReconcileUseCases>,
    pub events: Arc<EventBus>,
}
