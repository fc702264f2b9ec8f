use std::sync::Arc;

use async_trait::async_trait;

use crate::app_error::{AppError, AppResult};
use crate::entities::mail_domain::MailDomain;

pub const DEFAULT_DOMAIN: &str = "example.com";

#[async_trait]
pub trait DomainRepo: Send + Sync {
    async fn get(&self) -> AppResult<Option<MailDomain>>;
    /// Insert-or-update the single row; never creates a second one.
    async fn upsert(&self, domain: &str) -> AppResult<MailDomain>;
}

#[derive(Clone)]
pub struct DomainUseCases {
    domains: Arc<dyn DomainRepo>,
}

impl DomainUseCases {
    pub fn new(domains: Arc<dyn DomainRepo>) -> Self {
        Self { domains }
    }

    pub async fn get(&self) -> AppResult<Option<MailDomain>> {
        self.domains.get().await
    }

    /// Lazily created with a default the first time anyone reads it.
    pub async fn get_or_init(&self) -> AppResult<MailDomain> {
        if let Some(domain) = self.domains.get().await? {
            return Ok(domain);
        }
        self.domains.upsert(DEFAULT_DOMAIN).await
    }

    pub async fn set(&self, domain: &str) -> AppResult<MailDomain> {
        let domain = domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return Err(AppError::InvalidInput("Domain is required.".into()));
        }
        self.domains.upsert(&domain).await
    }

    /// For flows that must not fall back to the lazy default.
    pub async fn require(&self) -> AppResult<MailDomain> {
        self.domains
            .get()
            .await?
            .ok_or_else(|| AppError::InvalidInput("Domain not set.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryDomainRepo;

    #[tokio::test]
    async fn get_or_init_creates_the_default_once() {
        let repo = Arc::new(InMemoryDomainRepo::default());
        let uc = DomainUseCases::new(repo.clone());

        let first = uc.get_or_init().await.unwrap();
        assert_eq!(first.domain, DEFAULT_DOMAIN);

        let second = uc.get_or_init().await.unwrap();
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn set_is_idempotent_and_keeps_a_single_row() {
        let repo = Arc::new(InMemoryDomainRepo::default());
        let uc = DomainUseCases::new(repo.clone());

        let first = uc.set("Corp.Example").await.unwrap();
        assert_eq!(first.domain, "corp.example");

        let second = uc.set("corp.example").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.domain, "corp.example");
    }

    #[tokio::test]
    async fn set_rejects_blank_domain() {
        let uc = DomainUseCases::new(Arc::new(InMemoryDomainRepo::default()));
        let err = uc.set("   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn require_fails_when_unset() {
        let uc = DomainUseCases::new(Arc::new(InMemoryDomainRepo::default()));
        let err = uc.require().await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
