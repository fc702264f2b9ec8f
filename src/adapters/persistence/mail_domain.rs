use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::adapters::persistence::PostgresPersistence;
use crate::app_error::{AppError, AppResult};
use crate::entities::mail_domain::MailDomain;
use crate::use_cases::mail_domain::DomainRepo;

#[derive(sqlx::FromRow, Debug)]
struct MailDomainDb {
    id: Uuid,
    domain: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl From<MailDomainDb> for MailDomain {
    fn from(row: MailDomainDb) -> Self {
        MailDomain {
            id: row.id,
            domain: row.domain,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl DomainRepo for PostgresPersistence {
    async fn get(&self) -> AppResult<Option<MailDomain>> {
        let row = sqlx::query_as::<_, MailDomainDb>(
            "SELECT id, domain, created_at, updated_at FROM mail_domain LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(MailDomain::from))
    }

    async fn upsert(&self, domain: &str) -> AppResult<MailDomain> {
        // The conflict target is the one-row unique index, so concurrent
        // upserts can never leave two rows behind.
        let row = sqlx::query_as::<_, MailDomainDb>(
            "INSERT INTO mail_domain (id, domain) VALUES ($1, $2) \
             ON CONFLICT ((TRUE)) DO UPDATE SET domain = EXCLUDED.domain, updated_at = now() \
             RETURNING id, domain, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(domain)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }
}
