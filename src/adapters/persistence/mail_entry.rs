use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::adapters::persistence::PostgresPersistence;
use crate::app_error::{AppError, AppResult};
use crate::entities::mail_entry::{MailEntry, MailEntryWithUser, MailboxStatus};
use crate::entities::user::{PublicUser, Role};
use crate::use_cases::mail::{MailEntryRepo, NewMailEntry};

#[derive(sqlx::FromRow, Debug)]
struct MailEntryDb {
    id: Uuid,
    email: String,
    password: String,
    user_id: Uuid,
    status: String,
    reason: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl From<MailEntryDb> for MailEntry {
    fn from(row: MailEntryDb) -> Self {
        MailEntry {
            id: row.id,
            email: row.email,
            password: row.password,
            user_id: row.user_id,
            status: MailboxStatus::from_stored(&row.status),
            reason: row.reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// Flat join row; the owner columns are aliased to keep FromRow happy.
#[derive(sqlx::FromRow, Debug)]
struct MailEntryWithUserDb {
    id: Uuid,
    email: String,
    password: String,
    user_id: Uuid,
    status: String,
    reason: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
    owner_username: String,
    owner_name: String,
    owner_role: String,
}

impl From<MailEntryWithUserDb> for MailEntryWithUser {
    fn from(row: MailEntryWithUserDb) -> Self {
        MailEntryWithUser {
            user: PublicUser {
                id: row.user_id,
                username: row.owner_username,
                name: row.owner_name,
                role: Role::from_stored(&row.owner_role),
            },
            entry: MailEntry {
                id: row.id,
                email: row.email,
                password: row.password,
                user_id: row.user_id,
                status: MailboxStatus::from_stored(&row.status),
                reason: row.reason,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

const ENTRY_COLUMNS: &str = "id, email, password, user_id, status, reason, created_at, updated_at";

const JOINED_SELECT: &str = "SELECT m.id, m.email, m.password, m.user_id, m.status, m.reason, \
     m.created_at, m.updated_at, u.username AS owner_username, u.name AS owner_name, \
     u.role AS owner_role FROM mail_entries m JOIN users u ON u.id = m.user_id";

#[async_trait]
impl MailEntryRepo for PostgresPersistence {
    async fn create(&self, new_entry: NewMailEntry) -> AppResult<MailEntry> {
        let row = sqlx::query_as::<_, MailEntryDb>(&format!(
            "INSERT INTO mail_entries (id, email, password, user_id, status, reason) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_entry.email)
        .bind(&new_entry.password)
        .bind(new_entry.user_id)
        .bind(new_entry.status.as_str())
        .bind(&new_entry.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MailEntry>> {
        let row = sqlx::query_as::<_, MailEntryDb>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM mail_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(MailEntry::from))
    }

    async fn find_with_user(&self, id: Uuid) -> AppResult<Option<MailEntryWithUser>> {
        let row = sqlx::query_as::<_, MailEntryWithUserDb>(&format!(
            "{JOINED_SELECT} WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(MailEntryWithUser::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<MailEntry>> {
        let row = sqlx::query_as::<_, MailEntryDb>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM mail_entries WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(MailEntry::from))
    }

    async fn list_all(&self) -> AppResult<Vec<MailEntryWithUser>> {
        let rows = sqlx::query_as::<_, MailEntryWithUserDb>(&format!(
            "{JOINED_SELECT} ORDER BY m.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(MailEntryWithUser::from).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<MailEntryWithUser>> {
        let rows = sqlx::query_as::<_, MailEntryWithUserDb>(&format!(
            "{JOINED_SELECT} WHERE m.user_id = $1 ORDER BY m.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(MailEntryWithUser::from).collect())
    }

    async fn list_emails(&self) -> AppResult<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>("SELECT email FROM mail_entries")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(rows)
    }

    async fn update(&self, entry: &MailEntry) -> AppResult<MailEntry> {
        let row = sqlx::query_as::<_, MailEntryDb>(&format!(
            "UPDATE mail_entries SET email = $2, password = $3, user_id = $4, status = $5, \
             reason = $6, updated_at = now() WHERE id = $1 RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(entry.id)
        .bind(&entry.email)
        .bind(&entry.password)
        .bind(entry.user_id)
        .bind(entry.status.as_str())
        .bind(&entry.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM mail_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
