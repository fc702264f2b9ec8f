use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::adapters::persistence::PostgresPersistence;
use crate::app_error::{AppError, AppResult};
use crate::entities::email_request::{
    EmailRequest, EmailRequestWithUser, RequestStatus, RequesterInfo,
};
use crate::use_cases::requests::{EmailRequestRepo, NewEmailRequest};

#[derive(sqlx::FromRow, Debug)]
struct EmailRequestDb {
    id: Uuid,
    user_id: Uuid,
    username: String,
    reason: String,
    status: String,
    admin_reply: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl From<EmailRequestDb> for EmailRequest {
    fn from(row: EmailRequestDb) -> Self {
        EmailRequest {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            reason: row.reason,
            status: RequestStatus::from_stored(&row.status),
            admin_reply: row.admin_reply,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct EmailRequestWithUserDb {
    id: Uuid,
    user_id: Uuid,
    username: String,
    reason: String,
    status: String,
    admin_reply: String,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
    requester_username: String,
    requester_name: String,
}

impl From<EmailRequestWithUserDb> for EmailRequestWithUser {
    fn from(row: EmailRequestWithUserDb) -> Self {
        EmailRequestWithUser {
            user: RequesterInfo {
                id: row.user_id,
                username: row.requester_username,
                name: row.requester_name,
            },
            request: EmailRequest {
                id: row.id,
                user_id: row.user_id,
                username: row.username,
                reason: row.reason,
                status: RequestStatus::from_stored(&row.status),
                admin_reply: row.admin_reply,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

const REQUEST_COLUMNS: &str =
    "id, user_id, username, reason, status, admin_reply, created_at, updated_at";

#[async_trait]
impl EmailRequestRepo for PostgresPersistence {
    async fn create(
        &self,
        user_id: Uuid,
        new_request: &NewEmailRequest,
    ) -> AppResult<EmailRequest> {
        let row = sqlx::query_as::<_, EmailRequestDb>(&format!(
            "INSERT INTO email_requests (id, user_id, username, reason) \
             VALUES ($1, $2, $3, $4) RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new_request.username.trim())
        .bind(new_request.reason.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<EmailRequest>> {
        let row = sqlx::query_as::<_, EmailRequestDb>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM email_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(EmailRequest::from))
    }

    async fn list_all(&self) -> AppResult<Vec<EmailRequestWithUser>> {
        let rows = sqlx::query_as::<_, EmailRequestWithUserDb>(
            "SELECT r.id, r.user_id, r.username, r.reason, r.status, r.admin_reply, \
             r.created_at, r.updated_at, u.username AS requester_username, \
             u.name AS requester_name \
             FROM email_requests r JOIN users u ON u.id = r.user_id \
             ORDER BY r.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(EmailRequestWithUser::from).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<EmailRequest>> {
        let rows = sqlx::query_as::<_, EmailRequestDb>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM email_requests WHERE user_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(EmailRequest::from).collect())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        admin_reply: Option<&str>,
    ) -> AppResult<EmailRequest> {
        let row = sqlx::query_as::<_, EmailRequestDb>(&format!(
            "UPDATE email_requests SET status = $2, admin_reply = COALESCE($3, admin_reply), \
             updated_at = now() WHERE id = $1 RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(admin_reply)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.into())
    }
}
