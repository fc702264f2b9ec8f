use uuid::Uuid;

/// The singleton mail domain appended to local parts to form addresses.
#[derive(Debug, Clone)]
pub struct MailDomain {
    pub id: Uuid,
    pub domain: String,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}
