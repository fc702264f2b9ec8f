use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Access denied.")]
    Forbidden,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("{0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;
