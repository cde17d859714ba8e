use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not approved: {0}")]
    NotApproved(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
