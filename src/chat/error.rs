use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
