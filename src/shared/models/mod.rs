use sqlx::{MySql, Pool};
use thiserror::Error;

pub mod conversation;
pub mod task;
pub mod user;

pub use conversation::{Conversation, ConversationMessage, MessageRole};
pub use task::{CreateTaskRequest, StatusFilter, Task, TaskLookup, UpdateTaskRequest};
pub use user::User;

// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
    #[error("Unique constraint violation: {0}")]
    Unique(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        // Check for MySQL unique constraint violation (error code 1062)
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code == "23000" || code == "1062" {
                    return DatabaseError::Unique(db_err.message().to_string());
                }
            }
        }
        DatabaseError::Connection(err)
    }
}

// Application state
#[derive(Clone)]
pub struct AppState {
    pub db: std::sync::Arc<Pool<MySql>>,
    pub jwt_secret: String,
    pub chat: crate::chat::ChatManager,
}
