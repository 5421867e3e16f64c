pub mod error;
pub mod inference;
pub mod manager;
pub mod tools;

pub use error::ChatError;
pub use inference::InferenceClient;
pub use manager::{ChatManager, ChatRequest, ChatTurnResponse, ToolCallRecord, MAX_MESSAGE_CHARS};
