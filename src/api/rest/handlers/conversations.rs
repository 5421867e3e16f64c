use axum::{
    extract::{Extension, Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::middleware::{ensure_owner, AuthContext};
use crate::shared::models::{AppState, Conversation, ConversationMessage};

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_owner(&auth, &user_id)?;

    let conversations = Conversation::list_for_owner(&state.db, &user_id).await?;

    Ok(Json(serde_json::json!({
        "conversations": conversations
            .iter()
            .map(|conv| serde_json::json!({
                "id": conv.id,
                "user_id": conv.user_id,
                "created_at": conv.created_at.to_rfc3339(),
                "updated_at": conv.updated_at.to_rfc3339(),
            }))
            .collect::<Vec<_>>(),
        "count": conversations.len(),
    })))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path((user_id, conversation_id)): Path<(String, String)>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<serde_json::Value>> {
    ensure_owner(&auth, &user_id)?;

    let conversation = Conversation::find_by_id(&state.db, &conversation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))?;

    if conversation.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Access denied: You can only access your own conversations".to_string(),
        ));
    }

    let messages = ConversationMessage::find_by_conversation(&state.db, &conversation_id).await?;

    Ok(Json(serde_json::json!({
        "conversation": {
            "id": conversation.id,
            "user_id": conversation.user_id,
            "created_at": conversation.created_at.to_rfc3339(),
            "updated_at": conversation.updated_at.to_rfc3339(),
        },
        "messages": messages
            .iter()
            .map(|msg| serde_json::json!({
                "id": msg.id,
                "role": msg.role,
                "content": msg.content,
                "created_at": msg.created_at.to_rfc3339(),
            }))
            .collect::<Vec<_>>(),
        "message_count": messages.len(),
    })))
}
