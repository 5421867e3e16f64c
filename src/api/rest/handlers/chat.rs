use axum::{
    extract::{Extension, Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::middleware::{ensure_owner, AuthContext};
use crate::chat::{ChatRequest, ChatTurnResponse, MAX_MESSAGE_CHARS};
use crate::shared::models::AppState;

/// One chat turn: user message in, assistant response plus tool-call log
/// out. Owner checks happen here; everything past this point trusts the
/// user id it is handed.
pub async fn chat_turn(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatTurnResponse>> {
    ensure_owner(&auth, &user_id)?;

    if req.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "message exceeds the maximum length of {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let response = state.chat.process_turn(&user_id, req).await?;

    Ok(Json(response))
}
