use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::auth::create_user_jwt;
use crate::api::rest::error::{ApiError, ApiResult};
use crate::api::rest::middleware::AuthContext;
use crate::shared::models::user::{LoginRequest, RegisterRequest};
use crate::shared::models::{AppState, DatabaseError, User};

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: String,
    pub user_id: String,
    pub user: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)?;

    let user = User::create(&state.db, name, &password_hash)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Unique(_) => {
                ApiError::Conflict(format!("User '{}' already exists", name))
            }
            other => ApiError::Database(other),
        })?;

    Ok(Json(serde_json::json!({
        "id": user.id,
        "name": user.name,
        "created_at": user.created_at.to_rfc3339(),
    })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = User::find_by_name(&state.db, &name)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let is_valid = bcrypt::verify(&req.password, &user.password_hash).unwrap_or(false);
    if !is_valid {
        return Err(ApiError::Unauthorized);
    }

    let token = create_user_jwt(&user, &state.jwt_secret, TOKEN_TTL_HOURS)?;

    Ok(Json(LoginResponse {
        token: token.token,
        token_type: "Bearer".to_string(),
        expires_at: token.expires_at,
        user_id: user.id,
        user: user.name,
    }))
}

pub async fn me(Extension(auth): Extension<AuthContext>) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(serde_json::json!({
        "user_id": auth.user_id,
        "name": auth.user_name,
    })))
}
