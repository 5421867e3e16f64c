use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::info;

use crate::api::auth::decode_jwt;
use crate::api::rest::error::ApiError;
use crate::shared::models::{AppState, User};

#[derive(Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub user_name: String,
    pub token: String,
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract token from Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    // Decode and validate JWT
    let claims = decode_jwt(token, &state.jwt_secret).map_err(|_| ApiError::Unauthorized)?;

    // The token subject must still be a known user
    let user = User::find_by_id(&state.db, &claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let auth_context = AuthContext {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        token: token.to_string(),
    };
    request.extensions_mut().insert(auth_context);

    // Log the authenticated API request
    let method = request.method().clone();
    let uri = request.uri().clone();

    info!(
        method = %method,
        path = %uri.path(),
        user = %user.name,
        "API request"
    );

    Ok(next.run(request).await)
}

/// Caller-boundary owner check: the authenticated identity must match the
/// owner id in the path before any handler touches owned data.
pub fn ensure_owner(auth: &AuthContext, user_id: &str) -> Result<(), ApiError> {
    if auth.user_id != user_id {
        return Err(ApiError::Forbidden(
            "Access denied: You can only access your own resources".to_string(),
        ));
    }
    Ok(())
}
