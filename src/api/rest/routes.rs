use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::rest::{
    handlers, logging_middleware::request_logging_middleware, middleware::auth_middleware,
};
use crate::shared::models::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/version", get(version))
        .route("/users", post(handlers::auth::register))
        .route("/users/{name}/login", post(handlers::auth::login));

    // Protected routes
    let protected_routes = Router::new()
        .route("/auth", get(handlers::auth::me))
        // Chat turn + conversation projections
        .route("/users/{user_id}/chat", post(handlers::chat::chat_turn))
        .route(
            "/users/{user_id}/conversations",
            get(handlers::conversations::list_conversations),
        )
        .route(
            "/users/{user_id}/conversations/{conversation_id}",
            get(handlers::conversations::get_conversation),
        )
        // Task endpoints
        .route("/users/{user_id}/tasks", get(handlers::tasks::list_tasks))
        .route("/users/{user_id}/tasks", post(handlers::tasks::create_task))
        .route(
            "/users/{user_id}/tasks/{task_id}",
            get(handlers::tasks::get_task),
        )
        .route(
            "/users/{user_id}/tasks/{task_id}",
            put(handlers::tasks::update_task),
        )
        .route(
            "/users/{user_id}/tasks/{task_id}",
            delete(handlers::tasks::delete_task),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes
        .merge(protected_routes)
        .with_state(state.clone());

    Router::new()
        .nest("/api/v0", api_routes)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn version() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "version": "0.1.0",
        "api": "v0"
    }))
}
