mod handlers;
mod models;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::config::AppConfig;

pub use models::{ChatReply, ChatRequest, ErrorResponse, PingResponse};

pub fn router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/chat",
            get(handlers::health)
                .post(handlers::chat)
                .fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .with_state(config)
}
