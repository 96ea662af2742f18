use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    chat_handler, health_handler, index_handler, not_found_handler, test_handler,
};
use super::limiter::{ChatRateLimiter, limit_chat_requests};
use super::server::AppState;

/// Only `/api/chat` is rate limited and body capped; the page, test and
/// health routes stay open.
pub(crate) fn build_router(
    state: AppState,
    limiter: ChatRateLimiter,
    max_body_size: usize,
) -> Router {
    if limiter.is_disabled() {
        tracing::debug!("chat rate limiting disabled");
    }
    let chat = Router::new()
        .route("/api/chat", post(chat_handler))
        .layer(middleware::from_fn_with_state(limiter, limit_chat_requests))
        .layer(RequestBodyLimitLayer::new(max_body_size));

    Router::new()
        .route("/", get(index_handler))
        .route("/api/test", get(test_handler))
        .route("/health", get(health_handler))
        .merge(chat)
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
