use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Moderation Router Module
///
/// Nested under `/moderation` behind the authentication layer. Moderation verdicts need
/// `can_moderate_news`, invalidation needs admin rights and user verification needs
/// `can_verify_users`; the services enforce each of these and answer 403 otherwise.
pub fn moderation_routes() -> Router<AppState> {
    Router::new()
        // GET /moderation/queue
        .route("/queue", get(handlers::get_moderation_queue))
        // POST /moderation/articles/{id}
        // Generic verdict endpoint: `{"action": "approve" | "reject", ...}`.
        .route("/articles/{id}", post(handlers::moderate_article))
        .route("/articles/{id}/approve", post(handlers::approve_article))
        .route("/articles/{id}/reject", post(handlers::reject_article))
        // POST /moderation/articles/{id}/invalidate
        // Irreversible withdrawal of a published article.
        .route("/articles/{id}/invalidate", post(handlers::invalidate_article))
        .route("/articles/{id}/audit", get(handlers::get_audit_log))
        .route("/users/{id}/verify", post(handlers::verify_user))
}
