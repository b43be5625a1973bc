use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any signed-in user. Every handler receives the `AuthUser` actor snapshot;
/// authorship and capability checks happen in the article and engagement services.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's roles and effective capabilities.
        .route("/me", get(handlers::get_me))
        // GET /me/articles
        // Everything the caller wrote, drafts and rejected articles included.
        .route("/me/articles", get(handlers::get_my_articles))
        // --- Authoring ---
        // POST /articles
        // Create and submit in one step. Nothing is stored if a guard fails.
        .route("/articles", post(handlers::submit_article))
        .route("/articles/drafts", post(handlers::create_draft))
        // PUT /articles/{id}
        // Author edits while the article is a draft or rejected.
        .route("/articles/{id}", put(handlers::update_draft))
        .route("/articles/{id}/submit", post(handlers::submit_draft))
        .route("/articles/{id}/resubmit", post(handlers::resubmit_article))
        // GET /articles/{id}/preview
        // Any status, for the author and moderators.
        .route("/articles/{id}/preview", get(handlers::preview_article))
        // --- Engagement ---
        // POST toggles; PUT sets an explicit state and is safe to retry.
        .route(
            "/articles/{id}/like",
            post(handlers::toggle_like).put(handlers::set_like),
        )
        .route("/articles/{id}/views", post(handlers::record_view))
}
