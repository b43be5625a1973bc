use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable without a session. Only published articles are ever returned here;
/// any other status answers 404 so its existence is not disclosed.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /articles
        .route("/articles", get(handlers::list_published))
        // GET /articles/{id}
        .route("/articles/{id}", get(handlers::get_published_article))
}
