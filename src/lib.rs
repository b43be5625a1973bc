use axum::{
    extract::{FromRef, Request},
    http::HeaderName,
    Router,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// The authorization and content lifecycle core.
pub mod authorization;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod roles;

// Services orchestrating the core against its collaborators.
pub mod accounts;
pub mod articles;
pub mod engagement;
pub mod moderation;

// Collaborators and the HTTP surface.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod notifications;
pub mod repository;
pub mod routes;

use auth::AuthUser;
use routes::{authenticated, moderation as moderation_routes, public};

// --- Public Re-exports ---

pub use accounts::AccountService;
pub use articles::ArticleService;
pub use authorization::AuthorizationResolver;
pub use config::AppConfig;
pub use engagement::EngagementCounters;
pub use error::CoreError;
pub use lifecycle::ArticleLifecycle;
pub use moderation::ModerationService;
pub use notifications::{LogDispatcher, MockNotificationDispatcher, NotifierState, WebhookDispatcher};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use roles::{CatalogState, RoleCatalog};

/// ApiDoc
///
/// The generated OpenAPI document, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_published, handlers::get_published_article, handlers::get_me,
        handlers::get_my_articles, handlers::submit_article, handlers::create_draft,
        handlers::update_draft, handlers::submit_draft, handlers::resubmit_article,
        handlers::preview_article, handlers::toggle_like, handlers::set_like,
        handlers::record_view, handlers::get_moderation_queue, handlers::moderate_article,
        handlers::approve_article, handlers::reject_article, handlers::invalidate_article,
        handlers::get_audit_log, handlers::verify_user
    ),
    components(
        schemas(
            models::Article, models::ArticleStatus, models::ArticleDraft, models::DraftEdits,
            models::ModerateRequest, models::ModerationPayload, models::Verdict,
            models::InvalidateRequest, models::ModerationAuditEntry, models::ModerationAction,
            models::LikeToggle, models::SetLikeRequest, models::ViewCount, models::ActorProfile,
            models::Capability, models::User, models::VerifyUserRequest,
        )
    ),
    tags(
        (name = "campus-news", description = "University news moderation API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of everything a request may need. Services are built
/// from it on demand through `FromRef`, so they share the same repository, dispatcher and
/// role catalog.
#[derive(Clone)]
pub struct AppState {
    /// Persistence collaborator.
    pub repo: RepositoryState,
    /// Notification collaborator.
    pub notifier: NotifierState,
    /// Detailed role definitions, loaded once at startup.
    pub catalog: CatalogState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for NotifierState {
    fn from_ref(app_state: &AppState) -> NotifierState {
        app_state.notifier.clone()
    }
}

impl FromRef<AppState> for CatalogState {
    fn from_ref(app_state: &AppState) -> CatalogState {
        app_state.catalog.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for ModerationService {
    fn from_ref(app_state: &AppState) -> ModerationService {
        ModerationService::new(app_state.repo.clone(), app_state.notifier.clone())
            .with_approval_reason(app_state.config.approval_reason.clone())
    }
}

impl FromRef<AppState> for ArticleService {
    fn from_ref(app_state: &AppState) -> ArticleService {
        ArticleService::new(app_state.repo.clone())
    }
}

impl FromRef<AppState> for EngagementCounters {
    fn from_ref(app_state: &AppState) -> EngagementCounters {
        EngagementCounters::new(app_state.repo.clone())
    }
}

impl FromRef<AppState> for AccountService {
    fn from_ref(app_state: &AppState) -> AccountService {
        AccountService::new(app_state.repo.clone())
    }
}

/// auth_middleware
///
/// Rejects the request unless an `AuthUser` can be extracted from it. The extractor itself
/// produces the 401, so the handler is never reached.
async fn auth_middleware(
    _auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the route groups, applies the authentication layer to the protected ones,
/// and wraps everything in the request-id and tracing layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware
                ))
        )
        // Capability checks happen inside the core; this layer only requires a session.
        .nest(
            "/moderation",
            moderation_routes::moderation_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware
                )),
        )
        .with_state(state);

    base_router
        .layer(
             ServiceBuilder::new()
                 .layer(SetRequestIdLayer::new(
                     x_request_id.clone(),
                     MakeRequestUuid,
                 ))
                 .layer(
                     TraceLayer::new_for_http()
                         .make_span_with(trace_span_logger)
                         .on_response(
                             DefaultOnResponse::new()
                                 .level(Level::INFO)
                                 .latency_unit(tower_http::LatencyUnit::Millis)
                         )
                 )
                 .layer(PropagateRequestIdLayer::new(x_request_id))
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above so
/// that every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
