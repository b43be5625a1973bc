mod common;

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use campus_news::{
    AppState, CoreError, RoleCatalog, create_router,
    auth::{AuthUser, Claims, actor_from_user, issue_token},
    authorization::MODERATOR_ROLE,
    config::{AppConfig, Env},
    models::{ArticleStatus, Capability, LegacyRole, User},
    notifications::{MockNotificationDispatcher, NotifierState},
    repository::{InMemoryRepository, RepositoryState},
};
use common::{article, role_definition};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use tower::ServiceExt;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "auth-integration-test-secret";

// --- Helpers ---

fn student(id: Uuid) -> User {
    User {
        id,
        email: "student@campus.test".to_string(),
        role: "student".to_string(),
        role_detailed: None,
        verified: true,
    }
}

fn token_with_exp(user_id: Uuid, exp: u64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: exp as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn create_app_state(env: Env, repo: InMemoryRepository) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        repo: Arc::new(repo) as RepositoryState,
        notifier: Arc::new(MockNotificationDispatcher::new()) as NotifierState,
        catalog: Arc::new(RoleCatalog::new([role_definition(
            MODERATOR_ROLE,
            &[(Capability::CanModerateNews, true)],
        )])),
        config,
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

// --- Extractor Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let user_id = Uuid::new_v4();
    let state = create_app_state(
        Env::Production,
        InMemoryRepository::new().with_user(student(user_id)),
    );
    let token = issue_token(TEST_JWT_SECRET, user_id, 3600).unwrap();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let AuthUser(actor) = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(actor.id, user_id);
    assert_eq!(actor.role_legacy, LegacyRole::Student);
    assert!(actor.role_detailed.is_none());
}

#[tokio::test]
async fn test_auth_resolves_detailed_role_through_catalog() {
    let user_id = Uuid::new_v4();
    let user = User {
        role_detailed: Some(MODERATOR_ROLE.to_string()),
        ..student(user_id)
    };
    let state = create_app_state(Env::Production, InMemoryRepository::new().with_user(user));
    let token = issue_token(TEST_JWT_SECRET, user_id, 3600).unwrap();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let AuthUser(actor) = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    let role = actor.role_detailed.expect("detailed role attached");
    assert_eq!(role.name, MODERATOR_ROLE);
    assert_eq!(role.permits(Capability::CanModerateNews), Some(true));
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = create_app_state(Env::Production, InMemoryRepository::new());
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Unauthenticated);
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let user_id = Uuid::new_v4();
    let state = create_app_state(
        Env::Production,
        InMemoryRepository::new().with_user(student(user_id)),
    );
    // Well past the default validation leeway.
    let an_hour_ago = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        - 3600;
    let token = token_with_exp(user_id, an_hour_ago);

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Unauthenticated);
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let user_id = Uuid::new_v4();
    let state = create_app_state(
        Env::Production,
        InMemoryRepository::new().with_user(student(user_id)),
    );
    let token = issue_token("some-other-secret", user_id, 3600).unwrap();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Unauthenticated);
}

#[tokio::test]
async fn test_auth_failure_for_deleted_profile() {
    let state = create_app_state(Env::Production, InMemoryRepository::new());
    let token = issue_token(TEST_JWT_SECRET, Uuid::new_v4(), 3600).unwrap();

    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    with_bearer(&mut parts, &token);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Unauthenticated);
}

#[tokio::test]
async fn test_local_bypass_header_only_in_local_env() {
    let user_id = Uuid::new_v4();

    let local = create_app_state(
        Env::Local,
        InMemoryRepository::new().with_user(student(user_id)),
    );
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts
        .headers
        .insert("x-user-id", user_id.to_string().parse().unwrap());
    let AuthUser(actor) = AuthUser::from_request_parts(&mut parts, &local)
        .await
        .unwrap();
    assert_eq!(actor.id, user_id);

    let production = create_app_state(
        Env::Production,
        InMemoryRepository::new().with_user(student(user_id)),
    );
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts
        .headers
        .insert("x-user-id", user_id.to_string().parse().unwrap());
    let err = AuthUser::from_request_parts(&mut parts, &production)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Unauthenticated);
}

#[test]
fn test_unknown_detailed_role_is_a_catalog_error() {
    let user = User {
        role_detailed: Some("ghost".to_string()),
        ..student(Uuid::new_v4())
    };
    let err = actor_from_user(&RoleCatalog::default(), user).unwrap_err();
    assert_eq!(err, CoreError::UnknownRole("ghost".to_string()));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- Router Tests ---

#[tokio::test]
async fn test_router_health_is_public() {
    let app = create_router(create_app_state(Env::Production, InMemoryRepository::new()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_router_rejects_anonymous_moderation_queue() {
    let app = create_router(create_app_state(Env::Production, InMemoryRepository::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/moderation/queue")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_router_forbids_queue_for_students() {
    let user_id = Uuid::new_v4();
    let app = create_router(create_app_state(
        Env::Production,
        InMemoryRepository::new().with_user(student(user_id)),
    ));
    let token = issue_token(TEST_JWT_SECRET, user_id, 3600).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/moderation/queue")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_router_approve_accepts_empty_body() {
    let moderator_id = Uuid::new_v4();
    let repo = InMemoryRepository::new().with_user(User {
        role: "moderator".to_string(),
        ..student(moderator_id)
    });
    let pending = repo
        .seed_article(article(Uuid::new_v4(), ArticleStatus::Pending))
        .unwrap();
    let app = create_router(create_app_state(Env::Production, repo));
    let token = issue_token(TEST_JWT_SECRET, moderator_id, 3600).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/moderation/articles/{}/approve", pending.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
