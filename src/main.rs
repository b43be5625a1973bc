use campus_news::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    notifications::{LogDispatcher, NotifierState, WebhookDispatcher},
    repository::{PostgresRepository, Repository, RepositoryState},
    roles::RoleCatalog,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Wires configuration, logging, the database, the role catalog and the notification
/// dispatcher into the shared state, then serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise development defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campus_news=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database and migrations
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    let postgres = PostgresRepository::new(pool);

    // 4. Role catalog, loaded once. An unknown capability key in `roles` aborts startup.
    let records = postgres
        .list_role_records()
        .await
        .expect("FATAL: Failed to load role definitions.");
    let catalog = RoleCatalog::from_records(records)
        .expect("FATAL: Invalid role definition in the roles table.");
    tracing::info!(roles = catalog.len(), "role catalog loaded");

    let repo = Arc::new(postgres) as RepositoryState;

    // 5. Notification dispatcher
    let notifier = match config.notify_webhook_url.as_deref() {
        Some(endpoint) => {
            tracing::info!(endpoint, "dispatching notices to webhook");
            Arc::new(WebhookDispatcher::new(endpoint)) as NotifierState
        }
        None => {
            tracing::warn!("NOTIFY_WEBHOOK_URL unset; notices will only be logged");
            Arc::new(LogDispatcher) as NotifierState
        }
    };

    // 6. Unified state and server startup
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        notifier,
        catalog: Arc::new(catalog),
        config,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await.unwrap();
}
