//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, LocalObjectStore},
    config::{Config, ConfigError},
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        editor_handler, require_auth,
        rest::{
            create_lesson_handler, create_quiz_handler, create_topic_handler, delete_topic_handler,
            get_lesson_handler, get_quiz_handler, get_topic_handler, list_lessons_handler,
            list_topics_handler, update_quiz_handler, update_topic_handler, upsert_lesson_handler,
        },
        state::AppState,
        uploads::upload_handler,
        ApiDoc,
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Headroom for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Media Storage ---
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let storage = Arc::new(LocalObjectStore::new(
        config.upload_dir.clone(),
        config.public_media_url.clone(),
    ));
    info!(
        "Storing uploads in {:?}, served from {}",
        config.upload_dir, config.public_media_url
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter.clone(),
        drafts: db_adapter,
        storage,
        config: config.clone(),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/topics", get(list_topics_handler).post(create_topic_handler))
        .route(
            "/topics/{topic_id}",
            get(get_topic_handler)
                .put(update_topic_handler)
                .delete(delete_topic_handler),
        )
        .route(
            "/topics/{topic_id}/lessons",
            get(list_lessons_handler).post(create_lesson_handler),
        )
        .route(
            "/topics/{topic_id}/lessons/{lesson_id}",
            get(get_lesson_handler).put(upsert_lesson_handler),
        )
        .route(
            "/lessons/{lesson_id}/quiz",
            get(get_quiz_handler)
                .post(create_quiz_handler)
                .put(update_quiz_handler),
        )
        .route("/uploads/{kind}", post(upload_handler))
        .route("/editor", get(editor_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes + MULTIPART_OVERHEAD))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with uploaded media and the Swagger UI.
    let app = Router::new()
        .merge(api_router)
        .nest_service("/media", ServeDir::new(&config.upload_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
