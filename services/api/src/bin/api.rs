//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileTextExtractor, GeminiGenerationAdapter, InMemoryProjectRepository, SqliteProjectRepository},
    config::{Config, StorageBackend},
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    Router,
};
use courseware_core::{ProjectRepository, Workspace};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Storage & Run Migrations ---
    let repository: Arc<dyn ProjectRepository> = match &config.storage {
        StorageBackend::Sqlite(url) => {
            info!("Connecting to database...");
            let db_pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            let store = SqliteProjectRepository::new(db_pool);
            info!("Running database migrations...");
            store.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(store)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; projects will not survive a restart.");
            Arc::new(InMemoryProjectRepository::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new()
        .with_api_base(&config.gemini_base_url)
        .with_api_key(
            config
                .gemini_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("GEMINI_API_KEY is required".to_string()))?,
        );
    let openai_client = Client::with_config(openai_config);

    let generator = Arc::new(GeminiGenerationAdapter::new(
        openai_client,
        config.text_model.clone(),
        config.image_model.clone(),
        config.retry,
    ));
    let extractor = Arc::new(FileTextExtractor::new());

    // --- 4. Open the Workspace & Build the Shared AppState ---
    let workspace = Workspace::open(repository).await?;
    let app_state = Arc::new(AppState::new(
        config.clone(),
        workspace,
        generator.clone(),
        generator,
        extractor,
    ));

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    // --- 5. Create the Web Router ---
    let api_router = web::router()
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state.clone());

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    // A rename may still be waiting for its quiet period.
    app_state.rename_saver.flush_now().await;
    info!("Server stopped.");

    Ok(())
}
