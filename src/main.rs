use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_kyc_api::application::ApplicationService;
use rust_kyc_api::catalog::{self, CardCatalog};
use rust_kyc_api::config::Config;
use rust_kyc_api::handlers::{self, AppState};
use rust_kyc_api::services::{CibilService, LlmService, VectorSearchService};
use rust_kyc_api::storage::{self, ApplicationStore};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Database connection and schema bootstrap.
/// - Caches (OCR results, credit reports).
/// - External service clients and the card catalog.
/// - HTTP routes and middleware (CORS, Rate Limiting, body size limit).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_kyc_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool and schema
    let pool = storage::connect_pool(&config.database_url).await?;
    tracing::info!("Database connection pool established");
    ApplicationStore::new(pool.clone()).ensure_schema().await?;
    tracing::info!("Applications schema ready");

    // OCR result cache keyed by file checksum (24h TTL, 10k max entries).
    // Same bytes, same OCR output; the TTL just bounds memory.
    let ocr_cache = Cache::builder()
        .time_to_live(Duration::from_secs(86_400))
        .max_capacity(10_000)
        .build();
    tracing::info!("OCR result cache initialized");

    // Credit report cache keyed by PAN (1 hour TTL).
    let cibil_cache = Cache::builder()
        .time_to_live(Duration::from_secs(3_600))
        .max_capacity(10_000)
        .build();
    tracing::info!("Credit report cache initialized");

    // External service clients and the card catalog
    let applications = Arc::new(ApplicationService::new(&config, pool.clone(), ocr_cache));
    let vector = Arc::new(VectorSearchService::new(&config));
    let llm = Arc::new(LlmService::new(&config));
    let cibil = Arc::new(CibilService::new(&config));
    let card_catalog = Arc::new(CardCatalog::new());

    // Warm the card catalog; recommendations degrade to an empty list when
    // this fails, so failures are logged and not fatal.
    if let Some(ref file) = config.card_data_file {
        match catalog::load_card_file(file).await {
            Ok(records) => {
                let count = card_catalog.replace(records);
                tracing::info!("Card catalog loaded with {} cards from file", count);
            }
            Err(e) => tracing::warn!("Card catalog warm-up failed: {}", e),
        }
    } else if vector.is_configured() {
        match vector.fetch_all_cards().await {
            Ok(records) => {
                let count = card_catalog.replace(records);
                tracing::info!("Card catalog loaded with {} cards from vector store", count);
            }
            Err(e) => tracing::warn!("Card catalog warm-up failed: {}", e),
        }
    }

    // Build application state
    let app_state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        applications,
        catalog: card_catalog,
        vector,
        llm,
        cibil,
        cibil_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/applications", post(handlers::submit_application))
        .route("/api/v1/applications/:id", get(handlers::get_application))
        .route(
            "/api/v1/applications/number/:application_number",
            get(handlers::get_application_by_number),
        )
        .route(
            "/api/v1/users/:user_id/applications",
            get(handlers::list_applications),
        )
        .route("/api/v1/recommendations", post(handlers::recommend))
        .route(
            "/api/v1/recommendations/search",
            get(handlers::search_cards),
        )
        .route(
            "/api/v1/recommendations/reindex",
            post(handlers::reindex),
        )
        .route("/api/v1/credit-score", post(handlers::credit_score))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 20MB covers multi-document scans
                .layer(RequestBodyLimitLayer::new(20 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
