mod address;
mod config;
mod directory_client;
mod errors;
mod handlers;
mod matching;
mod models;
mod orchestrator;
mod phone;
mod similarity;
mod webhook_handler;
mod webhook_models;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::directory_client::DirectoryClient;
use crate::orchestrator::LeadOrchestrator;

/// Main entry point.
///
/// Initializes tracing, loads configuration, wires up the directory client
/// and the lead workflow, and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_intake=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the directory client and the workflow built on it
    let directory = DirectoryClient::new(
        config.directory_base_url.clone(),
        config.directory_api_key.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize directory client: {}", e))?;
    tracing::info!("Directory client initialized: {}", config.directory_base_url);

    let orchestrator = LeadOrchestrator::new(directory, config.clone());

    let app_state = Arc::new(handlers::AppState {
        config: config.clone(),
        orchestrator,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("valid rate limiter configuration"),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/webhook", post(webhook_handler::lead_webhook))
        .route("/test", post(webhook_handler::test_webhook))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
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
