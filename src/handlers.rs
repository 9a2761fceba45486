use crate::config::Config;
use crate::orchestrator::LeadOrchestrator;
use axum::{http::StatusCode, Json};
use serde_json::json;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The submission-to-lead workflow.
    pub orchestrator: LeadOrchestrator,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-intake",
            "version": "0.1.0"
        })),
    )
}
