use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::LeadCreationResult;
use crate::webhook_models::WebhookPayload;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Form webhook endpoint.
///
/// Receives form submissions, resolves the submitter against the directory,
/// and files a lead. Authentication: when a webhook token is configured, the
/// `X-Webhook-Token` header must match it.
pub async fn lead_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    tracing::info!("Received form webhook");
    validate_webhook_token(&state, &headers)?;

    let submission = payload.into_submission();

    // At least one identity signal is required to do anything useful.
    if submission.name.is_none() && submission.email.is_none() && submission.phone.is_none() {
        tracing::warn!("Missing required fields (name, email, or phone)");
        return Err(AppError::BadRequest(
            "Missing required fields: at least one of name, email, or phone is required"
                .to_string(),
        ));
    }

    let result = state.orchestrator.process(&submission).await;

    if result.success {
        tracing::info!(
            "Lead created successfully: customer={:?}, lead={:?}",
            result.customer_id,
            result.lead_id
        );
        let mut body = json!({
            "success": true,
            "message": result.message,
            "customer_id": result.customer_id,
            "lead_id": result.lead_id,
        });
        if !result.warnings.is_empty() {
            body["warnings"] = json!(result.warnings);
        }
        Ok((StatusCode::OK, Json(body)))
    } else {
        tracing::error!("Failed to create lead: {:?}", result.error);
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "customer_id": result.customer_id,
                "error": result.error,
            })),
        ))
    }
}

/// Manual testing endpoint: same pipeline, but always responds 200 with the
/// full workflow result.
pub async fn test_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<LeadCreationResult>, AppError> {
    tracing::info!("Test endpoint called");
    validate_webhook_token(&state, &headers)?;

    let submission = payload.into_submission();
    let result = state.orchestrator.process(&submission).await;
    Ok(Json(result))
}

/// Validate the shared webhook token, when one is configured.
fn validate_webhook_token(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected_token) = state.config.webhook_token else {
        return Ok(());
    };

    let token = headers
        .get("X-Webhook-Token")
        .or_else(|| headers.get("x-webhook-token"))
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Webhook-Token header".to_string()))?;

    // Constant-time comparison to prevent timing attacks
    if !constant_time_compare(token, expected_token) {
        tracing::warn!("Invalid webhook token received");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret", "secret"));
        assert!(!constant_time_compare("secret", "secret2"));
        assert!(!constant_time_compare("secret", "Secret"));
        assert!(constant_time_compare("", ""));
    }
}
