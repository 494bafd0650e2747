use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Reports 503 when the store cannot be reached.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let mut services = HashMap::new();

    let healthy = match state.console.ping().await {
        Ok(()) => {
            services.insert("storage".to_string(), "connected".to_string());
            true
        }
        Err(e) => {
            tracing::warn!("Storage health check failed: {}", e);
            services.insert("storage".to_string(), "disconnected".to_string());
            false
        }
    };
    services.insert("backend".to_string(), state.config.storage.backend.clone());

    let (status, label) = if healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        ApiResponse::ok(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            services,
        }),
    )
}
