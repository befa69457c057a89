//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::ApiResponse;

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_i64)]
    pub timestamp_ms: i64,
    /// Active store backend
    #[schema(example = "postgres")]
    pub store: &'static str,
}

/// Health check endpoint
///
/// Pings the store. Failure details go to the log, not the response.
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, store}}
/// - Unhealthy: 503 Service Unavailable + {code: 503, msg: "unavailable"}
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse, content_type = "application/json"),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let store = state.engine.store();

    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: Utc::now().timestamp_millis(),
                store: store.name(),
            })),
        ),
        Err(e) => {
            tracing::error!("[HEALTH] {} ping failed: {}", store.name(), e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(503, "unavailable")),
            )
        }
    }
}
