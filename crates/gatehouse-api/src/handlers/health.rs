//! Health check handlers

use crate::handlers::auth::MessageResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub name: String,
    pub uptime_secs: u64,
    /// Number of tokens revoked since startup
    pub revoked_tokens: usize,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        uptime_secs: state.uptime_secs(),
        revoked_tokens: state.registry().len(),
    })
}

/// API banner
#[utoipa::path(
    get,
    path = "/api/v1",
    tag = "health",
    responses(
        (status = 200, description = "API banner", body = MessageResponse)
    )
)]
pub async fn banner() -> impl IntoResponse {
    Json(MessageResponse {
        status: StatusCode::OK.as_u16(),
        message: "Gatehouse REST API".to_string(),
    })
}
