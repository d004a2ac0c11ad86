//! Liveness endpoint

use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Liveness response
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

/// Liveness probe - is the service running?
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online",
        timestamp: Utc::now().to_rfc3339(),
        service: "atende-gateway",
    })
}
