//! Service and database health endpoints.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;
use crate::infrastructure::db::PoolStatus;

use super::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
}

#[derive(Serialize)]
pub struct DbCheckResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub pool: PoolStatus,
    pub latency_ms: u64,
}

/// Liveness: returns 200 whenever the process is serving requests, without
/// touching any dependency.
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness: runs a trivial statement through the pool and reports slot
/// occupancy alongside the verdict.
pub async fn db_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let ping = state.db.ping().await;
    let pool = state.db.pool_status().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match ping {
        Ok(()) => (
            StatusCode::OK,
            Json(DbCheckResponse {
                status: "connected",
                message: None,
                pool,
                latency_ms,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(DbCheckResponse {
                status: "unavailable",
                message: Some(e.to_string()),
                pool,
                latency_ms,
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            version: "1.0.0".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"version\":\"1.0.0\""));
    }

    #[test]
    fn test_db_check_omits_message_when_connected() {
        let response = DbCheckResponse {
            status: "connected",
            message: None,
            pool: PoolStatus::default(),
            latency_ms: 3,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"busy\":0"));
        assert!(!json.contains("message"));
    }
}
