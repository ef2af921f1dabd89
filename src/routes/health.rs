/**
 * Health Routes
 * Liveness, database and readiness checks
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;

lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Pin the uptime clock to process start.
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Result of pinging the store
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Readiness {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since startup
    pub uptime: u64,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Liveness {
    pub status: String,
}

/// GET /health
pub async fn health_ping() -> Json<Liveness> {
    Json(Liveness {
        status: "ok".to_string(),
    })
}

/// GET /health/database - store round-trip
pub async fn health_database(State(state): State<AppState>) -> impl IntoResponse {
    let (code, check) = match state.store.ping().await {
        Ok(elapsed) => (
            StatusCode::OK,
            DatabaseCheck {
                status: "healthy".to_string(),
                response_time: Some(elapsed.as_millis() as u64),
                error: None,
            },
        ),
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                DatabaseCheck {
                    status: "unhealthy".to_string(),
                    response_time: None,
                    error: Some(e.to_string()),
                },
            )
        }
    };
    (code, Json(check))
}

/// GET /health/ready - ready once the store answers
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = state.store.ping().await.is_ok();
    let (code, status, database) = if database_ok {
        (StatusCode::OK, "ready", "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready", "unhealthy")
    };

    let body = Readiness {
        status: status.to_string(),
        timestamp: Utc::now(),
        uptime: SERVER_START.elapsed().as_secs(),
        database: database.to_string(),
        reason: (!database_ok).then(|| "Database is not reachable".to_string()),
    };
    (code, Json(body))
}
