//! Readiness handler: database round trip and connection pool state

use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::AppState;

/// Connection pool occupancy at the time of the check
#[derive(Debug, Serialize)]
pub struct PoolState {
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub version: &'static str,
    pub database_latency_ms: Option<u128>,
    pub pool: PoolState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn pool_state(db: &PgPool) -> PoolState {
    PoolState {
        size: db.size(),
        idle: db.num_idle(),
        max_connections: db.options().get_max_connections(),
    }
}

/// Ready only when the database answers a round trip.
///
/// Returns `503 Service Unavailable` with the failure reason otherwise, so a
/// load balancer can stop routing to this instance.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessReport>) {
    let started = Instant::now();
    let ping = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.db).await;
    let pool = pool_state(&state.db);

    match ping {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessReport {
                ready: true,
                version: env!("CARGO_PKG_VERSION"),
                database_latency_ms: Some(started.elapsed().as_millis()),
                pool,
                reason: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, pool_size = pool.size, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessReport {
                    ready: false,
                    version: env!("CARGO_PKG_VERSION"),
                    database_latency_ms: None,
                    pool,
                    reason: Some("database unreachable".to_string()),
                }),
            )
        }
    }
}
