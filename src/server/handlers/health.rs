//! Health endpoint.

use axum::Json;
use axum::extract::State;

use crate::server::AppState;
use crate::server::types::HealthResponse;

/// Reports service liveness and database connectivity. Always 200; a
/// broken database shows up in the body so probes can alert without the
/// load balancer dropping the instance.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.store.database().health_check().await {
        Ok(()) => Json(HealthResponse {
            status: "healthy",
            database: "connected",
        }),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            Json(HealthResponse {
                status: "unhealthy",
                database: "disconnected",
            })
        }
    }
}
