//! Readiness handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::db::QueryBackend;

/// Readiness response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `unavailable` when the database cannot be queried
    #[schema(example = "ok")]
    pub status: String,
    /// Storage dialect in use
    #[schema(example = "sqlite")]
    pub database: String,
}

/// Readiness check
///
/// Runs a trivial query against the storage backend
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health<B: QueryBackend>(
    State(state): State<AppState<B>>,
) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.db().backend();
    let database = backend.dialect().name().to_string();

    match backend.execute("SELECT 1", &[]).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                database,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".to_string(),
                    database,
                }),
            )
        }
    }
}
