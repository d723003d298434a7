//! Database administration handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::db::QueryBackend;

use super::{ApiFailure, ErrorResponse, db_error};

#[derive(Debug, Serialize, ToSchema)]
pub struct InitDbResponse {
    #[schema(example = "Database initialized")]
    pub message: String,
}

/// Create tables and seed the family
///
/// Safe to call any number of times
#[utoipa::path(
    post,
    path = "/v1/init-db",
    tag = "admin",
    responses(
        (status = 200, description = "Schema ready", body = InitDbResponse),
        (status = 503, description = "Initialization failed", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn init_db<B: QueryBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<InitDbResponse>, ApiFailure> {
    state.db().initialize().await.map_err(db_error)?;
    info!("Schema initialized on request");

    Ok(Json(InitDbResponse {
        message: "Database initialized".to_string(),
    }))
}
