//! V1 API handlers.

mod admin;
mod chores;
mod family;
mod reports;


use axum::{Json, http::StatusCode};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::db::{DbError, ErrorKind};

pub use admin::*;
pub use chores::*;
pub use family::*;
pub use reports::*;

/// Error response DTO
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    #[schema(example = "Entity not found: Chore with id '7'")]
    pub error: String,
    /// Stable error classification
    #[schema(example = "not_found")]
    pub kind: String,
}

/// Error half of every v1 handler result.
pub type ApiFailure = (StatusCode, Json<ErrorResponse>);

/// Map a storage error onto its HTTP status and body.
pub fn db_error(e: DbError) -> ApiFailure {
    let kind = e.kind();
    let status = match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Connection | ErrorKind::Initialization => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(error = %e, kind = %kind, "Request failed");
    } else {
        warn!(error = %e, kind = %kind, "Request rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            kind: kind.to_string(),
        }),
    )
}

/// A 400 for input the storage layer never sees.
pub(crate) fn bad_request(message: impl Into<String>) -> ApiFailure {
    db_error(DbError::Validation {
        message: message.into(),
    })
}
