//! Family member handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::db::{FamilyMember, QueryBackend};

use super::{ApiFailure, ErrorResponse, db_error};

#[derive(Debug, Serialize, ToSchema)]
pub struct FamilyMemberResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Chip")]
    pub name: String,
    #[schema(example = "blue")]
    pub color: String,
}

impl From<FamilyMember> for FamilyMemberResponse {
    fn from(m: FamilyMember) -> Self {
        Self {
            id: m.id,
            name: m.name,
            color: m.color,
        }
    }
}

/// List family members
#[utoipa::path(
    get,
    path = "/v1/family",
    tag = "family",
    responses(
        (status = 200, description = "All family members", body = Vec<FamilyMemberResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_family<B: QueryBackend>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<FamilyMemberResponse>>, ApiFailure> {
    let members = state.db().family().list().await.map_err(db_error)?;

    Ok(Json(
        members.into_iter().map(FamilyMemberResponse::from).collect(),
    ))
}
