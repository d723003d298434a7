//! Chore management and completion handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::api::AppState;
use crate::db::{
    Assignee, Chore, ChoreFilter, ChorePatch, CompletionUpdate, NewChore, QueryBackend,
    RepeatType, Timeframe,
};

use super::{ApiFailure, ErrorResponse, bad_request, db_error};

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Chip")]
    pub name: String,
    #[schema(example = "blue")]
    pub color: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Assignee> for AssigneeResponse {
    fn from(a: Assignee) -> Self {
        Self {
            id: a.id,
            name: a.name,
            color: a.color,
            completed: a.completed,
            completed_at: a.completed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChoreResponse {
    #[schema(example = 7)]
    pub id: i64,
    #[schema(example = "Take out trash")]
    pub name: String,
    #[schema(example = "Both bins")]
    pub details: Option<String>,
    pub due_date: NaiveDate,
    /// one-time, daily or weekly
    #[schema(example = "weekly")]
    pub repeat_type: String,
    /// True once every assignee has completed the chore
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub assigned_to: Vec<AssigneeResponse>,
}

impl From<Chore> for ChoreResponse {
    fn from(c: Chore) -> Self {
        Self {
            id: c.id,
            name: c.name,
            details: c.details,
            due_date: c.due_date,
            repeat_type: c.repeat_type.to_string(),
            completed: c.completed,
            created_at: c.created_at,
            assigned_to: c.assigned_to.into_iter().map(AssigneeResponse::from).collect(),
        }
    }
}

/// Create chore request DTO
///
/// Required fields are optional here so a missing one is reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateChoreRequest {
    #[schema(example = "Take out trash")]
    pub name: Option<String>,
    pub details: Option<String>,
    #[schema(example = "2025-06-10")]
    pub due_date: Option<NaiveDate>,
    /// one-time (default), daily or weekly
    #[schema(example = "weekly")]
    pub repeat_type: Option<String>,
    /// Family member ids; at least one
    #[schema(example = json!([1, 3]))]
    pub assigned_to: Option<Vec<i64>>,
}

/// Update chore request DTO
///
/// Omitted fields are left unchanged. `details: null` clears the details.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChoreRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub details: Option<Option<String>>,
    pub due_date: Option<NaiveDate>,
    pub repeat_type: Option<String>,
    /// Replaces the assignee set; may be empty
    pub assigned_to: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteChoreRequest {
    #[schema(example = 7)]
    pub chore_id: i64,
    #[schema(example = 1)]
    pub member_id: i64,
    /// Defaults to true
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub chore_id: i64,
    pub member_id: i64,
    pub completed: bool,
    /// Chore-level completion after the change
    pub chore_completed: bool,
}

impl From<CompletionUpdate> for CompletionResponse {
    fn from(u: CompletionUpdate) -> Self {
        Self {
            chore_id: u.chore_id,
            member_id: u.member_id,
            completed: u.completed,
            chore_completed: u.chore_completed,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListChoresQuery {
    /// Only chores assigned to this member
    #[param(example = 1)]
    pub member_id: Option<i64>,
    /// Include chores whose relevant assignment is done (default false)
    pub show_completed: Option<bool>,
    /// today (default), week or all
    #[param(example = "week")]
    pub timeframe: Option<String>,
}

fn parse_repeat_type(value: Option<&str>) -> Result<Option<RepeatType>, ApiFailure> {
    value
        .map(|s| s.parse::<RepeatType>().map_err(bad_request))
        .transpose()
}

// =============================================================================
// Handlers
// =============================================================================

/// List chores
///
/// Chores due within the timeframe, each with its full assignee list
#[utoipa::path(
    get,
    path = "/v1/chores",
    tag = "chores",
    params(ListChoresQuery),
    responses(
        (status = 200, description = "Matching chores", body = Vec<ChoreResponse>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_chores<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Query(query): Query<ListChoresQuery>,
) -> Result<Json<Vec<ChoreResponse>>, ApiFailure> {
    let timeframe = match query.timeframe.as_deref() {
        Some(s) => s.parse::<Timeframe>().map_err(bad_request)?,
        None => Timeframe::default(),
    };

    let filter = ChoreFilter {
        member_id: query.member_id,
        include_completed: query.show_completed.unwrap_or(false),
        timeframe,
    };

    let chores = state.db().chores().list(&filter).await.map_err(db_error)?;

    Ok(Json(chores.into_iter().map(ChoreResponse::from).collect()))
}

/// Get a chore by ID
#[utoipa::path(
    get,
    path = "/v1/chores/{id}",
    tag = "chores",
    params(("id" = i64, Path, description = "Chore ID")),
    responses(
        (status = 200, description = "Chore found", body = ChoreResponse),
        (status = 404, description = "Chore not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_chore<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
) -> Result<Json<ChoreResponse>, ApiFailure> {
    let chore = state.db().chores().get(id).await.map_err(db_error)?;

    Ok(Json(ChoreResponse::from(chore)))
}

/// Create a chore
#[utoipa::path(
    post,
    path = "/v1/chores",
    tag = "chores",
    request_body = CreateChoreRequest,
    responses(
        (status = 201, description = "Chore created", body = ChoreResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_chore<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Json(req): Json<CreateChoreRequest>,
) -> Result<(StatusCode, Json<ChoreResponse>), ApiFailure> {
    let name = req.name.ok_or_else(|| bad_request("Chore name is required"))?;
    let due_date = req.due_date.ok_or_else(|| bad_request("Due date is required"))?;
    let assignee_ids = req
        .assigned_to
        .ok_or_else(|| bad_request("At least one family member must be assigned"))?;
    let repeat_type = parse_repeat_type(req.repeat_type.as_deref())?.unwrap_or_default();

    let chore = state
        .db()
        .chores()
        .create(NewChore {
            name,
            details: req.details,
            due_date,
            repeat_type,
            assignee_ids,
        })
        .await
        .map_err(db_error)?;

    Ok((StatusCode::CREATED, Json(ChoreResponse::from(chore))))
}

/// Update a chore
///
/// Applies only the supplied fields; `assignedTo` replaces the assignee set
#[utoipa::path(
    put,
    path = "/v1/chores/{id}",
    tag = "chores",
    params(("id" = i64, Path, description = "Chore ID")),
    request_body = UpdateChoreRequest,
    responses(
        (status = 200, description = "Chore updated", body = ChoreResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "Chore not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_chore<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateChoreRequest>,
) -> Result<Json<ChoreResponse>, ApiFailure> {
    let patch = ChorePatch {
        name: req.name,
        details: req.details,
        due_date: req.due_date,
        repeat_type: parse_repeat_type(req.repeat_type.as_deref())?,
    };

    let chore = state
        .db()
        .chores()
        .update(id, patch, req.assigned_to)
        .await
        .map_err(db_error)?;

    Ok(Json(ChoreResponse::from(chore)))
}

/// Delete a chore
#[utoipa::path(
    delete,
    path = "/v1/chores/{id}",
    tag = "chores",
    params(("id" = i64, Path, description = "Chore ID")),
    responses(
        (status = 204, description = "Chore deleted"),
        (status = 404, description = "Chore not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_chore<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    state.db().chores().delete(id).await.map_err(db_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Mark a member's part of a chore done or not done
#[utoipa::path(
    post,
    path = "/v1/chores/complete",
    tag = "chores",
    request_body = CompleteChoreRequest,
    responses(
        (status = 200, description = "Completion recorded", body = CompletionResponse),
        (status = 404, description = "Member is not assigned to the chore", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn complete_chore<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Json(req): Json<CompleteChoreRequest>,
) -> Result<Json<CompletionResponse>, ApiFailure> {
    let update = state
        .db()
        .completion()
        .set_completion(req.chore_id, req.member_id, req.completed)
        .await
        .map_err(db_error)?;

    Ok(Json(CompletionResponse::from(update)))
}
