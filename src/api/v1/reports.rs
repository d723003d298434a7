//! Report handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::api::AppState;
use crate::db::{ChoreSummary, QueryBackend, WeeklyReport};

use super::{ApiFailure, ErrorResponse, FamilyMemberResponse, bad_request, db_error};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncompleteChoreResponse {
    pub id: i64,
    pub name: String,
    pub details: Option<String>,
    pub due_date: NaiveDate,
    #[schema(example = "daily")]
    pub repeat_type: String,
}

impl From<ChoreSummary> for IncompleteChoreResponse {
    fn from(c: ChoreSummary) -> Self {
        Self {
            id: c.id,
            name: c.name,
            details: c.details,
            due_date: c.due_date,
            repeat_type: c.repeat_type.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummaryResponse {
    pub total_chores: usize,
    pub completed_chores: usize,
    /// Rounded half up; 0 when there are no chores
    #[schema(example = 67)]
    pub completion_percentage: u32,
    pub incomplete_chores: Vec<IncompleteChoreResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportPeriodResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportResponse {
    pub member: FamilyMemberResponse,
    pub report: ReportSummaryResponse,
    pub report_period: ReportPeriodResponse,
}

impl From<WeeklyReport> for WeeklyReportResponse {
    fn from(r: WeeklyReport) -> Self {
        Self {
            member: r.member.into(),
            report: ReportSummaryResponse {
                total_chores: r.report.total_chores,
                completed_chores: r.report.completed_chores,
                completion_percentage: r.report.completion_percentage,
                incomplete_chores: r
                    .report
                    .incomplete_chores
                    .into_iter()
                    .map(IncompleteChoreResponse::from)
                    .collect(),
            },
            report_period: ReportPeriodResponse {
                from: r.report_period.from,
                to: r.report_period.to,
            },
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReportQuery {
    /// Member to report on
    #[param(example = 1)]
    pub member_id: Option<i64>,
}

/// Weekly completion report for one member
///
/// Covers the seven days up to and including today, plus recurring chores
#[utoipa::path(
    get,
    path = "/v1/reports/weekly",
    tag = "reports",
    params(WeeklyReportQuery),
    responses(
        (status = 200, description = "Report for the member", body = WeeklyReportResponse),
        (status = 400, description = "memberId missing", body = ErrorResponse),
        (status = 404, description = "Member not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn weekly_report<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Query(query): Query<WeeklyReportQuery>,
) -> Result<Json<WeeklyReportResponse>, ApiFailure> {
    let member_id = query
        .member_id
        .ok_or_else(|| bad_request("memberId is required"))?;

    let report = state
        .db()
        .reports()
        .weekly_report(member_id)
        .await
        .map_err(db_error)?;

    Ok(Json(WeeklyReportResponse::from(report)))
}
