//! API route configuration.

use axum::Router;
use axum::routing::{delete, get, post, put};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use super::handlers::{self, HealthResponse};
use super::state::AppState;
use super::v1::{
    self, AssigneeResponse, ChoreResponse, CompleteChoreRequest, CompletionResponse,
    CreateChoreRequest, ErrorResponse, FamilyMemberResponse, IncompleteChoreResponse,
    InitDbResponse, ReportPeriodResponse, ReportSummaryResponse, UpdateChoreRequest,
    WeeklyReportResponse,
};
use crate::db::QueryBackend;

/// Build routes with generic backend type.
///
/// Applies the turbofish to every handler, since they are all generic over
/// the storage backend.
macro_rules! routes {
    ($B:ty => {
        $($method:ident $path:literal => $($handler:ident)::+),* $(,)?
    }) => {{
        let router = Router::new();
        $(
            let router = router.route($path, $method($($handler)::+::<$B>));
        )*
        router
    }};
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chores API",
        version = "0.1.0",
        description = "Household chore tracker with per-member completion and weekly reports",
        license(name = "GPL-2.0")
    ),
    servers((url = "/api", description = "API root")),
    paths(
        handlers::health,
        v1::list_family,
        v1::list_chores,
        v1::get_chore,
        v1::create_chore,
        v1::update_chore,
        v1::delete_chore,
        v1::complete_chore,
        v1::weekly_report,
        v1::init_db,
    ),
    components(
        schemas(
            HealthResponse,
            FamilyMemberResponse,
            AssigneeResponse,
            ChoreResponse,
            CreateChoreRequest,
            UpdateChoreRequest,
            CompleteChoreRequest,
            CompletionResponse,
            IncompleteChoreResponse,
            ReportSummaryResponse,
            ReportPeriodResponse,
            WeeklyReportResponse,
            InitDbResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "family", description = "Family members"),
        (name = "chores", description = "Chore management and completion"),
        (name = "reports", description = "Completion reports"),
        (name = "admin", description = "Database administration")
    )
)]
pub struct ApiDoc;

/// Create the API router with OpenAPI documentation
pub fn create_router<B: QueryBackend>(state: AppState<B>) -> Router {
    let api = ApiDoc::openapi();

    let system_routes = Router::new().route("/health", get(handlers::health::<B>));

    let v1_routes = routes!(B => {
        get "/family" => v1::list_family,
        get "/chores" => v1::list_chores,
        post "/chores" => v1::create_chore,
        post "/chores/complete" => v1::complete_chore,
        get "/chores/{id}" => v1::get_chore,
        put "/chores/{id}" => v1::update_chore,
        delete "/chores/{id}" => v1::delete_chore,
        get "/reports/weekly" => v1::weekly_report,
        post "/init-db" => v1::init_db,
    });

    system_routes
        .nest("/api/v1", v1_routes)
        .merge(Scalar::with_url("/docs", api))
        .with_state(state)
}
