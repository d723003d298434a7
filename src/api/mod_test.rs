use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use super::{AppState, Config, routes, v1};
use crate::db::{Database, DbError, SqliteBackend};

async fn test_app() -> axum::Router {
    let backend = SqliteBackend::in_memory()
        .await
        .expect("Failed to create test database");
    routes::create_router(AppState::new(Database::new(backend)))
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[test]
fn config_defaults_to_all_interfaces_on_3000() {
    let config = Config::default();
    assert_eq!(config.host.to_string(), "0.0.0.0");
    assert_eq!(config.port, 3000);
}

#[test]
fn db_errors_map_to_statuses() {
    let cases = [
        (DbError::Validation { message: "x".into() }, StatusCode::BAD_REQUEST, "validation"),
        (
            DbError::NotFound {
                entity_type: "Chore".into(),
                id: "1".into(),
            },
            StatusCode::NOT_FOUND,
            "not_found",
        ),
        (DbError::Conflict { message: "x".into() }, StatusCode::CONFLICT, "conflict"),
        (
            DbError::Connection { message: "x".into() },
            StatusCode::SERVICE_UNAVAILABLE,
            "connection",
        ),
        (
            DbError::Initialization { message: "x".into() },
            StatusCode::SERVICE_UNAVAILABLE,
            "initialization",
        ),
        (
            DbError::Internal { message: "x".into() },
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
        ),
    ];

    for (error, status, kind) in cases {
        let (actual, body) = v1::db_error(error);
        assert_eq!(actual, status);
        assert_eq!(body.kind, kind);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn health_returns_ok() {
    let app = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "sqlite");
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_unavailable_database() {
    let backend = SqliteBackend::in_memory()
        .await
        .expect("Failed to create test database");
    let state = AppState::new(Database::new(backend));
    state.db().close().await;
    let app = routes::create_router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["status"], "unavailable");
    assert_eq!(body["database"], "sqlite");
}

#[tokio::test(flavor = "multi_thread")]
async fn docs_are_served() {
    let app = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn init_db_creates_schema_and_is_repeatable() {
    let app = test_app().await;

    // Before initialization there are no tables
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/v1/family").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["kind"], "internal");

    for _ in 0..2 {
        let response = app.clone().oneshot(post("/api/v1/init-db")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Database initialized");
    }

    let response = app
        .oneshot(Request::builder().uri("/api/v1/family").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn init_db_on_closed_pool_is_unavailable() {
    let backend = SqliteBackend::in_memory().await.unwrap();
    let state = AppState::new(Database::new(backend));
    state.db().close().await;
    let app = routes::create_router(state);

    let response = app.oneshot(post("/api/v1/init-db")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["kind"], "initialization");
}
