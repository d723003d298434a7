//! Tests for database error types.

use crate::db::{DbError, DbResult, ErrorKind};

#[test]
fn not_found_error_displays_correctly() {
    let err = DbError::NotFound {
        entity_type: "Chore".to_string(),
        id: "42".to_string(),
    };
    assert_eq!(err.to_string(), "Entity not found: Chore with id '42'");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn validation_error_displays_correctly() {
    let err = DbError::Validation {
        message: "name is required".to_string(),
    };
    assert_eq!(err.to_string(), "Validation error: name is required");
    assert_eq!(err.kind().as_str(), "validation");
}

#[test]
fn initialization_error_displays_correctly() {
    let err = DbError::Initialization {
        message: "no such table: chores".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Initialization error: no such table: chores"
    );
    assert_eq!(err.kind().to_string(), "initialization");
}

#[test]
fn every_kind_has_a_distinct_stable_name() {
    let kinds = [
        ErrorKind::Validation,
        ErrorKind::NotFound,
        ErrorKind::Conflict,
        ErrorKind::Connection,
        ErrorKind::Initialization,
        ErrorKind::Internal,
    ];
    let mut names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), kinds.len());
}

#[test]
fn pool_timeout_maps_to_connection_error() {
    let err = crate::db::error::map_sqlx_error(sqlx::Error::PoolTimedOut);
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[test]
fn row_not_found_maps_to_internal_error() {
    let err = crate::db::error::map_sqlx_error(sqlx::Error::RowNotFound);
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn db_result_type_works() {
    fn returns_ok() -> DbResult<i32> {
        Ok(42)
    }

    fn returns_err() -> DbResult<i32> {
        Err(DbError::Internal {
            message: "boom".to_string(),
        })
    }

    assert_eq!(returns_ok().unwrap(), 42);
    assert!(returns_err().is_err());
}
