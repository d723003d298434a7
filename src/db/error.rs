//! Database error types.
//!
//! Storage-backend agnostic errors for every repository and engine operation.
//! It uses miette for diagnostic output and thiserror for derive macros.

use miette::Diagnostic;
use sqlx::error::DatabaseError;
use thiserror::Error;

/// Database operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Validation error: {message}")]
    #[diagnostic(code(chores::db::validation))]
    Validation { message: String },

    #[error("Entity not found: {entity_type} with id '{id}'")]
    #[diagnostic(code(chores::db::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("Conflict: {message}")]
    #[diagnostic(code(chores::db::conflict))]
    Conflict { message: String },

    #[error("Connection error: {message}")]
    #[diagnostic(
        code(chores::db::connection),
        help("check that the database is reachable and the connection settings are correct")
    )]
    Connection { message: String },

    #[error("Initialization error: {message}")]
    #[diagnostic(code(chores::db::initialization))]
    Initialization { message: String },

    #[error("Internal database error: {message}")]
    #[diagnostic(code(chores::db::internal))]
    Internal { message: String },
}

/// Stable, machine-checkable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Connection,
    Initialization,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Connection => "connection",
            ErrorKind::Initialization => "initialization",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation { .. } => ErrorKind::Validation,
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::Conflict { .. } => ErrorKind::Conflict,
            DbError::Connection { .. } => ErrorKind::Connection,
            DbError::Initialization { .. } => ErrorKind::Initialization,
            DbError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        DbError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity_type: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        DbError::Internal {
            message: message.into(),
        }
    }
}

/// Classify a sqlx failure into the error taxonomy.
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> DbError {
    match error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => DbError::Connection {
            message: error.to_string(),
        },
        sqlx::Error::Database(db_err) if is_sqlite_lock_contention(db_err.as_ref()) => {
            DbError::Connection {
                message: db_err.message().to_string(),
            }
        }
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict {
            message: db_err.message().to_string(),
        },
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            DbError::Validation {
                message: format!("Referenced entity does not exist: {}", db_err.message()),
            }
        }
        other => DbError::Internal {
            message: other.to_string(),
        },
    }
}

/// SQLITE_BUSY (5) or SQLITE_LOCKED (6), including their extended codes.
fn is_sqlite_lock_contention(error: &dyn DatabaseError) -> bool {
    error
        .try_downcast_ref::<sqlx::sqlite::SqliteError>()
        .and_then(|e| e.code())
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
