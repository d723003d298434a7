//! Tests for the query abstraction and the SQLite backend.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use super::{
    BackendConfig, BoolColumn, BoolRepr, Dialect, QueryBackend, QueryClient, Row, SqlValue,
    SqliteBackend, returns_rows,
};
use crate::db::ErrorKind;
use crate::db::error::map_sqlx_error;

// =============================================================================
// Placeholder rendering
// =============================================================================

#[test]
fn sqlite_keeps_ordinal_placeholders() {
    let sql = "SELECT * FROM chores WHERE id = ? AND name = ?";
    assert_eq!(Dialect::Sqlite.render(sql), sql);
}

#[test]
fn postgres_numbers_placeholders_sequentially() {
    assert_eq!(
        Dialect::Postgres.render("UPDATE chores SET name = ?, details = ? WHERE id = ?"),
        "UPDATE chores SET name = $1, details = $2 WHERE id = $3"
    );
}

#[test]
fn postgres_leaves_quoted_question_marks_alone() {
    assert_eq!(
        Dialect::Postgres.render("SELECT '?' AS q, \"odd?col\" FROM t WHERE a = ? AND b = 'x?y'"),
        "SELECT '?' AS q, \"odd?col\" FROM t WHERE a = $1 AND b = 'x?y'"
    );
}

#[test]
fn postgres_handles_escaped_quotes() {
    assert_eq!(
        Dialect::Postgres.render("SELECT 'it''s?' WHERE a = ?"),
        "SELECT 'it''s?' WHERE a = $1"
    );
}

// =============================================================================
// Boolean codec
// =============================================================================

#[test]
fn bool_encodes_per_backend() {
    assert_eq!(BoolColumn(true).encode(BoolRepr::Native), SqlValue::Bool(true));
    assert_eq!(BoolColumn(true).encode(BoolRepr::Integer), SqlValue::Int(1));
    assert_eq!(BoolColumn(false).encode(BoolRepr::Integer), SqlValue::Int(0));
    assert_eq!(Dialect::Sqlite.encode(&SqlValue::Bool(true)), SqlValue::Int(1));
    assert_eq!(
        Dialect::Postgres.encode(&SqlValue::Bool(false)),
        SqlValue::Bool(false)
    );
}

#[test]
fn bool_decodes_every_stored_form() {
    let truthy = [
        SqlValue::Bool(true),
        SqlValue::Int(1),
        SqlValue::Int(7),
        SqlValue::Text("1".into()),
        SqlValue::Text("true".into()),
        SqlValue::Text("t".into()),
    ];
    for value in truthy {
        assert!(BoolColumn::decode(&value).unwrap().0, "{:?}", value);
    }

    let falsy = [
        SqlValue::Null,
        SqlValue::Bool(false),
        SqlValue::Int(0),
        SqlValue::Text("0".into()),
        SqlValue::Text("false".into()),
    ];
    for value in falsy {
        assert!(!BoolColumn::decode(&value).unwrap().0, "{:?}", value);
    }
}

#[test]
fn bool_decode_rejects_garbage() {
    let err = BoolColumn::decode(&SqlValue::Text("maybe".into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

// =============================================================================
// Row accessors
// =============================================================================

#[test]
fn row_accessors_coerce_stored_values() {
    let row = Row::new(vec![
        ("id".into(), SqlValue::Int(3)),
        ("completed".into(), SqlValue::Int(1)),
        ("due_date".into(), SqlValue::Text("2025-06-01".into())),
        ("created_at".into(), SqlValue::Text("2025-06-01 08:30:00".into())),
        ("completed_at".into(), SqlValue::Text("2025-06-02T10:00:00.000Z".into())),
        ("details".into(), SqlValue::Null),
    ]);

    assert_eq!(row.get_i64("id").unwrap(), 3);
    assert!(row.get_bool("completed").unwrap());
    assert_eq!(
        row.get_date("due_date").unwrap(),
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    );
    assert_eq!(
        row.get_timestamp("created_at").unwrap().to_rfc3339(),
        "2025-06-01T08:30:00+00:00"
    );
    assert!(row.get_opt_timestamp("completed_at").unwrap().is_some());
    assert_eq!(row.get_opt_string("details").unwrap(), None);
    assert!(row.get_string("details").is_err());
}

#[test]
fn row_missing_column_is_internal_error() {
    let row = Row::default();
    let err = row.get_i64("id").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn statement_kind_detection() {
    assert!(returns_rows("  select 1"));
    assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
    assert!(returns_rows("INSERT INTO t (a) VALUES ($1) RETURNING id"));
    assert!(!returns_rows("UPDATE chores SET completed = ? WHERE id = ?"));
    assert!(!returns_rows("DELETE FROM chores WHERE id = ?"));
}

// =============================================================================
// Backend selection
// =============================================================================

#[test]
fn postgres_requires_flag_and_url() {
    let path = PathBuf::from("data/choretracker.db");

    assert_eq!(
        BackendConfig::resolve(true, Some("postgres://localhost/chores".into()), path.clone()),
        BackendConfig::Postgres {
            url: "postgres://localhost/chores".into()
        }
    );
    assert_eq!(
        BackendConfig::resolve(false, Some("postgres://localhost/chores".into()), path.clone()),
        BackendConfig::Sqlite { path: path.clone() }
    );
    assert_eq!(
        BackendConfig::resolve(true, None, path.clone()),
        BackendConfig::Sqlite { path: path.clone() }
    );
    assert_eq!(
        BackendConfig::resolve(true, Some("  ".into()), path.clone()),
        BackendConfig::Sqlite { path }
    );
}

// =============================================================================
// SQLite backend
// =============================================================================

async fn scratch_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory()
        .await
        .expect("Failed to create in-memory database");
    backend
        .execute(
            "CREATE TABLE flags (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL, on_off BOOLEAN NOT NULL DEFAULT 0)",
            &[],
        )
        .await
        .expect("Create table should succeed");
    backend
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_returns_generated_ids() {
    let backend = scratch_backend().await;

    let first = backend
        .insert("INSERT INTO flags (label) VALUES (?)", &["a".into()])
        .await
        .expect("Insert should succeed");
    let second = backend
        .insert("INSERT INTO flags (label) VALUES (?)", &["b".into()])
        .await
        .expect("Insert should succeed");

    assert_eq!(first, 1);
    assert_eq!(second, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn booleans_read_back_as_logical_values() {
    let backend = scratch_backend().await;
    backend
        .insert(
            "INSERT INTO flags (label, on_off) VALUES (?, ?)",
            &["lamp".into(), SqlValue::Bool(true)],
        )
        .await
        .unwrap();

    let result = backend
        .execute("SELECT on_off FROM flags WHERE label = ?", &["lamp".into()])
        .await
        .unwrap();

    assert_eq!(result.row_count, 1);
    assert!(result.rows[0].get_bool("on_off").unwrap());

    // Stored as an integer underneath.
    let raw: i64 = sqlx::query_scalar("SELECT on_off FROM flags WHERE label = 'lamp'")
        .fetch_one(backend.pool())
        .await
        .unwrap();
    assert_eq!(raw, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn execute_reports_affected_rows() {
    let backend = scratch_backend().await;
    for label in ["a", "b", "c"] {
        backend
            .insert("INSERT INTO flags (label) VALUES (?)", &[label.into()])
            .await
            .unwrap();
    }

    let result = backend
        .execute("UPDATE flags SET on_off = ? WHERE label != ?", &[true.into(), "a".into()])
        .await
        .unwrap();

    assert_eq!(result.row_count, 2);
    assert!(result.rows.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn committed_client_writes_are_visible() {
    let backend = scratch_backend().await;

    let mut client = backend.get_client().await.unwrap();
    client
        .insert("INSERT INTO flags (label) VALUES (?)", &["kept".into()])
        .await
        .unwrap();
    client.commit().await.unwrap();

    let result = backend.execute("SELECT id FROM flags", &[]).await.unwrap();
    assert_eq!(result.row_count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn dropped_client_rolls_back_and_releases_connection() {
    let backend = scratch_backend().await;

    {
        let mut client = backend.get_client().await.unwrap();
        client
            .insert("INSERT INTO flags (label) VALUES (?)", &["lost".into()])
            .await
            .unwrap();
        // dropped without commit
    }

    // The single pooled connection must be usable again.
    let result = backend.execute("SELECT id FROM flags", &[]).await.unwrap();
    assert_eq!(result.row_count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_statement_leaves_client_droppable() {
    let backend = scratch_backend().await;

    let outcome = async {
        let mut client = backend.get_client().await?;
        client
            .insert("INSERT INTO flags (label) VALUES (?)", &["partial".into()])
            .await?;
        client.execute("SELECT * FROM missing_table", &[]).await?;
        client.commit().await
    }
    .await;

    assert_eq!(outcome.unwrap_err().kind(), ErrorKind::Internal);
    let result = backend.execute("SELECT id FROM flags", &[]).await.unwrap();
    assert_eq!(result.row_count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_backend_reports_connection_error() {
    let backend = scratch_backend().await;
    backend.close().await;

    let err = backend.execute("SELECT 1", &[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test(flavor = "multi_thread")]
async fn file_backed_database_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chores.db");

    {
        let backend = SqliteBackend::open(&path).await.unwrap();
        backend
            .execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", &[])
            .await
            .unwrap();
        backend
            .insert("INSERT INTO notes (body) VALUES (?)", &["hello".into()])
            .await
            .unwrap();
        backend.close().await;
    }

    let backend = SqliteBackend::open(&path).await.unwrap();
    let result = backend.execute("SELECT body FROM notes", &[]).await.unwrap();
    assert_eq!(result.rows[0].get_string("body").unwrap(), "hello");
}

#[tokio::test(flavor = "multi_thread")]
async fn client_takes_the_write_lock_on_begin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chores.db");
    let backend = SqliteBackend::open(&path).await.unwrap();

    // No statement has run yet, but the lock is already held
    let writer = backend.get_client().await.unwrap();

    let impatient = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(&path)
            .busy_timeout(Duration::ZERO),
    )
    .await
    .unwrap();
    let err = sqlx::query("BEGIN IMMEDIATE")
        .execute(&impatient)
        .await
        .unwrap_err();
    assert_eq!(map_sqlx_error(err).kind(), ErrorKind::Connection);

    drop(writer);
    impatient.close().await;
}
