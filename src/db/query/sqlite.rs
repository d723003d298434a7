//! SQLite implementation of the query abstraction.
//!
//! Booleans are stored as `0`/`1` and generated ids come from
//! `last_insert_rowid()`. Client transactions start with `BEGIN IMMEDIATE`
//! and hold the write lock from their first statement.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row as _, Transaction, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::{
    BoolColumn, Dialect, QueryBackend, QueryClient, QueryResult, Row, SqlValue, format_timestamp,
    returns_rows,
};
use crate::db::error::map_sqlx_error;
use crate::db::{DbError, DbResult};

const DIALECT: Dialect = Dialect::Sqlite;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLx-backed SQLite pool.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Open (creating if needed) a database file.
    pub async fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        info!(path = %path.display(), "Opened SQLite database");
        Ok(Self { pool })
    }

    /// Create an in-memory database (useful for testing).
    ///
    /// The pool holds exactly one connection that never expires, since every
    /// in-memory connection is its own database.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl QueryBackend for SqliteBackend {
    type Client = SqliteClient;

    fn dialect(&self) -> Dialect {
        DIALECT
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<QueryResult> {
        run(&self.pool, sql, params).await
    }

    async fn insert(&self, sql: &str, params: &[SqlValue]) -> DbResult<i64> {
        run_insert(&self.pool, sql, params).await
    }

    async fn get_client(&self) -> DbResult<SqliteClient> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(map_sqlx_error)?;
        Ok(SqliteClient { tx })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// A pooled SQLite connection inside a transaction.
///
/// Dropping it uncommitted rolls back and hands the connection back to the pool.
pub struct SqliteClient {
    tx: Transaction<'static, Sqlite>,
}

impl QueryClient for SqliteClient {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<QueryResult> {
        run(&mut *self.tx, sql, params).await
    }

    async fn insert(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<i64> {
        run_insert(&mut *self.tx, sql, params).await
    }

    async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}

fn bind_all<'q>(sql: &'q str, params: &[SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match DIALECT.encode(param) {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Date(d) => query.bind(d.format("%Y-%m-%d").to_string()),
            SqlValue::Timestamp(ts) => query.bind(format_timestamp(&ts)),
        };
    }
    query
}

async fn run<'e, E>(executor: E, sql: &str, params: &[SqlValue]) -> DbResult<QueryResult>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rendered = DIALECT.render(sql);
    debug!(dialect = DIALECT.name(), sql = %rendered, params = params.len(), "execute");

    let query = bind_all(&rendered, params);
    if returns_rows(&rendered) {
        let rows = query.fetch_all(executor).await.map_err(map_sqlx_error)?;
        let rows = rows.iter().map(decode_row).collect::<DbResult<Vec<_>>>()?;
        Ok(QueryResult {
            row_count: rows.len() as u64,
            rows,
        })
    } else {
        let done = query.execute(executor).await.map_err(map_sqlx_error)?;
        Ok(QueryResult {
            rows: Vec::new(),
            row_count: done.rows_affected(),
        })
    }
}

async fn run_insert<'e, E>(executor: E, sql: &str, params: &[SqlValue]) -> DbResult<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rendered = DIALECT.render(sql);
    debug!(dialect = DIALECT.name(), sql = %rendered, params = params.len(), "insert");

    let done = bind_all(&rendered, params)
        .execute(executor)
        .await
        .map_err(map_sqlx_error)?;
    Ok(done.last_insert_rowid())
}

/// Convert a SQLite row into a backend-neutral row.
///
/// Columns declared `BOOLEAN` come back as [`SqlValue::Bool`], never as raw integers.
fn decode_row(row: &SqliteRow) -> DbResult<Row> {
    let mut columns = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let declared_bool = column.type_info().name().eq_ignore_ascii_case("BOOLEAN");
        let raw = row.try_get_raw(index).map_err(map_sqlx_error)?;

        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let storage = raw.type_info().name().to_ascii_uppercase();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => {
                    let int: i64 = row.try_get_unchecked(index).map_err(map_sqlx_error)?;
                    if declared_bool {
                        SqlValue::Bool(BoolColumn::decode(&SqlValue::Int(int))?.0)
                    } else {
                        SqlValue::Int(int)
                    }
                }
                "REAL" => {
                    let real: f64 = row.try_get_unchecked(index).map_err(map_sqlx_error)?;
                    SqlValue::Text(real.to_string())
                }
                "BLOB" => {
                    return Err(DbError::internal(format!(
                        "Unsupported BLOB value in column '{}'",
                        column.name()
                    )));
                }
                _ => {
                    let text: String = row.try_get_unchecked(index).map_err(map_sqlx_error)?;
                    if declared_bool {
                        SqlValue::Bool(BoolColumn::decode(&SqlValue::Text(text))?.0)
                    } else {
                        SqlValue::Text(text)
                    }
                }
            }
        };

        columns.push((column.name().to_string(), value));
    }

    Ok(Row::new(columns))
}
