//! PostgreSQL implementation of the query abstraction.
//!
//! Placeholders are rendered as `$1..$n`, booleans are native and generated
//! ids are read back through a `RETURNING id` clause.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row as _, Transaction, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::{Dialect, QueryBackend, QueryClient, QueryResult, Row, SqlValue, returns_rows};
use crate::db::error::map_sqlx_error;
use crate::db::{DbError, DbResult};

const DIALECT: Dialect = Dialect::Postgres;

/// SQLx-backed PostgreSQL pool.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Connect using a `postgres://` connection string.
    ///
    /// TLS is negotiated according to the `sslmode` in the connection string.
    pub async fn connect(url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        info!("Connected to PostgreSQL database");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl QueryBackend for PostgresBackend {
    type Client = PostgresClient;

    fn dialect(&self) -> Dialect {
        DIALECT
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<QueryResult> {
        run(&self.pool, sql, params).await
    }

    async fn insert(&self, sql: &str, params: &[SqlValue]) -> DbResult<i64> {
        run_insert(&self.pool, sql, params).await
    }

    async fn get_client(&self) -> DbResult<PostgresClient> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(PostgresClient { tx })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// A pooled PostgreSQL connection inside a transaction.
///
/// Dropping it uncommitted rolls back and hands the connection back to the pool.
pub struct PostgresClient {
    tx: Transaction<'static, Postgres>,
}

impl QueryClient for PostgresClient {
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

fn bind_all<'q>(sql: &'q str, params: &[SqlValue]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match DIALECT.encode(param) {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Date(d) => query.bind(d),
            SqlValue::Timestamp(ts) => query.bind(ts),
        };
    }
    query
}

async fn run<'e, E>(executor: E, sql: &str, params: &[SqlValue]) -> DbResult<QueryResult>
where
    E: sqlx::Executor<'e, Database = Postgres>,
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
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let statement = format!("{} RETURNING id", sql.trim_end().trim_end_matches(';'));
    let result = run(executor, &statement, params).await?;
    result
        .rows
        .first()
        .ok_or_else(|| DbError::internal("INSERT ... RETURNING id produced no row"))?
        .get_i64("id")
}

/// Convert a PostgreSQL row into a backend-neutral row.
fn decode_row(row: &PgRow) -> DbResult<Row> {
    let mut columns = Vec::with_capacity(row.columns().len());

    for column in row.columns() {
        let index = column.ordinal();
        let is_null = row.try_get_raw(index).map_err(map_sqlx_error)?.is_null();

        let value = if is_null {
            SqlValue::Null
        } else {
            match column.type_info().name() {
                "BOOL" => SqlValue::Bool(row.try_get::<bool, _>(index).map_err(map_sqlx_error)?),
                "INT2" => SqlValue::Int(row.try_get::<i16, _>(index).map_err(map_sqlx_error)?.into()),
                "INT4" => SqlValue::Int(row.try_get::<i32, _>(index).map_err(map_sqlx_error)?.into()),
                "INT8" => SqlValue::Int(row.try_get::<i64, _>(index).map_err(map_sqlx_error)?),
                "DATE" => SqlValue::Date(
                    row.try_get::<NaiveDate, _>(index)
                        .map_err(map_sqlx_error)?,
                ),
                "TIMESTAMPTZ" => SqlValue::Timestamp(
                    row.try_get::<DateTime<Utc>, _>(index)
                        .map_err(map_sqlx_error)?,
                ),
                "TIMESTAMP" => SqlValue::Timestamp(
                    row.try_get::<NaiveDateTime, _>(index)
                        .map_err(map_sqlx_error)?
                        .and_utc(),
                ),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
                    SqlValue::Text(row.try_get::<String, _>(index).map_err(map_sqlx_error)?)
                }
                other => {
                    return Err(DbError::internal(format!(
                        "Unsupported column type {} for '{}'",
                        other,
                        column.name()
                    )));
                }
            }
        };

        columns.push((column.name().to_string(), value));
    }

    Ok(Row::new(columns))
}
