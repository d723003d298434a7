//! Query abstraction over the supported relational backends.
//!
//! Callers write every statement once using the canonical `?` placeholder and
//! pass [`SqlValue`] parameters. Each backend renders placeholders in its own
//! syntax, stores booleans in its own representation (see [`BoolColumn`]) and
//! hides how freshly generated ids are retrieved.
//!
//! # Architecture
//!
//! - [`QueryBackend`]: pooled, auto-commit access plus [`QueryBackend::get_client`]
//! - [`QueryClient`]: one connection inside one transaction; dropping it without
//!   [`QueryClient::commit`] rolls back and releases the connection
//! - `sqlite` / `postgres`: the two implementations

mod postgres;
mod sqlite;

#[cfg(test)]
mod query_test;

use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use super::{DbError, DbResult};

pub use postgres::{PostgresBackend, PostgresClient};
pub use sqlite::{SqliteBackend, SqliteClient};

/// A backend-neutral parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        SqlValue::Date(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// How a backend physically stores a boolean column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolRepr {
    /// Native `BOOLEAN` type.
    Native,
    /// `0` / `1` integers.
    Integer,
}

/// Codec between a logical boolean and a backend's stored form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolColumn(pub bool);

impl BoolColumn {
    pub fn encode(self, repr: BoolRepr) -> SqlValue {
        match repr {
            BoolRepr::Native => SqlValue::Bool(self.0),
            BoolRepr::Integer => SqlValue::Int(i64::from(self.0)),
        }
    }

    /// Accepts any stored form either backend can produce. NULL reads as false.
    pub fn decode(value: &SqlValue) -> DbResult<Self> {
        let flag = match value {
            SqlValue::Null => false,
            SqlValue::Bool(b) => *b,
            SqlValue::Int(i) => *i != 0,
            SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" => true,
                "0" | "f" | "false" | "" => false,
                other => {
                    return Err(DbError::internal(format!(
                        "Cannot read '{}' as a boolean",
                        other
                    )));
                }
            },
            other => {
                return Err(DbError::internal(format!(
                    "Cannot read {:?} as a boolean",
                    other
                )));
            }
        };
        Ok(BoolColumn(flag))
    }
}

/// SQL flavour of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
        }
    }

    pub fn bool_repr(self) -> BoolRepr {
        match self {
            Dialect::Sqlite => BoolRepr::Integer,
            Dialect::Postgres => BoolRepr::Native,
        }
    }

    /// Rewrite canonical `?` placeholders into this dialect's syntax.
    ///
    /// Question marks inside quoted literals or identifiers are left alone.
    pub fn render(self, sql: &str) -> String {
        match self {
            Dialect::Sqlite => sql.to_string(),
            Dialect::Postgres => {
                let mut rendered = String::with_capacity(sql.len() + 8);
                let mut index = 0;
                let mut quote: Option<char> = None;
                for c in sql.chars() {
                    match (quote, c) {
                        (None, '\'' | '"') => {
                            quote = Some(c);
                            rendered.push(c);
                        }
                        (Some(q), _) if c == q => {
                            quote = None;
                            rendered.push(c);
                        }
                        (None, '?') => {
                            index += 1;
                            rendered.push('$');
                            rendered.push_str(&index.to_string());
                        }
                        _ => rendered.push(c),
                    }
                }
                rendered
            }
        }
    }

    /// Convert a logical parameter into what this dialect binds.
    pub fn encode(self, value: &SqlValue) -> SqlValue {
        match value {
            SqlValue::Bool(b) => BoolColumn(*b).encode(self.bool_repr()),
            other => other.clone(),
        }
    }
}

/// Whether a statement produces a result set rather than an affected-row count.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let head = sql.trim_start().to_ascii_uppercase();
    head.starts_with("SELECT") || head.starts_with("WITH") || head.contains(" RETURNING ")
}

/// Timestamp text format used where a backend has no native timestamp type.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single result row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    fn value(&self, column: &str) -> DbResult<&SqlValue> {
        self.get(column)
            .ok_or_else(|| DbError::internal(format!("Missing column '{}' in result", column)))
    }

    pub fn get_i64(&self, column: &str) -> DbResult<i64> {
        match self.value(column)? {
            SqlValue::Int(i) => Ok(*i),
            SqlValue::Text(s) => s.trim().parse().map_err(|_| {
                DbError::internal(format!("Column '{}' is not an integer: {}", column, s))
            }),
            other => Err(DbError::internal(format!(
                "Column '{}' is not an integer: {:?}",
                column, other
            ))),
        }
    }

    pub fn get_bool(&self, column: &str) -> DbResult<bool> {
        BoolColumn::decode(self.value(column)?).map(|b| b.0)
    }

    pub fn get_string(&self, column: &str) -> DbResult<String> {
        self.get_opt_string(column)?
            .ok_or_else(|| DbError::internal(format!("Column '{}' is NULL", column)))
    }

    pub fn get_opt_string(&self, column: &str) -> DbResult<Option<String>> {
        match self.value(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s.clone())),
            SqlValue::Int(i) => Ok(Some(i.to_string())),
            SqlValue::Bool(b) => Ok(Some(b.to_string())),
            SqlValue::Date(d) => Ok(Some(d.to_string())),
            SqlValue::Timestamp(ts) => Ok(Some(format_timestamp(ts))),
        }
    }

    pub fn get_date(&self, column: &str) -> DbResult<NaiveDate> {
        match self.value(column)? {
            SqlValue::Date(d) => Ok(*d),
            SqlValue::Timestamp(ts) => Ok(ts.date_naive()),
            SqlValue::Text(s) => s
                .get(..10)
                .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
                .ok_or_else(|| {
                    DbError::internal(format!("Column '{}' is not a date: {}", column, s))
                }),
            other => Err(DbError::internal(format!(
                "Column '{}' is not a date: {:?}",
                column, other
            ))),
        }
    }

    pub fn get_timestamp(&self, column: &str) -> DbResult<DateTime<Utc>> {
        self.get_opt_timestamp(column)?
            .ok_or_else(|| DbError::internal(format!("Column '{}' is NULL", column)))
    }

    pub fn get_opt_timestamp(&self, column: &str) -> DbResult<Option<DateTime<Utc>>> {
        match self.value(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Timestamp(ts) => Ok(Some(*ts)),
            SqlValue::Text(s) => parse_timestamp(s).map(Some).ok_or_else(|| {
                DbError::internal(format!("Column '{}' is not a timestamp: {}", column, s))
            }),
            other => Err(DbError::internal(format!(
                "Column '{}' is not a timestamp: {:?}",
                column, other
            ))),
        }
    }
}

/// Parse RFC 3339 or SQLite's `CURRENT_TIMESTAMP` format.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ts| ts.and_utc())
        })
}

/// Rows returned by a statement and the number of rows it touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: u64,
}

/// Uniform access to a relational backend.
///
/// Statements issued through the backend itself run in auto-commit mode.
/// Multi-statement sequences go through [`QueryBackend::get_client`].
pub trait QueryBackend: Send + Sync + 'static {
    type Client: QueryClient;

    fn dialect(&self) -> Dialect;

    /// Run one statement and return its rows (for queries) and row count.
    fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = DbResult<QueryResult>> + Send;

    /// Run one `INSERT` and return the generated `id`.
    fn insert(&self, sql: &str, params: &[SqlValue]) -> impl Future<Output = DbResult<i64>> + Send;

    /// Acquire a pooled connection with an open transaction.
    fn get_client(&self) -> impl Future<Output = DbResult<Self::Client>> + Send;

    /// Close the pool. Subsequent calls fail with a connection error.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// One connection inside one transaction.
pub trait QueryClient: Send {
    fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = DbResult<QueryResult>> + Send;

    fn insert(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = DbResult<i64>> + Send;

    fn commit(self) -> impl Future<Output = DbResult<()>> + Send;
}

/// Which backend the process should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Sqlite { path: PathBuf },
    Postgres { url: String },
}

impl BackendConfig {
    /// PostgreSQL is used only when it is requested and a connection string is present.
    pub fn resolve(use_postgres: bool, postgres_url: Option<String>, sqlite_path: PathBuf) -> Self {
        match postgres_url.filter(|url| !url.trim().is_empty()) {
            Some(url) if use_postgres => BackendConfig::Postgres { url },
            _ => BackendConfig::Sqlite { path: sqlite_path },
        }
    }
}
