//! Chore storage over SQLite or PostgreSQL.
//!
//! Every component talks to storage through the [`query`] abstraction, so the
//! same code runs against both backends.
//!
//! # Architecture
//!
//! - `error`: Error taxonomy shared by every operation
//! - `models`: Domain entities (FamilyMember, Chore, Assignee, WeeklyReport)
//! - `query`: Backend-neutral statements, rows and transactions
//! - `schema`: Table creation and family seeding
//! - `family`, `chores`, `completion`, `report`: Operations on the schema
//! - `timeframe`: Which chores a date window covers

mod chores;
mod completion;
mod error;
mod family;
mod models;
pub mod query;
mod report;
mod schema;
mod timeframe;
mod utils;

#[cfg(test)]
mod error_test;
#[cfg(test)]
mod models_test;
#[cfg(all(test, feature = "postgres-tests"))]
mod postgres_test;

use std::sync::Arc;

pub use chores::{AssigneeDiff, ChoreRepository};
pub use completion::{CompletionEngine, compute_completion};
pub use error::{DbError, DbResult, ErrorKind};
pub use family::FamilyRepository;
pub use models::*;
pub use query::{
    BackendConfig, PostgresBackend, QueryBackend, QueryClient, SqlValue, SqliteBackend,
};
pub use report::{ReportGenerator, completion_percentage};
pub use schema::{SEED_MEMBERS, initialize};
pub use timeframe::{DateWindow, Timeframe};
pub use utils::{Clock, FixedClock, SystemClock};

/// A backend plus the clock every date-dependent operation reads.
///
/// Repositories borrow from it, so they are cheap to create per call.
pub struct Database<B: QueryBackend> {
    backend: B,
    clock: Arc<dyn Clock>,
}

impl<B: QueryBackend> Database<B> {
    /// Wrap a backend using the system clock.
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: B, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create tables and seed the family. Safe to call repeatedly.
    pub async fn initialize(&self) -> DbResult<()> {
        schema::initialize(&self.backend).await
    }

    pub fn family(&self) -> FamilyRepository<'_, B> {
        FamilyRepository {
            backend: &self.backend,
        }
    }

    pub fn chores(&self) -> ChoreRepository<'_, B> {
        ChoreRepository {
            backend: &self.backend,
            clock: self.clock.as_ref(),
        }
    }

    pub fn completion(&self) -> CompletionEngine<'_, B> {
        CompletionEngine {
            backend: &self.backend,
            clock: self.clock.as_ref(),
        }
    }

    pub fn reports(&self) -> ReportGenerator<'_, B> {
        ReportGenerator {
            backend: &self.backend,
            clock: self.clock.as_ref(),
        }
    }

    /// Close the backend's pool.
    pub async fn close(&self) {
        self.backend.close().await;
    }
}
