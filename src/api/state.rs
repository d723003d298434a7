//! Application state for the API server.

use std::sync::Arc;

use crate::db::{Database, QueryBackend};

/// Shared application state.
///
/// Generic over the storage backend; handlers never see which one is in use.
pub struct AppState<B: QueryBackend> {
    db: Arc<Database<B>>,
}

// Manual Clone impl - only the Arc needs to be cloneable, not B
impl<B: QueryBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl<B: QueryBackend> AppState<B> {
    pub fn new(db: Database<B>) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database<B> {
        &self.db
    }

    /// Get a cloned Arc to the database.
    pub fn db_arc(&self) -> Arc<Database<B>> {
        Arc::clone(&self.db)
    }
}
