//! Schema creation and family seeding.
//!
//! Every statement is idempotent, so initialization can run on every start.

use tracing::{info, instrument};

use super::query::{Dialect, QueryBackend, QueryClient};
use super::{DbError, DbResult};

/// Members inserted when absent, as `(name, color)`.
pub const SEED_MEMBERS: [(&str, &str); 4] = [
    ("Chip", "blue"),
    ("Catherine", "green"),
    ("Charlotte", "pink"),
    ("Celine", "purple"),
];

const SQLITE_TABLES: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS family_members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        color TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        details TEXT,
        due_date TEXT NOT NULL,
        repeat_type TEXT NOT NULL DEFAULT 'one-time'
            CHECK (repeat_type IN ('one-time', 'daily', 'weekly')),
        completed BOOLEAN NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS chore_assignments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chore_id INTEGER NOT NULL REFERENCES chores(id) ON DELETE CASCADE,
        family_member_id INTEGER NOT NULL REFERENCES family_members(id) ON DELETE CASCADE,
        completed BOOLEAN NOT NULL DEFAULT 0,
        completed_at TEXT,
        UNIQUE (chore_id, family_member_id)
    )",
];

const POSTGRES_TABLES: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS family_members (
        id SERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL UNIQUE,
        color VARCHAR(50) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chores (
        id SERIAL PRIMARY KEY,
        name VARCHAR(200) NOT NULL,
        details TEXT,
        due_date DATE NOT NULL,
        repeat_type VARCHAR(20) NOT NULL DEFAULT 'one-time'
            CHECK (repeat_type IN ('one-time', 'daily', 'weekly')),
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS chore_assignments (
        id SERIAL PRIMARY KEY,
        chore_id INTEGER NOT NULL REFERENCES chores(id) ON DELETE CASCADE,
        family_member_id INTEGER NOT NULL REFERENCES family_members(id) ON DELETE CASCADE,
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        completed_at TIMESTAMPTZ,
        UNIQUE (chore_id, family_member_id)
    )",
];

fn tables(dialect: Dialect) -> &'static [&'static str] {
    match dialect {
        Dialect::Sqlite => &SQLITE_TABLES,
        Dialect::Postgres => &POSTGRES_TABLES,
    }
}

/// Create all tables and seed the family in a single transaction.
///
/// Any failure is reported as [`DbError::Initialization`].
#[instrument(skip(backend), fields(dialect = backend.dialect().name()))]
pub async fn initialize<B: QueryBackend>(backend: &B) -> DbResult<()> {
    let seeded = create_and_seed(backend).await.map_err(|e| match e {
        DbError::Initialization { .. } => e,
        other => DbError::Initialization {
            message: other.to_string(),
        },
    })?;

    info!(seeded, "Database initialized");
    Ok(())
}

async fn create_and_seed<B: QueryBackend>(backend: &B) -> DbResult<usize> {
    let mut client = backend.get_client().await?;

    for ddl in tables(backend.dialect()) {
        client.execute(ddl, &[]).await?;
    }

    // Seed members by exact name so reruns never duplicate them
    let mut seeded = 0;
    for (name, color) in SEED_MEMBERS {
        let existing = client
            .execute("SELECT id FROM family_members WHERE name = ?", &[name.into()])
            .await?;
        if existing.rows.is_empty() {
            client
                .insert(
                    "INSERT INTO family_members (name, color) VALUES (?, ?)",
                    &[name.into(), color.into()],
                )
                .await?;
            seeded += 1;
        }
    }

    client.commit().await?;
    Ok(seeded)
}
