//! Chores API server binary.
//!
//! This binary picks and opens the concrete storage backend and passes it to
//! the API server. The API layer remains agnostic of the backend.

use std::net::IpAddr;
use std::path::PathBuf;

use chores::api::{self, ApiError, AppState, Config};
use chores::db::{BackendConfig, Database, DbError, PostgresBackend, QueryBackend, SqliteBackend};
use clap::Parser;
use miette::Diagnostic;
use thiserror::Error;
use tracing::info;

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error("Database error: {0}")]
    #[diagnostic(code(chores::binary::database))]
    Database(#[from] DbError),

    #[error("Failed to create data directory: {0}")]
    #[diagnostic(code(chores::binary::io))]
    Io(#[from] std::io::Error),

    #[error("API server error: {0}")]
    #[diagnostic(code(chores::binary::api))]
    Api(#[from] ApiError),
}

#[derive(Parser)]
#[command(name = "chores-api")]
#[command(author, version, about = "Household chore tracker API server", long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// SQLite database file path
    #[arg(long, default_value = "data/choretracker.db")]
    db: PathBuf,

    /// PostgreSQL connection string
    #[arg(long, env = "PG_CONNECTION_STRING")]
    postgres_url: Option<String>,

    /// Use PostgreSQL instead of SQLite (requires a connection string)
    #[arg(long, env = "USE_POSTGRES")]
    use_postgres: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    api::init_tracing();

    let config = Config {
        host: cli.host,
        port: cli.port,
    };

    match BackendConfig::resolve(cli.use_postgres, cli.postgres_url, cli.db) {
        BackendConfig::Sqlite { path } => {
            // Ensure parent directory exists
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(BinaryError::from)?;
            }
            info!(path = %path.display(), "Using SQLite");
            let backend = SqliteBackend::open(&path).await.map_err(BinaryError::from)?;
            serve(config, backend).await?;
        }
        BackendConfig::Postgres { url } => {
            info!("Using PostgreSQL");
            let backend = PostgresBackend::connect(&url)
                .await
                .map_err(BinaryError::from)?;
            serve(config, backend).await?;
        }
    }

    Ok(())
}

async fn serve<B: QueryBackend>(config: Config, backend: B) -> Result<(), BinaryError> {
    let db = Database::new(backend);

    // Create tables and seed before accepting requests
    db.initialize().await?;

    let state = AppState::new(db);
    let db = state.db_arc();
    let result = api::run(config, state).await;

    db.close().await;
    info!("Database connections closed");

    Ok(result?)
}
