//! Database setup: file placement, embedded migrations, the r2d2 read pool
//! and the serialized write actor.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use diesel::Connection;
use log::info;
use std::path::Path;
use std::sync::Arc;

use cointrack_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

pub mod write_actor;

pub use write_actor::{spawn_writer, WriteHandle};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DB_FILE_NAME: &str = "cointrack.db";

/// Applied to every pooled connection. `foreign_keys` must be on for the
/// address -> transactions cascade to hold.
#[derive(Debug)]
struct ConnectionCustomizer;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionCustomizer
{
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Ensures the data directory exists and returns the database file path.
pub fn init(app_data_dir: &str) -> Result<String> {
    let dir = Path::new(app_data_dir);
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Database(DatabaseError::Internal(format!(
                "Failed to create data directory {}: {}",
                app_data_dir, e
            )))
        })?;
    }
    Ok(dir.join(DB_FILE_NAME).to_string_lossy().to_string())
}

/// Runs any pending embedded migrations against the database file.
pub fn run_migrations(db_path: &str) -> Result<()> {
    let mut conn = SqliteConnection::establish(db_path).map_err(|e| {
        Error::Database(DatabaseError::Internal(format!(
            "Failed to open database {}: {}",
            db_path, e
        )))
    })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    if !applied.is_empty() {
        info!("Applied {} database migration(s)", applied.len());
    }
    Ok(())
}

pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::PoolGet(e.to_string())))?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &Arc<DbPool>) -> Result<DbConnection> {
    pool.get()
        .map_err(StorageError::from)
        .map_err(Error::from)
}
