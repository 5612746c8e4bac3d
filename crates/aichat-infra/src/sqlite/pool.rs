//! Split reader/writer SQLite pools over one WAL-mode database file.
//!
//! Reads fan out over several read-only connections; every write goes
//! through a single connection. The single writer is what makes the task
//! status compare-and-set race-free.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "aichat.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DatabasePool {
    /// Read-only connections for SELECTs.
    pub reader: SqlitePool,
    /// The one connection allowed to write.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open the database file at `path`, creating it and applying pending
    /// migrations first.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        sqlx::migrate!("../../migrations").run(&writer).await?;

        // Read-only connections cannot create the file, so open them last.
        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        tracing::debug!(path = %path.display(), "database opened");
        Ok(Self { reader, writer })
    }
}

/// Location of the database inside `data_dir`.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Pool over a fresh database in a temporary directory.
#[cfg(test)]
pub(crate) async fn test_pool() -> DatabasePool {
    let dir = tempfile::tempdir().unwrap();
    let path = database_path(dir.path());
    // Keep the directory alive for the duration of the test process.
    std::mem::forget(dir);
    DatabasePool::open(&path).await.unwrap()
}
