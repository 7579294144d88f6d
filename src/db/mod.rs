use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::task;
use crate::error::{Result, QrgraphError};

/// Default busy timeout applied to every connection
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;

/// Database connection wrapper
pub struct Db {
    path: std::path::PathBuf,
    query_timeout: Duration,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
        }
    }

    /// Override the per-query busy timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Execute a closure with a database connection in a blocking task.
    ///
    /// The connection lives exactly as long as the closure: it is dropped when
    /// `f` returns, whether with a value or an error.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        let timeout = self.query_timeout;
        task::spawn_blocking(move || {
            let mut conn = open_with_pragmas(&path, timeout)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| QrgraphError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("blocking task failed: {}", e),
        )))?
    }
}

fn open_with_pragmas(path: &Path, timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(path).map_err(QrgraphError::Database)?;

    // WAL for concurrent readers; the graph engine only reads record tables
    conn.execute_batch(
        "PRAGMA journal_mode = WAL; \
         PRAGMA synchronous = NORMAL; \
         PRAGMA foreign_keys = ON; \
         PRAGMA temp_store = MEMORY; \
         PRAGMA cache_size = -65536;"
    )?;
    // Lock waits longer than this surface as SQLITE_BUSY
    conn.busy_timeout(timeout)?;

    Ok(conn)
}

pub mod migrate;
