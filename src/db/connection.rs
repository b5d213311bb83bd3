//! Identity store connection
//!
//! The store holds one row per linked user and sees a lookup per load, so a
//! small pool is plenty. Opening the store also brings its schema up to date.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::info;

use super::migrations::{get_schema_version, needs_migration, run_migrations};

const POOL_SIZE: u32 = 2;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Identity store unavailable: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("Identity store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot prepare identity store location: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Pooled handle to the identity store
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

fn configure(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
}

impl Database {
    /// Open (creating if needed) the store at `path` and migrate it
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(configure);

        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;
        let database = Self {
            pool: Arc::new(pool),
        };
        database.with_conn(|conn| {
            if needs_migration(conn)? {
                let from = get_schema_version(conn)?;
                run_migrations(conn)?;
                info!(from, to = get_schema_version(conn)?, "Identity store migrated");
            }
            Ok(())
        })?;
        Ok(database)
    }

    pub fn get_conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run `f` on a pooled connection
    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }
}
