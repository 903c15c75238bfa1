//! Database bootstrap and per-call connection handout.
//!
//! # Responsibility
//! - Open file or in-memory SQLite databases.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable handle.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Migrations run once, on the bootstrap connection.
//! - In-memory databases stay alive as long as any `Database` clone exists.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to one migrated database.
///
/// Cloning is cheap. Each service call acquires its own connection through
/// [`Database::connect`] and drops it when the call returns.
#[derive(Clone)]
pub struct Database {
    target: String,
    mode: &'static str,
    // Keeps the memdb store alive between calls. The mutex is never locked;
    // it only makes the handle `Sync`.
    anchor: Option<Arc<Mutex<Connection>>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("target", &self.target)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Database {
    /// Opens one configured connection for a single unit of work.
    pub fn connect(&self) -> DbResult<Connection> {
        let conn = Connection::open(&self.target)?;
        configure_connection(&conn)?;
        debug!("event=db_connect module=db status=ok mode={}", self.mode);
        Ok(conn)
    }

    /// Returns whether the handle points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.anchor.is_some()
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Database> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let path: PathBuf = path.as_ref().to_path_buf();
    let target = path.to_string_lossy().into_owned();
    let mut conn = Connection::open(&path).map_err(|err| {
        log_open_failure("file", started_at, "db_open_failed", &err);
        DbError::from(err)
    })?;

    bootstrap_connection(&mut conn).map_err(|err| {
        log_open_failure("file", started_at, "db_bootstrap_failed", &err);
        err
    })?;

    info!(
        "event=db_open module=db status=ok mode=file duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(Database {
        target,
        mode: "file",
        anchor: None,
    })
}

/// Opens a private in-memory database and applies all pending migrations.
///
/// Connections acquired from the returned handle share one in-memory store
/// through a uniquely named `memdb` VFS file, so lock conflicts between them
/// wait on the busy timeout like file databases do.
pub fn open_db_in_memory() -> DbResult<Database> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let target = format!("file:/lis-mem-{}?vfs=memdb", Uuid::new_v4());
    let mut conn = Connection::open(&target).map_err(|err| {
        log_open_failure("memory", started_at, "db_open_failed", &err);
        DbError::from(err)
    })?;

    bootstrap_connection(&mut conn).map_err(|err| {
        log_open_failure("memory", started_at, "db_bootstrap_failed", &err);
        err
    })?;

    info!(
        "event=db_open module=db status=ok mode=memory duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(Database {
        target,
        mode: "memory",
        anchor: Some(Arc::new(Mutex::new(conn))),
    })
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    configure_connection(conn)?;
    apply_migrations(conn)?;
    Ok(())
}

fn configure_connection(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

fn log_open_failure(mode: &str, started_at: Instant, code: &str, err: &dyn std::fmt::Display) {
    error!(
        "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
        mode,
        started_at.elapsed().as_millis(),
        code,
        err
    );
}
