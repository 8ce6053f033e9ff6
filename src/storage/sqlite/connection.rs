//! Connection handling shared by the `SQLite` stores.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex, recovering the inner value if a previous holder panicked.
///
/// A poisoned connection is still usable: every write runs inside its own
/// statement or transaction, so a panic mid-operation leaves nothing half
/// applied.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Applies the pragmas every store connection runs with.
///
/// - `journal_mode = WAL` so readers do not block the writer
/// - `synchronous = NORMAL`
/// - `busy_timeout = 5000` so concurrent CLI invocations wait instead of
///   failing with `SQLITE_BUSY`
///
/// In-memory databases ignore the journal mode; the pragma result is
/// discarded for that reason.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the busy timeout cannot be set.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    conn.pragma_update(None, "busy_timeout", "5000")
        .map_err(|e| Error::OperationFailed {
            operation: "configure_connection".to_string(),
            cause: e.to_string(),
        })
}

/// Opens and configures a connection to the database at `path`.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the file cannot be opened or
/// configured.
pub fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_database".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Opens a private in-memory database.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if `SQLite` cannot allocate the database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
        operation: "open_in_memory".to_string(),
        cause: e.to_string(),
    })?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Wraps a `rusqlite` error as [`Error::OperationFailed`].
pub(crate) fn op_err(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> Error {
    move |e| Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_lock_recovers_from_poison() {
        let mutex = Arc::new(Mutex::new(41));
        let poisoner = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the mutex");
        })
        .join();

        assert!(mutex.is_poisoned());
        let mut guard = acquire_lock(&mutex);
        *guard += 1;
        assert_eq!(*guard, 42);
    }

    #[test]
    fn test_open_connection_sets_busy_timeout() {
        let dir = TempDir::new().unwrap();
        let conn = open_connection(&dir.path().join("tenders.db")).unwrap();
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_open_connection_reports_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-dir").join("tenders.db");
        let err = open_connection(&missing).unwrap_err();
        assert!(err.to_string().contains("no-such-dir"));
    }
}
