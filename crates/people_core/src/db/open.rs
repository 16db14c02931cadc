//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Map configured connection strings onto one of those two modes.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Concrete store location resolved from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// Parses a configured connection string.
    ///
    /// Accepted forms: `:memory:`, `sqlite::memory:`, `sqlite://<path>`,
    /// `sqlite:<path>`, `file:<path>` and a bare filesystem path.
    pub fn parse(uri: &str) -> DbResult<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(DbError::InvalidUri(uri.to_string()));
        }

        if matches!(trimmed, ":memory:" | "sqlite::memory:" | "sqlite://:memory:") {
            return Ok(Self::Memory);
        }

        let path = ["sqlite://", "sqlite:", "file:"]
            .iter()
            .find_map(|scheme| trimmed.strip_prefix(scheme))
            .unwrap_or(trimmed);
        // Query parameters (`?mode=rwc`) are not forwarded to SQLite.
        let path = path.split('?').next().unwrap_or_default();

        if path.is_empty() {
            return Err(DbError::InvalidUri(uri.to_string()));
        }
        if path.contains("://") {
            return Err(DbError::InvalidUri(uri.to_string()));
        }

        Ok(Self::File(PathBuf::from(path)))
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

/// Opens the store named by a configured connection string.
pub fn open_db_from_uri(uri: &str) -> DbResult<Connection> {
    match StoreLocation::parse(uri) {
        Ok(StoreLocation::Memory) => open_db_in_memory(),
        Ok(StoreLocation::File(path)) => open_db(path),
        Err(err) => {
            error!(
                "event=db_open module=db status=error error_code={}",
                err.code()
            );
            Err(err)
        }
    }
}

fn open_with<F>(mode: &str, open: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                err.code(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::StoreLocation;
    use crate::db::DbError;
    use std::path::PathBuf;

    #[test]
    fn parse_recognizes_memory_forms() {
        for uri in [":memory:", "sqlite::memory:", " sqlite://:memory: "] {
            assert_eq!(StoreLocation::parse(uri).unwrap(), StoreLocation::Memory);
        }
    }

    #[test]
    fn parse_strips_scheme_and_query() {
        assert_eq!(
            StoreLocation::parse("sqlite:///var/lib/people.db?mode=rwc").unwrap(),
            StoreLocation::File(PathBuf::from("/var/lib/people.db"))
        );
        assert_eq!(
            StoreLocation::parse("people.sqlite3").unwrap(),
            StoreLocation::File(PathBuf::from("people.sqlite3"))
        );
    }

    #[test]
    fn invalid_uri_has_stable_error_code() {
        let err = StoreLocation::parse("postgres://localhost/people").unwrap_err();
        assert_eq!(err.code(), "invalid_uri");
    }

    #[test]
    fn parse_rejects_foreign_schemes_and_blank_values() {
        assert!(matches!(
            StoreLocation::parse("mongodb://localhost:27017/people"),
            Err(DbError::InvalidUri(_))
        ));
        assert!(matches!(
            StoreLocation::parse("  "),
            Err(DbError::InvalidUri(_))
        ));
    }
}
