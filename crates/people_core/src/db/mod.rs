//! Storage bootstrap for the people collection.
//!
//! # Responsibility
//! - Turn the configured connection string (`PEOPLE_DB_URI`) into a
//!   `StoreLocation`: `:memory:`/`sqlite::memory:` or a file path given
//!   bare or behind `sqlite://`, `sqlite:` or `file:`.
//! - Open that location and configure pragmas the repository relies on.
//! - Bring the `people`/`person_foods` schema up to the latest migration.
//!
//! # Invariants
//! - Only SQLite locations are accepted; remote schemes fail with
//!   `DbError::InvalidUri` before any connection is attempted.
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Repositories must not touch person data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_from_uri, open_db_in_memory, StoreLocation};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while resolving, opening or migrating the store.
#[derive(Debug)]
pub enum DbError {
    /// Driver-level failure from SQLite.
    Sqlite(rusqlite::Error),
    /// Connection string is blank or names a non-SQLite location.
    InvalidUri(String),
    /// The store was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite_error",
            Self::InvalidUri(_) => "invalid_uri",
            Self::UnsupportedSchemaVersion { .. } => "unsupported_schema_version",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidUri(uri) => write!(f, "invalid database uri `{uri}`"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidUri(_) | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
