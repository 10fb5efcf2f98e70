//! SQLite storage bootstrap, schema migrations and session acquisition.
//!
//! # Responsibility
//! - Open and configure SQLite connections for OMS core.
//! - Apply schema migrations in deterministic order.
//! - Hand out scoped sessions (units of work) to the record store.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - A session is released on every exit path; uncommitted work rolls back.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod connector;
pub mod migrations;
mod open;

pub use connector::{ConnectionProvider, Session, SqliteConnector};
pub use open::{open_db, open_db_in_memory, recreate_schema};
pub(crate) use open::CASEFOLD_FUNCTION;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A previous session panicked while holding the shared connection.
    PoisonedConnection,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::PoisonedConnection => write!(f, "shared connection is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::PoisonedConnection => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
