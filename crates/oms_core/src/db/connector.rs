//! Connection provider and scoped sessions.
//!
//! # Responsibility
//! - Hand out one `Session` per record-store operation.
//! - Guarantee release of the underlying connection on every exit path.
//!
//! # Invariants
//! - File-backed providers open a fresh, configured connection per session.
//! - In-memory providers serialise sessions over one shared connection.
//! - A `Transaction` obtained from `Session::unit_of_work` rolls back unless
//!   committed.

use super::open::{configure_connection, open_db, open_db_in_memory, recreate_schema};
use super::{DbError, DbResult};
use log::debug;
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Source of scoped sessions against the backing store.
pub trait ConnectionProvider {
    /// Acquires a session; the returned value releases itself on drop.
    fn acquire_session(&self) -> DbResult<Session<'_>>;
}

/// Scoped unit-of-work handle.
pub struct Session<'a> {
    conn: SessionConn<'a>,
    acquired_at: Instant,
}

enum SessionConn<'a> {
    Owned(Connection),
    Shared(MutexGuard<'a, Connection>),
}

impl Session<'_> {
    /// Read access for queries that do not need a transaction.
    pub fn connection(&self) -> &Connection {
        match &self.conn {
            SessionConn::Owned(conn) => conn,
            SessionConn::Shared(guard) => &**guard,
        }
    }

    /// Starts the single transaction of this session.
    pub fn unit_of_work(&mut self) -> DbResult<Transaction<'_>> {
        Ok(self.connection_mut().transaction()?)
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        match &mut self.conn {
            SessionConn::Owned(conn) => conn,
            SessionConn::Shared(guard) => &mut **guard,
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        debug!(
            "event=db_session module=db status=released held_ms={}",
            self.acquired_at.elapsed().as_millis()
        );
    }
}

/// SQLite-backed connection provider.
pub struct SqliteConnector {
    source: Source,
}

enum Source {
    File(PathBuf),
    Memory(Mutex<Connection>),
}

impl SqliteConnector {
    /// Prepares a file-backed provider, applying migrations once up front.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        open_db(&path)?;
        Ok(Self {
            source: Source::File(path),
        })
    }

    /// Prepares a provider over a private in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        Ok(Self {
            source: Source::Memory(Mutex::new(open_db_in_memory()?)),
        })
    }

    /// Drops and re-creates every OMS table.
    pub fn recreate_schema(&self) -> DbResult<()> {
        let mut session = self.acquire_session()?;
        recreate_schema(session.connection_mut())
    }
}

impl ConnectionProvider for SqliteConnector {
    fn acquire_session(&self) -> DbResult<Session<'_>> {
        let conn = match &self.source {
            Source::File(path) => {
                let conn = Connection::open(path)?;
                configure_connection(&conn)?;
                SessionConn::Owned(conn)
            }
            Source::Memory(shared) => {
                SessionConn::Shared(shared.lock().map_err(|_| DbError::PoisonedConnection)?)
            }
        };

        Ok(Session {
            conn,
            acquired_at: Instant::now(),
        })
    }
}
