//! Connection session: transaction boundary and teardown

use rusqlite::Connection;
use tracing::{debug, warn};

use super::mapping::{CodesMapping, FilesMapping, PersistentMapping, TableMapping};
use crate::Result;

/// The single owner of a live store connection for one run.
///
/// A transaction is always open while the session is alive; nothing the
/// mappings write is durable until [`Session::commit`].
///
/// Teardown (explicit [`Session::close`], or drop) rolls back uncommitted
/// work, then runs `PRAGMA optimize` only if something was committed during
/// the session.
pub struct Session {
    conn: Connection,
    committed: bool,
    finished: bool,
}

impl Session {
    pub(crate) fn begin(conn: Connection) -> Result<Self> {
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            committed: false,
            finished: false,
        })
    }

    /// Mapping of dataset member name -> file metadata
    pub fn files(&self) -> FilesMapping<'_> {
        self.reopen();
        TableMapping::new(&self.conn)
    }

    /// Mapping of MAC code -> subtype
    pub fn codes(&self) -> CodesMapping<'_> {
        self.reopen();
        TableMapping::new(&self.conn)
    }

    /// Durably persist all pending writes.
    ///
    /// Once `COMMIT` succeeds the call succeeds. A failure to open the next
    /// transaction is logged and retried when a mapping is next requested.
    pub fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.committed = true;
        debug!("Committed");
        self.reopen();
        Ok(())
    }

    /// Discard all writes since the last commit.
    pub fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn reopen(&self) {
        if self.finished || !self.conn.is_autocommit() {
            return;
        }
        if let Err(e) = self.conn.execute_batch("BEGIN") {
            warn!("Could not open a new transaction: {}", e);
        }
    }

    /// True once at least one commit has succeeded in this session
    pub fn has_committed(&self) -> bool {
        self.committed
    }

    /// Store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            files: self.files().count()?,
            codes: self.codes().count()?,
        })
    }

    /// Get raw connection (for advanced usage).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Roll back, optimize if anything was committed, and release the store.
    pub fn close(mut self) -> Result<()> {
        self.finish().map(|_| ())
    }

    /// Teardown; returns whether `PRAGMA optimize` ran.
    fn finish(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        self.finished = true;

        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }

        if !self.committed {
            return Ok(false);
        }
        debug!("Running PRAGMA optimize");
        self.conn.execute_batch("PRAGMA optimize")?;
        Ok(true)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Session teardown failed: {}", e);
        }
    }
}

/// Store statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub files: usize,
    pub codes: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Files: {}", self.files)?;
        write!(f, "  Codes: {}", self.codes)
    }
}
