//! Store creation and identity validation

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::schema::{self, StoreIdentity};
use super::session::Session;
use crate::{Error, Result};

/// Creates stores with the fixed layout and validates existing ones.
///
/// The identity pair is threaded in at construction; `SchemaManager::default()`
/// uses the identity of this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaManager {
    identity: StoreIdentity,
}

/// A store whose identity has been checked, with no transaction open.
///
/// This is the only way to obtain a [`Session`], so no mapping operation can
/// run against an unvalidated store.
pub struct StoreHandle {
    conn: Connection,
    path: PathBuf,
}

impl SchemaManager {
    pub fn new(identity: StoreIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> StoreIdentity {
        self.identity
    }

    /// Initialize a new, empty store at `path` and close it again.
    ///
    /// Fails with `AlreadyExists` if the file there is already an initialized
    /// store (or any non-empty SQLite database). Whether to call this at all
    /// is up to the caller.
    pub fn create(&self, path: &Path) -> Result<()> {
        let mut conn = open_with(path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)?;

        if is_initialized(&conn)? {
            return Err(Error::AlreadyExists(path.to_owned()));
        }

        self.initialize(&mut conn)?;
        conn.execute_batch("PRAGMA optimize")?;
        conn.close().map_err(|(_, e)| e)?;

        debug!(
            "Created store at {} (application_id {}, version {})",
            path.display(),
            self.identity.application_id,
            self.identity.version
        );
        Ok(())
    }

    /// Open the store at `path` and check its identifier and version.
    pub fn open_and_validate(&self, path: &Path) -> Result<StoreHandle> {
        let conn = open_with(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        self.validate(&conn)?;

        debug!("Opened store at {}", path.display());
        Ok(StoreHandle {
            conn,
            path: path.to_owned(),
        })
    }

    /// Open a validated session on the store at `path`
    pub fn open_session(&self, path: &Path) -> Result<Session> {
        self.open_and_validate(path)?.into_session()
    }

    /// Create a fresh in-memory store (for testing)
    pub fn open_in_memory(&self) -> Result<StoreHandle> {
        let mut conn = Connection::open_in_memory()?;
        self.initialize(&mut conn)?;
        self.validate(&conn)?;
        Ok(StoreHandle {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Write the identity and both tables in a single transaction.
    fn initialize(&self, conn: &mut Connection) -> Result<()> {
        // journal_mode cannot change inside a transaction
        conn.execute_batch("PRAGMA journal_mode = DELETE")?;

        let tx = conn.transaction()?;
        tx.pragma_update(None, "application_id", self.identity.application_id)?;
        tx.pragma_update(None, "user_version", self.identity.version)?;
        for stmt in schema::all_schema_statements() {
            tx.execute(stmt, [])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        let found = read_identity(conn)?;

        if found.application_id != self.identity.application_id {
            return Err(Error::WrongIdentifier {
                expected: self.identity.application_id,
                found: found.application_id,
            });
        }
        if found.version != self.identity.version {
            return Err(Error::UnsupportedVersion {
                expected: self.identity.version,
                found: found.version,
            });
        }
        Ok(())
    }
}

impl StoreHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a session on this store
    pub fn into_session(self) -> Result<Session> {
        Session::begin(self.conn)
    }
}

fn open_with(path: &Path, flags: OpenFlags) -> Result<Connection> {
    Connection::open_with_flags(path, flags).map_err(|e| Error::DatabaseOpen {
        path: path.to_owned(),
        source: e,
    })
}

/// Read the identity pair from the database header
pub(crate) fn read_identity(conn: &Connection) -> Result<StoreIdentity> {
    let application_id: i32 = conn.pragma_query_value(None, "application_id", |row| row.get(0))?;
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(StoreIdentity::new(application_id, version))
}

fn is_initialized(conn: &Connection) -> Result<bool> {
    let identity = read_identity(conn)?;
    if identity.application_id != 0 || identity.version != 0 {
        return Ok(true);
    }

    let tables: i64 = conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))?;
    Ok(tables > 0)
}
