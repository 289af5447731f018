//! # Macsync - local snapshot of the NMDP MAC code list
//!
//! Keeps a versioned SQLite copy of a flat reference dataset (code ->
//! subtype) and reconciles it against a freshly fetched snapshot.
//!
//! Macsync provides:
//! - A store identity guard (application id + schema version)
//! - Dictionary-like persistent mappings over the `Files` and `Codes` tables
//! - zlib-compressed subtype payloads
//! - A session with a single transaction boundary and deferred maintenance
//! - A minimal-diff sync engine that commits exactly once per run

pub mod codec;
pub mod record;
pub mod storage;
pub mod sync;
pub mod source;
pub mod config;
pub mod ui;

use std::path::PathBuf;

// Re-exports for convenient access
pub use record::{CodeRecord, FileRecord};
pub use storage::{
    CodesMapping, FilesMapping, PersistentMapping, SchemaManager, Session, StoreHandle,
    StoreIdentity, StoreStats,
};
pub use sync::{ChangeSummary, Outcome, SyncEngine};

/// Result type alias for Macsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Macsync operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store identifier is incorrect: found {found}, expected {expected}")]
    WrongIdentifier { expected: i32, found: i32 },

    #[error("Store schema version is unsupported: found {found}, expected {expected}")]
    UnsupportedVersion { expected: i32, found: i32 },

    #[error("Store already initialized at {0}")]
    AlreadyExists(PathBuf),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Write attempted outside a transaction")]
    NoTransaction,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Failed to open store at '{path}': {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the store identity failures (wrong magic or version).
    ///
    /// These are terminal for the store: there is no migration path.
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self,
            Error::WrongIdentifier { .. } | Error::UnsupportedVersion { .. }
        )
    }
}
