//! Storage Layer - SQLite-backed snapshot
//!
//! A store is one SQLite file carrying an identity header
//! (`application_id`, `user_version`) and two tables:
//! - Files(path, modified, comment)
//! - Codes(code, subtype_compressed)

pub mod manager;
pub mod mapping;
pub mod schema;
pub mod session;

pub use manager::{SchemaManager, StoreHandle};
pub use mapping::{
    CodesMapping, CodesTable, FilesMapping, FilesTable, KeyCursor, PersistentMapping, Table,
    TableMapping,
};
pub use schema::{StoreIdentity, APPLICATION_ID, SCHEMA_VERSION};
pub use session::{Session, StoreStats};
