//! Database schema definitions

/// `PRAGMA application_id` of a Macsync store: the bytes `NMDP` read as a
/// little-endian i32.
pub const APPLICATION_ID: i32 = i32::from_le_bytes(*b"NMDP");

/// `PRAGMA user_version` of the current layout. There is no migration path:
/// a store with any other version is refused.
pub const SCHEMA_VERSION: i32 = 3;

/// SQL to create the Files table (one row per dataset member)
pub const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE Files (
    path     TEXT PRIMARY KEY,
    modified TEXT,
    comment  TEXT
)
"#;

/// SQL to create the Codes table (one row per MAC code)
pub const CREATE_CODES_TABLE: &str = r#"
CREATE TABLE Codes (
    code               TEXT PRIMARY KEY,
    subtype_compressed BLOB
)
"#;

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_FILES_TABLE, CREATE_CODES_TABLE]
}

/// The (application id, schema version) pair identifying a store.
///
/// Written once at creation and checked on every open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreIdentity {
    pub application_id: i32,
    pub version: i32,
}

impl StoreIdentity {
    pub const fn new(application_id: i32, version: i32) -> Self {
        Self {
            application_id,
            version,
        }
    }

    /// The identity this build of Macsync reads and writes
    pub const fn current() -> Self {
        Self::new(APPLICATION_ID, SCHEMA_VERSION)
    }
}

impl Default for StoreIdentity {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_id_value() {
        assert_eq!(APPLICATION_ID, 1346653518);
    }

    #[test]
    fn test_default_identity_is_current() {
        let id = StoreIdentity::default();
        assert_eq!(id.application_id, APPLICATION_ID);
        assert_eq!(id.version, SCHEMA_VERSION);
    }
}
