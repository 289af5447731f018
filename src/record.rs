//! Record types stored in the snapshot
//!
//! - `FileRecord`: metadata for one dataset member (the `Files` table)
//! - `CodeRecord`: the subtype for one MAC code (the `Codes` table)

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Text form of `FileRecord::modified` in the store.
///
/// ISO-8601 with a `T` separator and no zone, so values sort as text.
/// Fractional seconds are only written when non-zero.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Metadata for one member file of the fetched archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Last-modified time of the member, naive (no timezone)
    pub modified: NaiveDateTime,
    /// First line of the member file, without its newline
    pub comment: String,
}

impl FileRecord {
    pub fn new(modified: NaiveDateTime, comment: impl Into<String>) -> Self {
        Self {
            modified,
            comment: comment.into(),
        }
    }

    /// Render `modified` in the stored text form
    pub fn modified_text(&self) -> String {
        format_timestamp(&self.modified)
    }
}

/// A single MAC code's subtype.
///
/// Two records are equal when their subtypes are equal; that equality
/// drives change detection during sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeRecord {
    pub subtype: String,
}

impl CodeRecord {
    pub fn new(subtype: impl Into<String>) -> Self {
        Self {
            subtype: subtype.into(),
        }
    }
}

impl std::fmt::Display for CodeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.subtype)
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in the stored text form.
///
/// A space separator is accepted as well, since that is how SQLite's own
/// date functions render values.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| Error::InvalidTimestamp(format!("{:?}: {}", text, e)))
}
