//! Dictionary-like mappings over single tables
//!
//! Every operation is one bounded query against the backing table. The
//! mappings keep no state of their own, so any number of them over the same
//! connection see each other's uncommitted writes.

use std::fmt::Display;
use std::marker::PhantomData;

use rusqlite::{named_params, Connection, OptionalExtension, Row, Statement};

use crate::codec;
use crate::record::{parse_timestamp, CodeRecord, FileRecord};
use crate::{Error, Result};

/// Keys fetched per query by [`KeyCursor`]
pub const DEFAULT_PAGE_SIZE: usize = 512;

/// A persistent mapping from `K` to `V`.
///
/// Writes are not durable until the owning session commits.
pub trait PersistentMapping<K: ?Sized + ToOwned + Display, V> {
    /// Lazy sequence of all keys
    type Keys<'m>: Iterator<Item = Result<K::Owned>>
    where
        Self: 'm;

    /// Look up `key` with a single query.
    fn fetch(&self, key: &K) -> Result<Option<V>>;

    /// Insert `value` under `key`, overwriting any existing value.
    fn set(&self, key: &K, value: &V) -> Result<()>;

    /// Remove `key`. Fails with `KeyNotFound` if it is absent.
    fn delete(&self, key: &K) -> Result<()>;

    /// Check for `key` without reading its value.
    fn contains(&self, key: &K) -> Result<bool>;

    /// All current keys. Each call starts a fresh sequence.
    fn keys(&self) -> Self::Keys<'_>;

    fn count(&self) -> Result<usize>;

    /// Value for `key`, or `KeyNotFound`.
    fn get(&self, key: &K) -> Result<V> {
        self.fetch(key)?
            .ok_or_else(|| Error::KeyNotFound(key.to_string()))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }
}

/// Describes one backing table: where its keys live and how values map to
/// columns.
pub trait Table {
    type Value;

    /// Table name
    const NAME: &'static str;

    /// Primary key column
    const KEY: &'static str;

    /// Selects the value columns of one row, keyed by `?1`
    const SELECT: &'static str;

    /// Insert-or-update of one row, bound by [`Table::bind_upsert`]
    const UPSERT: &'static str;

    /// Build a value from a row returned by [`Table::SELECT`]
    fn read_value(key: &str, row: &Row<'_>) -> Result<Self::Value>;

    /// Execute [`Table::UPSERT`] for one key/value pair
    fn bind_upsert(stmt: &mut Statement<'_>, key: &str, value: &Self::Value) -> Result<()>;
}

/// `Files`: dataset member name -> file metadata, stored as plain columns
pub struct FilesTable;

impl Table for FilesTable {
    type Value = FileRecord;

    const NAME: &'static str = "Files";
    const KEY: &'static str = "path";

    const SELECT: &'static str = "SELECT modified, comment FROM Files WHERE path = ?1";

    const UPSERT: &'static str = r#"
        INSERT INTO Files (path, modified, comment)
        VALUES (:path, :modified, :comment)
        ON CONFLICT (path) DO UPDATE SET
            modified = excluded.modified,
            comment  = excluded.comment
    "#;

    fn read_value(key: &str, row: &Row<'_>) -> Result<FileRecord> {
        let modified: Option<String> = row.get(0)?;
        let modified = modified
            .ok_or_else(|| Error::InvalidTimestamp(format!("missing for file {}", key)))?;

        Ok(FileRecord {
            modified: parse_timestamp(&modified)?,
            comment: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        })
    }

    fn bind_upsert(stmt: &mut Statement<'_>, key: &str, value: &FileRecord) -> Result<()> {
        stmt.execute(named_params! {
            ":path": key,
            ":modified": value.modified_text(),
            ":comment": value.comment,
        })?;
        Ok(())
    }
}

/// `Codes`: MAC code -> subtype, stored compressed
pub struct CodesTable;

impl Table for CodesTable {
    type Value = CodeRecord;

    const NAME: &'static str = "Codes";
    const KEY: &'static str = "code";

    const SELECT: &'static str = "SELECT subtype_compressed FROM Codes WHERE code = ?1";

    const UPSERT: &'static str = r#"
        INSERT INTO Codes (code, subtype_compressed)
        VALUES (:code, :subtype_compressed)
        ON CONFLICT (code) DO UPDATE SET
            subtype_compressed = excluded.subtype_compressed
    "#;

    fn read_value(key: &str, row: &Row<'_>) -> Result<CodeRecord> {
        let blob: Option<Vec<u8>> = row.get(0)?;
        let blob = blob.ok_or_else(|| Error::CorruptPayload(format!("no subtype stored for {}", key)))?;
        Ok(CodeRecord::new(codec::decode(&blob)?))
    }

    fn bind_upsert(stmt: &mut Statement<'_>, key: &str, value: &CodeRecord) -> Result<()> {
        stmt.execute(named_params! {
            ":code": key,
            ":subtype_compressed": codec::encode(&value.subtype)?,
        })?;
        Ok(())
    }
}

/// A [`PersistentMapping`] over the table described by `T`.
pub struct TableMapping<'c, T> {
    conn: &'c Connection,
    page_size: usize,
    _table: PhantomData<fn() -> T>,
}

pub type FilesMapping<'c> = TableMapping<'c, FilesTable>;
pub type CodesMapping<'c> = TableMapping<'c, CodesTable>;

impl<'c, T: Table> TableMapping<'c, T> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            page_size: DEFAULT_PAGE_SIZE,
            _table: PhantomData,
        }
    }

    /// Number of keys [`PersistentMapping::keys`] fetches per query
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Writes are only allowed inside the session's transaction
    fn ensure_transaction(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Err(Error::NoTransaction);
        }
        Ok(())
    }
}

impl<'c, T: Table> PersistentMapping<str, T::Value> for TableMapping<'c, T> {
    type Keys<'m>
        = KeyCursor<'m, T>
    where
        Self: 'm;

    fn fetch(&self, key: &str) -> Result<Option<T::Value>> {
        let mut stmt = self.conn.prepare_cached(T::SELECT)?;
        let mut rows = stmt.query([key])?;
        let value = match rows.next()? {
            Some(row) => Some(T::read_value(key, row)?),
            None => None,
        };
        Ok(value)
    }

    fn set(&self, key: &str, value: &T::Value) -> Result<()> {
        self.ensure_transaction()?;
        let mut stmt = self.conn.prepare_cached(T::UPSERT)?;
        T::bind_upsert(&mut stmt, key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.ensure_transaction()?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", T::NAME, T::KEY);
        let removed = self.conn.prepare_cached(&sql)?.execute([key])?;
        if removed == 0 {
            return Err(Error::KeyNotFound(key.to_string()));
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1", T::NAME, T::KEY);
        let found = self
            .conn
            .prepare_cached(&sql)?
            .query_row([key], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn keys(&self) -> Self::Keys<'_> {
        KeyCursor::new(self.conn, self.page_size)
    }

    fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", T::NAME);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Lazy, keyset-paginated iteration over a table's primary keys.
///
/// Pages are fetched in key order, one bounded query each, resuming after
/// the last key seen. Rows deleted behind the cursor do not disturb it.
pub struct KeyCursor<'c, T> {
    conn: &'c Connection,
    page_size: usize,
    after: Option<String>,
    page: std::vec::IntoIter<String>,
    exhausted: bool,
    _table: PhantomData<fn() -> T>,
}

impl<'c, T: Table> KeyCursor<'c, T> {
    fn new(conn: &'c Connection, page_size: usize) -> Self {
        Self {
            conn,
            page_size,
            after: None,
            page: Vec::new().into_iter(),
            exhausted: false,
            _table: PhantomData,
        }
    }

    fn fetch_page(&self) -> Result<Vec<String>> {
        let limit = self.page_size as i64;
        let mut page = Vec::with_capacity(self.page_size);

        match &self.after {
            None => {
                let sql = format!(
                    "SELECT {key} FROM {table} ORDER BY {key} LIMIT ?1",
                    key = T::KEY,
                    table = T::NAME
                );
                let mut stmt = self.conn.prepare_cached(&sql)?;
                let mut rows = stmt.query([limit])?;
                while let Some(row) = rows.next()? {
                    page.push(row.get(0)?);
                }
            }
            Some(after) => {
                let sql = format!(
                    "SELECT {key} FROM {table} WHERE {key} > ?1 ORDER BY {key} LIMIT ?2",
                    key = T::KEY,
                    table = T::NAME
                );
                let mut stmt = self.conn.prepare_cached(&sql)?;
                let mut rows = stmt.query(rusqlite::params![after, limit])?;
                while let Some(row) = rows.next()? {
                    page.push(row.get(0)?);
                }
            }
        }

        Ok(page)
    }
}

impl<T: Table> Iterator for KeyCursor<'_, T> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(key) = self.page.next() {
            return Some(Ok(key));
        }
        if self.exhausted {
            return None;
        }

        match self.fetch_page() {
            Ok(page) => {
                if page.len() < self.page_size {
                    self.exhausted = true;
                }
                self.after = page.last().cloned();
                self.page = page.into_iter();
                self.page.next().map(Ok)
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}
