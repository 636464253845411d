//! SQLite storage implementation

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::schema::{self, Tables};
use crate::mimetype;
use crate::{Error, Result};

/// SQLite-backed file cache with an interned mimetype dictionary
pub struct FileCache {
    conn: Connection,
    tables: Tables,
    /// mimetype string -> dictionary id, filled lazily or by `load_mimetypes`
    mimetype_ids: RefCell<HashMap<String, i64>>,
}

/// Attributes written by `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryData {
    pub mimetype: String,
    pub size: i64,
    pub mtime: i64,
}

impl EntryData {
    pub fn new(mimetype: impl Into<String>) -> Self {
        Self {
            mimetype: mimetype.into(),
            size: 0,
            mtime: 0,
        }
    }
}

/// A file cache row with its dictionary ids resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub fileid: i64,
    pub path: String,
    pub name: String,
    pub mimetype: String,
    pub mimepart: String,
    pub size: i64,
    pub mtime: i64,
}

impl FileCache {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, prefix)
    }

    /// Open an in-memory database with the default prefix (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, schema::DEFAULT_TABLE_PREFIX)
    }

    fn with_connection(conn: Connection, prefix: &str) -> Result<Self> {
        if !schema::is_valid_prefix(prefix) {
            return Err(Error::InvalidPrefix(prefix.to_string()));
        }
        let store = Self {
            conn,
            tables: Tables::with_prefix(prefix),
            mimetype_ids: RefCell::new(HashMap::new()),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in self.tables.all_schema_statements() {
            self.conn.execute(&stmt, [])?;
        }
        Ok(())
    }

    // ========== Mimetype Dictionary ==========

    /// Reload the in-process id cache from the dictionary table
    pub fn load_mimetypes(&self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, mimetype FROM {}", self.tables.mimetypes))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        *self.mimetype_ids.borrow_mut() = rows;
        Ok(())
    }

    /// Drop the in-process id cache; the next lookups go to the database
    pub fn clear_cached_mimetypes(&self) {
        self.mimetype_ids.borrow_mut().clear();
    }

    /// Look up the dictionary id of a mimetype string
    pub fn mimetype_id(&self, mimetype: &str) -> Result<Option<i64>> {
        if let Some(id) = self.mimetype_ids.borrow().get(mimetype) {
            return Ok(Some(*id));
        }
        let id: Option<i64> = self
            .conn
            .query_row(
                &format!("SELECT id FROM {} WHERE mimetype = ?1", self.tables.mimetypes),
                [mimetype],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = id {
            self.mimetype_ids.borrow_mut().insert(mimetype.to_string(), id);
        }
        Ok(id)
    }

    /// Return the id of a mimetype, inserting it into the dictionary if needed
    pub fn get_or_insert_mimetype(&self, mimetype: &str) -> Result<i64> {
        if let Some(id) = self.mimetype_id(mimetype)? {
            return Ok(id);
        }
        self.conn.execute(
            &format!("INSERT INTO {} (mimetype) VALUES (?1)", self.tables.mimetypes),
            [mimetype],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!("Interned mimetype {} as {}", mimetype, id);
        self.mimetype_ids.borrow_mut().insert(mimetype.to_string(), id);
        Ok(id)
    }

    /// Resolve a dictionary id back to its string
    pub fn mimetype_by_id(&self, id: i64) -> Result<Option<String>> {
        self.conn
            .query_row(
                &format!("SELECT mimetype FROM {} WHERE id = ?1", self.tables.mimetypes),
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All dictionary entries ordered by id
    pub fn list_mimetypes(&self) -> Result<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, mimetype FROM {} ORDER BY id",
            self.tables.mimetypes
        ))?;
        let entries = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Delete a dictionary entry unless some file still references it as
    /// mimetype or mimepart. Returns whether a row was deleted.
    pub fn delete_mimetype_if_unused(&self, id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            &format!(
                "DELETE FROM {m} WHERE id = ?1 AND NOT EXISTS \
                 (SELECT 1 FROM {f} WHERE mimetype = ?1 OR mimepart = ?1)",
                m = self.tables.mimetypes,
                f = self.tables.filecache,
            ),
            [id],
        )?;
        if deleted > 0 {
            self.mimetype_ids.borrow_mut().retain(|_, cached| *cached != id);
        }
        Ok(deleted > 0)
    }

    /// Count dictionary entries
    pub fn count_mimetypes(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.tables.mimetypes),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========== File Cache ==========

    /// Insert or update the entry at `path`. Interns the mimetype and its
    /// mimepart. Returns the file id.
    pub fn put(&self, path: &str, data: &EntryData) -> Result<i64> {
        let mimetype_id = self.get_or_insert_mimetype(&data.mimetype)?;
        let mimepart_id = self.get_or_insert_mimetype(mimetype::mimepart(&data.mimetype))?;

        self.conn.execute(
            &format!(
                r#"
                INSERT INTO {} (path, name, mimetype, mimepart, size, mtime)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (path) DO UPDATE SET
                    mimetype = excluded.mimetype,
                    mimepart = excluded.mimepart,
                    size = excluded.size,
                    mtime = excluded.mtime
                "#,
                self.tables.filecache
            ),
            params![
                path,
                mimetype::file_name(path),
                mimetype_id,
                mimepart_id,
                data.size,
                data.mtime,
            ],
        )?;

        let fileid = self.conn.query_row(
            &format!("SELECT fileid FROM {} WHERE path = ?1", self.tables.filecache),
            [path],
            |row| row.get(0),
        )?;
        Ok(fileid)
    }

    fn select_entries(&self) -> String {
        format!(
            "SELECT f.fileid, f.path, f.name, m.mimetype, p.mimetype, f.size, f.mtime \
             FROM {f} f \
             JOIN {m} m ON m.id = f.mimetype \
             JOIN {m} p ON p.id = f.mimepart",
            f = self.tables.filecache,
            m = self.tables.mimetypes,
        )
    }

    /// Get the entry at `path`
    pub fn get(&self, path: &str) -> Result<Option<CacheEntry>> {
        self.conn
            .query_row(
                &format!("{} WHERE f.path = ?1", self.select_entries()),
                [path],
                Self::row_to_entry,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All entries whose name ends in `.{extension}` (case-insensitive)
    pub fn find_by_extension(&self, extension: &str) -> Result<Vec<CacheEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE f.name LIKE ?1 ORDER BY f.fileid",
            self.select_entries()
        ))?;
        let pattern = format!("%.{}", extension);
        let entries = stmt
            .query_map([pattern], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // LIKE treats `_` as a wildcard; re-check the real extension
        Ok(entries
            .into_iter()
            .filter(|e| mimetype::has_extension(&e.name, extension))
            .collect())
    }

    /// Every entry in the cache
    pub fn all_entries(&self) -> Result<Vec<CacheEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY f.fileid", self.select_entries()))?;
        let entries = stmt
            .query_map([], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Point an entry at a different mimetype, interning it if needed
    pub fn update_mimetype(&self, fileid: i64, mimetype: &str) -> Result<()> {
        let mimetype_id = self.get_or_insert_mimetype(mimetype)?;
        let mimepart_id = self.get_or_insert_mimetype(mimetype::mimepart(mimetype))?;
        let updated = self.conn.execute(
            &format!(
                "UPDATE {} SET mimetype = ?1, mimepart = ?2 WHERE fileid = ?3",
                self.tables.filecache
            ),
            params![mimetype_id, mimepart_id, fileid],
        )?;
        if updated == 0 {
            return Err(Error::EntryNotFound(format!("fileid {}", fileid)));
        }
        Ok(())
    }

    /// Reference counts per dictionary id, from one scan of the cache.
    /// A file counts once for its mimetype and once for its mimepart.
    pub fn mimetype_references(&self) -> Result<HashMap<i64, usize>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT mimetype, mimepart FROM {}",
            self.tables.filecache
        ))?;
        let mut rows = stmt.query([])?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next()? {
            let mimetype: i64 = row.get(0)?;
            let mimepart: i64 = row.get(1)?;
            *counts.entry(mimetype).or_insert(0) += 1;
            *counts.entry(mimepart).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Remove the entry at `path`
    pub fn remove(&self, path: &str) -> Result<bool> {
        let removed = self.conn.execute(
            &format!("DELETE FROM {} WHERE path = ?1", self.tables.filecache),
            [path],
        )?;
        Ok(removed > 0)
    }

    /// Delete every file entry. The dictionary is left alone.
    pub fn clear(&self) -> Result<()> {
        self.conn
            .execute(&format!("DELETE FROM {}", self.tables.filecache), [])?;
        Ok(())
    }

    /// Count file entries
    pub fn count_files(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.tables.filecache),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Helper to convert a row to a CacheEntry
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<CacheEntry> {
        Ok(CacheEntry {
            fileid: row.get(0)?,
            path: row.get(1)?,
            name: row.get(2)?,
            mimetype: row.get(3)?,
            mimepart: row.get(4)?,
            size: row.get(5)?,
            mtime: row.get(6)?,
        })
    }

    // ========== Bulk Operations ==========

    /// Begin a transaction for bulk operations
    pub fn begin_transaction(&self) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction. The id cache may hold ids created inside the
    /// transaction, so it is dropped too.
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute("ROLLBACK", [])?;
        self.clear_cached_mimetypes();
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            files: self.count_files()?,
            mimetypes: self.count_mimetypes()?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub files: usize,
    pub mimetypes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        writeln!(f, "  Files: {}", self.files)?;
        write!(f, "  Mimetypes: {}", self.mimetypes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let cache = FileCache::open_in_memory().unwrap();

        let id = cache.put("files/test.docx", &EntryData::new("application/msword")).unwrap();

        let entry = cache.get("files/test.docx").unwrap().unwrap();
        assert_eq!(entry.fileid, id);
        assert_eq!(entry.name, "test.docx");
        assert_eq!(entry.mimetype, "application/msword");
        assert_eq!(entry.mimepart, "application");
        assert!(cache.get("files/missing.docx").unwrap().is_none());
    }

    #[test]
    fn test_put_updates_existing_path() {
        let cache = FileCache::open_in_memory().unwrap();

        let first = cache.put("a.txt", &EntryData::new("text/plain")).unwrap();
        let second = cache.put("a.txt", &EntryData::new("text/markdown")).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.count_files().unwrap(), 1);
        assert_eq!(cache.get("a.txt").unwrap().unwrap().mimetype, "text/markdown");
    }

    #[test]
    fn test_put_interns_mimepart() {
        let cache = FileCache::open_in_memory().unwrap();

        cache.put("test.otf", &EntryData::new("font/opentype")).unwrap();

        assert!(cache.mimetype_id("font/opentype").unwrap().is_some());
        assert!(cache.mimetype_id("font").unwrap().is_some());
        assert_eq!(cache.count_mimetypes().unwrap(), 2);
    }

    #[test]
    fn test_find_by_extension() {
        let cache = FileCache::open_in_memory().unwrap();

        cache.put("a.docx", &EntryData::new("application/msword")).unwrap();
        cache.put("B.DOCX", &EntryData::new("application/msword")).unwrap();
        cache.put("a.doc", &EntryData::new("application/msword")).unwrap();
        cache.put("a.docx.bak", &EntryData::new("application/octet-stream")).unwrap();

        let found: Vec<_> = cache
            .find_by_extension("docx")
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(found, vec!["a.docx", "B.DOCX"]);
    }

    #[test]
    fn test_delete_mimetype_if_unused() {
        let cache = FileCache::open_in_memory().unwrap();

        let id = cache.put("a.xls", &EntryData::new("application/msexcel")).unwrap();
        let excel = cache.mimetype_id("application/msexcel").unwrap().unwrap();

        assert!(!cache.delete_mimetype_if_unused(excel).unwrap());

        cache.update_mimetype(id, "application/vnd.ms-excel").unwrap();
        assert!(cache.delete_mimetype_if_unused(excel).unwrap());
        assert!(cache.mimetype_id("application/msexcel").unwrap().is_none());

        // The mimepart is still in use
        let application = cache.mimetype_id("application").unwrap().unwrap();
        assert!(!cache.delete_mimetype_if_unused(application).unwrap());
    }

    #[test]
    fn test_remove_and_lookup_by_id() {
        let cache = FileCache::open_in_memory().unwrap();

        cache.put("a.pfb", &EntryData::new("application/x-font")).unwrap();
        let id = cache.mimetype_id("application/x-font").unwrap().unwrap();
        assert_eq!(cache.mimetype_by_id(id).unwrap().as_deref(), Some("application/x-font"));

        assert!(cache.remove("a.pfb").unwrap());
        assert!(!cache.remove("a.pfb").unwrap());
        assert!(cache.delete_mimetype_if_unused(id).unwrap());
        assert!(cache.mimetype_by_id(id).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_entry() {
        let cache = FileCache::open_in_memory().unwrap();
        let err = cache.update_mimetype(42, "text/plain").unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }

    #[test]
    fn test_mimetype_references() {
        let cache = FileCache::open_in_memory().unwrap();

        cache.put("a.ttf", &EntryData::new("application/x-font-ttf")).unwrap();
        cache.put("b.ttf", &EntryData::new("application/x-font-ttf")).unwrap();
        cache.put("c.otf", &EntryData::new("font/opentype")).unwrap();

        let refs = cache.mimetype_references().unwrap();
        let ttf = cache.mimetype_id("application/x-font-ttf").unwrap().unwrap();
        let application = cache.mimetype_id("application").unwrap().unwrap();
        let font = cache.mimetype_id("font").unwrap().unwrap();

        assert_eq!(refs[&ttf], 2);
        assert_eq!(refs[&application], 2);
        assert_eq!(refs[&font], 1);
    }

    #[test]
    fn test_cached_ids_survive_reload() {
        let cache = FileCache::open_in_memory().unwrap();

        cache.put("a.ps", &EntryData::new("application/postscript")).unwrap();
        let before = cache.mimetype_id("application/postscript").unwrap();

        cache.clear_cached_mimetypes();
        cache.load_mimetypes().unwrap();

        assert_eq!(cache.mimetype_id("application/postscript").unwrap(), before);
    }

    #[test]
    fn test_rollback_discards_changes() {
        let cache = FileCache::open_in_memory().unwrap();

        cache.begin_transaction().unwrap();
        cache.put("a.apk", &EntryData::new("application/octet-stream")).unwrap();
        cache.rollback().unwrap();

        assert_eq!(cache.count_files().unwrap(), 0);
        assert!(cache.mimetype_id("application/octet-stream").unwrap().is_none());
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileCache::open(&dir.path().join("cache.db"), "oc; --");
        assert!(matches!(result, Err(Error::InvalidPrefix(_))));
    }
}
