//! Storage Layer - SQLite-backed file cache
//!
//! Two tables, both sharing a configurable prefix:
//! - mimetypes(id, mimetype) - the interned mimetype dictionary
//! - filecache(fileid, path, name, mimetype, mimepart, size, mtime)

pub mod schema;
pub mod sqlite;

pub use schema::{DEFAULT_TABLE_PREFIX, Tables};
pub use sqlite::{CacheEntry, CacheStats, EntryData, FileCache};
