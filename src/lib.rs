//! # mimerepair - Mimetype normalization for file-metadata caches
//!
//! Older mimetype detection stored deprecated or wrong mimetype strings in the
//! file cache. This crate provides:
//! - A static table of extension-keyed rename rules
//! - A SQLite-backed file cache with an interned mimetype dictionary
//! - A one-shot repair step that rewrites legacy mimetypes to canonical ones
//!   and prunes dictionary entries nothing references anymore

pub mod mimetype;
pub mod rules;
pub mod storage;
pub mod repair;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use rules::{RenameRule, Precondition, RULES};
pub use storage::{FileCache, CacheEntry, EntryData};
pub use repair::{RepairMimeTypes, RepairReport, RepairPlan};

/// Result type alias for mimerepair operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mimerepair operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid table prefix: {0:?}")]
    InvalidPrefix(String),

    #[error("Cache entry not found: {0}")]
    EntryNotFound(String),
}
