//! Database schema definitions
//!
//! Table names carry a configurable prefix so the store can share a database
//! with the hosting application (`oc_filecache`, `oc_mimetypes`).

/// Prefix used when none is configured
pub const DEFAULT_TABLE_PREFIX: &str = "oc_";

/// Whether a prefix is safe to splice into SQL identifiers
pub fn is_valid_prefix(prefix: &str) -> bool {
    prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolved table names for one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub mimetypes: String,
    pub filecache: String,
}

impl Tables {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            mimetypes: format!("{}mimetypes", prefix),
            filecache: format!("{}filecache", prefix),
        }
    }

    /// SQL to create the mimetype dictionary
    fn create_mimetypes_table(&self) -> String {
        format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mimetype TEXT NOT NULL UNIQUE
)
"#,
            self.mimetypes
        )
    }

    /// SQL to create the file cache. `mimetype` and `mimepart` hold
    /// dictionary ids.
    fn create_filecache_table(&self) -> String {
        format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    fileid INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    mimetype INTEGER NOT NULL,
    mimepart INTEGER NOT NULL,
    size INTEGER NOT NULL DEFAULT 0,
    mtime INTEGER NOT NULL DEFAULT 0
)
"#,
            self.filecache
        )
    }

    fn create_indexes(&self) -> Vec<String> {
        vec![
            format!(
                "CREATE INDEX IF NOT EXISTS {0}_mimetype ON {0}(mimetype)",
                self.filecache
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {0}_mimepart ON {0}(mimepart)",
                self.filecache
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {0}_name ON {0}(name)",
                self.filecache
            ),
        ]
    }

    /// All schema creation statements
    pub fn all_schema_statements(&self) -> Vec<String> {
        let mut stmts = vec![self.create_mimetypes_table(), self.create_filecache_table()];
        stmts.extend(self.create_indexes());
        stmts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_validation() {
        assert!(is_valid_prefix("oc_"));
        assert!(is_valid_prefix(""));
        assert!(!is_valid_prefix("oc; DROP TABLE"));
        assert!(!is_valid_prefix("a-b"));
    }

    #[test]
    fn test_table_names() {
        let tables = Tables::with_prefix("nc_");
        assert_eq!(tables.filecache, "nc_filecache");
        assert_eq!(tables.mimetypes, "nc_mimetypes");
        assert!(tables.all_schema_statements()[1].contains("nc_filecache"));
    }
}
