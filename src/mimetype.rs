//! Mimetype and file-name helpers
//!
//! Cache entries reference two dictionary strings: the full mimetype
//! (`application/msword`) and its mimepart, the top-level media type
//! (`application`). Extensions are derived from the entry name.

/// Top-level media type of a mimetype.
///
/// `font/opentype` → `font`. A string without `/` is its own part.
pub fn mimepart(mimetype: &str) -> &str {
    match mimetype.split_once('/') {
        Some((part, _)) => part,
        None => mimetype,
    }
}

/// Last path component, the name the cache stores next to the full path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, name)) => name,
        None => trimmed,
    }
}

/// Lowercased extension of a file name, without the dot.
///
/// Returns `None` for names without a dot or ending in one. A leading dot
/// (`.apk`) still counts: the cache matches on `%.apk` suffixes.
pub fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether `name` carries the extension `ext` (case-insensitive).
pub fn has_extension(name: &str, ext: &str) -> bool {
    extension(name).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
