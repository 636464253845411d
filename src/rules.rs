//! Rename rules - legacy extension/mimetype pairs and their canonical mimetype
//!
//! Every rule is keyed by file extension. Two kinds of precondition exist:
//! - `Exact`: the entry's current mimetype must equal one specific legacy value
//! - `AnyExceptCanonical`: any mimetype other than the canonical one is rewritten
//!
//! Only the Android package rule uses `AnyExceptCanonical`. Office and font
//! rules must keep their exact-match preconditions.

use serde::Serialize;

use crate::mimetype;

/// What the current mimetype of an entry must look like for a rule to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "mimetype", rename_all = "snake_case")]
pub enum Precondition {
    /// Current mimetype equals this legacy value
    Exact(&'static str),
    /// Current mimetype is anything but the rule's canonical value
    AnyExceptCanonical,
}

/// A single extension-keyed rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RenameRule {
    /// Lowercase extension without the dot
    pub extension: &'static str,
    pub precondition: Precondition,
    pub canonical: &'static str,
}

const MS_EXCEL: &str = "application/vnd.ms-excel";
const MS_POWERPOINT: &str = "application/vnd.ms-powerpoint";
const OOXML_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const OOXML_SHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const OOXML_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
const FONT_SFNT: &str = "application/font-sfnt";
const FONT_TYPE1: &str = "application/x-font";
const ANDROID_PACKAGE: &str = "application/vnd.android.package-archive";
const POSTSCRIPT: &str = "application/postscript";
const OCTET_STREAM: &str = "application/octet-stream";

const fn exact(extension: &'static str, legacy: &'static str, canonical: &'static str) -> RenameRule {
    RenameRule {
        extension,
        precondition: Precondition::Exact(legacy),
        canonical,
    }
}

/// The full rename table, applied in order.
pub static RULES: &[RenameRule] = &[
    // Office: split the old catch-all types and move OOXML files to their own types
    exact("xls", "application/msexcel", MS_EXCEL),
    exact("ppt", "application/mspowerpoint", MS_POWERPOINT),
    exact("docx", "application/msword", OOXML_DOCUMENT),
    exact("xlsx", "application/msexcel", OOXML_SHEET),
    exact("xlsx", MS_EXCEL, OOXML_SHEET),
    exact("pptx", "application/mspowerpoint", OOXML_PRESENTATION),
    exact("pptx", MS_POWERPOINT, OOXML_PRESENTATION),
    // Fonts
    exact("ttf", "application/x-font-ttf", FONT_SFNT),
    exact("otf", "font/opentype", FONT_SFNT),
    exact("pfb", OCTET_STREAM, FONT_TYPE1),
    // Android packages
    RenameRule {
        extension: "apk",
        precondition: Precondition::AnyExceptCanonical,
        canonical: ANDROID_PACKAGE,
    },
    // PostScript
    exact("eps", OCTET_STREAM, POSTSCRIPT),
    exact("ps", OCTET_STREAM, POSTSCRIPT),
];

impl RenameRule {
    /// The legacy mimetype this rule replaces, if it names one.
    pub fn legacy(&self) -> Option<&'static str> {
        match self.precondition {
            Precondition::Exact(legacy) => Some(legacy),
            Precondition::AnyExceptCanonical => None,
        }
    }

    /// Whether an entry's current mimetype satisfies the precondition.
    pub fn accepts_mimetype(&self, current: &str) -> bool {
        match self.precondition {
            Precondition::Exact(legacy) => current == legacy,
            Precondition::AnyExceptCanonical => current != self.canonical,
        }
    }

    /// Whether an entry with this name and mimetype must be rewritten.
    pub fn matches(&self, name: &str, current: &str) -> bool {
        mimetype::has_extension(name, self.extension) && self.accepts_mimetype(current)
    }
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precondition::Exact(legacy) => write!(f, "{}", legacy),
            Precondition::AnyExceptCanonical => write!(f, "*"),
        }
    }
}

impl std::fmt::Display for RenameRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".{} [{}] -> {}", self.extension, self.precondition, self.canonical)
    }
}

/// Find the first rule that rewrites an entry, if any.
pub fn find_rule(name: &str, current: &str) -> Option<&'static RenameRule> {
    RULES.iter().find(|rule| rule.matches(name, current))
}

/// Dictionary strings that may be orphaned once the rules ran: every legacy
/// left-hand side plus its mimepart, deduplicated, in table order.
/// `font` only ever enters the dictionary as the mimepart of `font/opentype`.
pub fn cleanup_candidates() -> Vec<&'static str> {
    let mut candidates: Vec<&'static str> = Vec::new();
    for legacy in RULES.iter().filter_map(RenameRule::legacy) {
        for candidate in [legacy, mimetype::mimepart(legacy)] {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_no_duplicate_left_hand_sides() {
        let mut seen = HashSet::new();
        for rule in RULES {
            assert!(
                seen.insert((rule.extension, rule.precondition)),
                "duplicate rule for {}",
                rule
            );
        }
    }

    #[test]
    fn test_canonical_never_matches_same_extension() {
        // A rewritten entry must not be picked up again by any rule
        for rule in RULES {
            let name = format!("file.{}", rule.extension);
            assert!(
                find_rule(&name, rule.canonical).is_none(),
                "{} would be rewritten twice",
                rule
            );
        }
    }

    #[test]
    fn test_only_apk_accepts_anything() {
        let loose: Vec<_> = RULES
            .iter()
            .filter(|r| r.precondition == Precondition::AnyExceptCanonical)
            .map(|r| r.extension)
            .collect();
        assert_eq!(loose, vec!["apk"]);
    }

    #[test]
    fn test_exact_rules_ignore_unknown_mimetypes() {
        assert!(find_rule("bogus.docx", "application/wrong").is_none());
        assert!(find_rule("bogus.ttf", "application/wrong").is_none());
        assert!(find_rule("test.doc", "application/msword").is_none());
    }

    #[test]
    fn test_apk_rule() {
        let rule = find_rule("app.APK", "application/wrong").unwrap();
        assert_eq!(rule.canonical, ANDROID_PACKAGE);
        assert!(find_rule("app.apk", ANDROID_PACKAGE).is_none());
    }

    #[test]
    fn test_lookup_by_extension_and_legacy() {
        assert_eq!(find_rule("a.xlsx", "application/msexcel").unwrap().canonical, OOXML_SHEET);
        assert_eq!(find_rule("a.xls", "application/msexcel").unwrap().canonical, MS_EXCEL);
        assert_eq!(find_rule("a.pfb", OCTET_STREAM).unwrap().canonical, FONT_TYPE1);
        assert!(find_rule("a.bin", OCTET_STREAM).is_none());
    }

    #[test]
    fn test_font_is_not_a_rule_mimetype() {
        assert!(RULES.iter().all(|r| r.legacy() != Some("font")));
        assert!(find_rule("legacy.ttf", "font").is_none());
    }

    #[test]
    fn test_cleanup_candidates() {
        let candidates = cleanup_candidates();
        for expected in [
            "application/msexcel",
            "application/mspowerpoint",
            "application/x-font-ttf",
            "font/opentype",
            "font",
            "application",
        ] {
            assert!(candidates.contains(&expected), "missing {}", expected);
        }
        let unique: HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
        assert!(!candidates.contains(&ANDROID_PACKAGE));
    }
}
