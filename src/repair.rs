//! Mimetype repair step
//!
//! Two phases, run inside one transaction:
//! 1. Apply every rename rule: rewrite matching entries to the canonical mimetype
//! 2. Scan references once, then delete legacy dictionary entries with no users
//!
//! Running the step again is a no-op: rewritten entries no longer satisfy any
//! rule precondition and orphaned entries are already gone.

use serde::Serialize;

use crate::rules::{self, RenameRule, RULES};
use crate::storage::{CacheEntry, FileCache};
use crate::Result;

/// A rewrite the step would perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRewrite {
    pub fileid: i64,
    pub path: String,
    pub from: String,
    pub to: &'static str,
}

/// Dry-run result: what `run` would rewrite
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairPlan {
    pub rewrites: Vec<PendingRewrite>,
}

impl RepairPlan {
    pub fn is_empty(&self) -> bool {
        self.rewrites.is_empty()
    }
}

/// Entries rewritten by a single rule
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule: RenameRule,
    pub rewritten: usize,
}

/// Summary of one repair run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    pub rules: Vec<RuleOutcome>,
    pub files_updated: usize,
    pub mimetypes_removed: Vec<String>,
}

impl RepairReport {
    /// Whether the run touched nothing at all
    pub fn is_noop(&self) -> bool {
        self.files_updated == 0 && self.mimetypes_removed.is_empty()
    }
}

impl std::fmt::Display for RepairReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Repair Statistics:")?;
        writeln!(f, "  Files updated: {}", self.files_updated)?;
        for outcome in self.rules.iter().filter(|o| o.rewritten > 0) {
            writeln!(f, "    {}: {}", outcome.rule, outcome.rewritten)?;
        }
        write!(f, "  Mimetypes removed: {}", self.mimetypes_removed.len())?;
        for mimetype in &self.mimetypes_removed {
            write!(f, "\n    {}", mimetype)?;
        }
        Ok(())
    }
}

/// Renames legacy mimetypes in a file cache
pub struct RepairMimeTypes<'a> {
    cache: &'a FileCache,
}

impl<'a> RepairMimeTypes<'a> {
    pub fn new(cache: &'a FileCache) -> Self {
        Self { cache }
    }

    /// Human-readable step name for upgrade output
    pub fn name(&self) -> &'static str {
        "Repair mime types"
    }

    /// Entries a rule would rewrite right now
    fn matching_entries(&self, rule: &RenameRule) -> Result<Vec<CacheEntry>> {
        Ok(self
            .cache
            .find_by_extension(rule.extension)?
            .into_iter()
            .filter(|entry| rule.accepts_mimetype(&entry.mimetype))
            .collect())
    }

    /// Report pending rewrites without touching the cache
    pub fn plan(&self) -> Result<RepairPlan> {
        let mut plan = RepairPlan::default();
        for rule in RULES {
            for entry in self.matching_entries(rule)? {
                plan.rewrites.push(PendingRewrite {
                    fileid: entry.fileid,
                    path: entry.path,
                    from: entry.mimetype,
                    to: rule.canonical,
                });
            }
        }
        Ok(plan)
    }

    /// Run the repair. Any store error rolls the transaction back and is
    /// returned unchanged.
    pub fn run(&self) -> Result<RepairReport> {
        self.cache.begin_transaction()?;
        // A failed COMMIT leaves the transaction open, so it rolls back too
        match self.apply().and_then(|report| self.cache.commit().map(|_| report)) {
            Ok(report) => {
                tracing::info!(
                    "{}: {} files updated, {} mimetypes removed",
                    self.name(),
                    report.files_updated,
                    report.mimetypes_removed.len()
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback_err) = self.cache.rollback() {
                    tracing::warn!("Rollback after failed repair also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    fn apply(&self) -> Result<RepairReport> {
        let mut report = RepairReport::default();

        // Phase 1: rewrite
        for rule in RULES {
            let entries = self.matching_entries(rule)?;
            for entry in &entries {
                tracing::debug!(
                    "Rewriting {} from {} to {}",
                    entry.path,
                    entry.mimetype,
                    rule.canonical
                );
                self.cache.update_mimetype(entry.fileid, rule.canonical)?;
            }
            if !entries.is_empty() {
                tracing::info!("Rule {} rewrote {} files", rule, entries.len());
            }
            report.files_updated += entries.len();
            report.rules.push(RuleOutcome {
                rule: *rule,
                rewritten: entries.len(),
            });
        }

        // Phase 2: prune
        report.mimetypes_removed = self.remove_orphans()?;
        Ok(report)
    }

    /// Delete legacy dictionary strings nothing references anymore
    fn remove_orphans(&self) -> Result<Vec<String>> {
        let references = self.cache.mimetype_references()?;
        let mut removed = Vec::new();

        for candidate in rules::cleanup_candidates() {
            let Some(id) = self.cache.mimetype_id(candidate)? else {
                continue;
            };
            if references.get(&id).copied().unwrap_or(0) > 0 {
                continue;
            }
            if self.cache.delete_mimetype_if_unused(id)? {
                tracing::info!("Removed unused mimetype {} ({})", candidate, id);
                removed.push(candidate.to_string());
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EntryData;

    fn cache_with(entries: &[(&str, &str)]) -> FileCache {
        let cache = FileCache::open_in_memory().unwrap();
        for (path, mimetype) in entries {
            cache.put(path, &EntryData::new(*mimetype)).unwrap();
        }
        cache
    }

    #[test]
    fn test_plan_does_not_write() {
        let cache = cache_with(&[
            ("test.xls", "application/msexcel"),
            ("test.txt", "text/plain"),
        ]);
        let step = RepairMimeTypes::new(&cache);

        let plan = step.plan().unwrap();

        assert_eq!(plan.rewrites.len(), 1);
        assert_eq!(plan.rewrites[0].path, "test.xls");
        assert_eq!(plan.rewrites[0].to, "application/vnd.ms-excel");
        assert_eq!(cache.get("test.xls").unwrap().unwrap().mimetype, "application/msexcel");
    }

    #[test]
    fn test_report_counts_per_rule() {
        let cache = cache_with(&[
            ("a.eps", "application/octet-stream"),
            ("b.ps", "application/octet-stream"),
            ("c.ps", "application/octet-stream"),
        ]);

        let report = RepairMimeTypes::new(&cache).run().unwrap();

        assert_eq!(report.files_updated, 3);
        assert_eq!(report.rules.len(), RULES.len());
        let ps = report.rules.iter().find(|o| o.rule.extension == "ps").unwrap();
        assert_eq!(ps.rewritten, 2);
        assert_eq!(report.mimetypes_removed, vec!["application/octet-stream"]);
    }

    #[test]
    fn test_second_run_is_noop() {
        let cache = cache_with(&[("a.apk", "application/wrong")]);
        let step = RepairMimeTypes::new(&cache);

        assert!(!step.run().unwrap().is_noop());
        assert!(step.run().unwrap().is_noop());
        assert!(step.plan().unwrap().is_empty());
    }

    #[test]
    fn test_empty_cache() {
        let cache = FileCache::open_in_memory().unwrap();
        let report = RepairMimeTypes::new(&cache).run().unwrap();
        assert!(report.is_noop());
    }
}
