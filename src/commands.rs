use crate::{emit_success, OutputMode};
use mimerepair::config::{self, MimeRepairConfig};
use mimerepair::output::is_quiet;
use mimerepair::ui::{self, Icons, Spinner};
use mimerepair::{FileCache, RepairMimeTypes, RULES};
use std::path::Path;
use std::time::Instant;

pub fn run_repair(
    output_mode: OutputMode,
    database: &Path,
    prefix: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    if !database.exists() {
        anyhow::bail!("database not found at {}", database.display());
    }

    let cache = FileCache::open(database, prefix)?;
    let step = RepairMimeTypes::new(&cache);
    let human = output_mode.is_human() && !is_quiet();

    if human {
        ui::header(step.name());
        ui::info(&format!("{} Database", Icons::DATABASE), &database.display().to_string());
    }

    if dry_run {
        let plan = step.plan()?;
        if human {
            if plan.is_empty() {
                ui::success("Nothing to repair");
            } else {
                for rewrite in &plan.rewrites {
                    ui::mimetype_change(&rewrite.path, &rewrite.from, rewrite.to);
                }
                ui::summary_row("Pending rewrites:", &plan.rewrites.len().to_string());
                ui::warn("Dry run: nothing was written");
            }
        } else if !output_mode.is_human() {
            emit_success(output_mode, "repair", serde_json::to_value(&plan)?)?;
        }
        return Ok(());
    }

    let started = Instant::now();
    let spinner = human.then(|| Spinner::new("Renaming legacy mimetypes"));
    let report = step.run().inspect_err(|_| {
        if let Some(spinner) = &spinner {
            spinner.clear();
        }
    })?;

    if human {
        if let Some(spinner) = &spinner {
            spinner.finish_with_summary(
                started.elapsed(),
                report.files_updated,
                report.mimetypes_removed.len(),
            );
        }
        if report.is_noop() {
            ui::success("All mimetypes are already canonical");
        } else {
            println!("{}", report);
        }
    } else if !output_mode.is_human() {
        emit_success(output_mode, "repair", serde_json::to_value(&report)?)?;
    }
    Ok(())
}

pub fn run_rules(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        ui::section("Rename rules");
        println!("{}", ui::rules_table(RULES));
    } else {
        emit_success(output_mode, "rules", serde_json::to_value(RULES)?)?;
    }
    Ok(())
}

pub fn run_stats(output_mode: OutputMode, database: &Path, prefix: &str) -> anyhow::Result<()> {
    if !database.exists() {
        anyhow::bail!("database not found at {}", database.display());
    }

    let cache = FileCache::open(database, prefix)?;
    let stats = cache.stats()?;

    if output_mode.is_human() {
        ui::section(&format!("{} Cache Statistics", Icons::STATS));
        let files = stats.files.to_string();
        let mimetypes = stats.mimetypes.to_string();
        println!(
            "{}",
            ui::stats_table(&[("Files", files.as_str()), ("Mimetypes", mimetypes.as_str())])
        );
    } else {
        emit_success(output_mode, "stats", serde_json::to_value(&stats)?)?;
    }
    Ok(())
}

pub fn run_init(output_mode: OutputMode, path: &Path, force: bool) -> anyhow::Result<()> {
    let defaults = MimeRepairConfig::with_defaults();
    config::write_config(path, &defaults, force)?;
    config::ensure_db_dir(&defaults.resolve_database(None))?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
    } else {
        let data = serde_json::json!({ "config": path.display().to_string() });
        emit_success(output_mode, "init", data)?;
    }
    Ok(())
}
