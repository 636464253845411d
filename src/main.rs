//! mimerepair CLI - runs the mimetype repair step against a file cache database

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "mimerepair")]
#[command(version)]
#[command(about = "Rename legacy mimetypes in a file cache to their canonical form")]
#[command(long_about = r#"
mimerepair rewrites mimetypes that older detection logic stored in the file
cache (application/msexcel, font/opentype, ...) to their canonical values and
removes dictionary entries nothing references anymore.

Example usage:
  mimerepair repair --database data/owncloud.db --dry-run
  mimerepair repair --database data/owncloud.db
  mimerepair rules
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to mimerepair.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename legacy mimetypes and prune unused dictionary entries
    Repair {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Table prefix (e.g. oc_)
        #[arg(short, long)]
        prefix: Option<String>,

        /// Only list the entries that would change
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the rename rule table
    Rules,

    /// Show file and mimetype counts
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Table prefix (e.g. oc_)
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Write a default mimerepair.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

/// Print the JSON envelope used for every command in `--json` mode
pub fn emit_success(
    output_mode: OutputMode,
    command: &str,
    data: serde_json::Value,
) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config = mimerepair::config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Repair { database, prefix, dry_run } => commands::run_repair(
            output_mode,
            &config.resolve_database(database),
            &config.resolve_prefix(prefix),
            dry_run,
        ),
        Commands::Rules => commands::run_rules(output_mode),
        Commands::Stats { database, prefix } => commands::run_stats(
            output_mode,
            &config.resolve_database(database),
            &config.resolve_prefix(prefix),
        ),
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(mimerepair::config::default_config_path);
            commands::run_init(output_mode, &path, force)
        }
    }
}
