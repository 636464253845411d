use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::DEFAULT_TABLE_PREFIX;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MimeRepairConfig {
    pub database: Option<String>,
    pub table_prefix: Option<String>,
}

impl MimeRepairConfig {
    /// Config written by `init`
    pub fn with_defaults() -> Self {
        Self {
            database: Some(default_database_path().to_string_lossy().to_string()),
            table_prefix: Some(DEFAULT_TABLE_PREFIX.to_string()),
        }
    }

    /// Database path: explicit flag, then config, then the default
    pub fn resolve_database(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_database_path)
    }

    /// Table prefix: explicit flag, then config, then `oc_`
    pub fn resolve_prefix(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.table_prefix.clone())
            .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("mimerepair.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("data").join("mimerepair.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MimeRepairConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MimeRepairConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MimeRepairConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
