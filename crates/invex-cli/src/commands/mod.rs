//! Subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod text;

use std::path::{Path, PathBuf};

use invex_core::InvexConfig;
use tracing::debug;

/// `<config_dir>/invex/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// The `--config` file if given, else the default file if it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvexConfig> {
    if let Some(path) = config_path {
        return Ok(InvexConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        return Ok(InvexConfig::from_file(&default_path)?);
    }

    Ok(InvexConfig::default())
}
