//! Where canopy keeps its files

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "canopy";

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join(APP_DIR))
}

pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .context("Could not determine data directory")
        .map(|p| p.join(APP_DIR))
}

/// Rolling log files
pub fn logs_dir() -> Result<PathBuf> {
    data_dir().map(|p| p.join("logs"))
}

/// Default home for CSV exports given as a bare file name
pub fn exports_dir() -> Result<PathBuf> {
    data_dir().map(|p| p.join("exports"))
}

/// Resolve where an export is written. A bare file name lands in
/// [`exports_dir`], created on demand; a path with a directory part is
/// used as given.
pub fn export_path(target: &Path) -> Result<PathBuf> {
    if !is_bare_file_name(target) {
        return Ok(target.to_path_buf());
    }
    let dir = exports_dir()?;
    create_dir(&dir)?;
    Ok(dir.join(target))
}

fn is_bare_file_name(path: &Path) -> bool {
    path.parent().is_none_or(|p| p.as_os_str().is_empty())
}

fn create_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
    }
    Ok(())
}

pub fn ensure_directories() -> Result<()> {
    for dir in [config_dir()?, data_dir()?, logs_dir()?, exports_dir()?] {
        create_dir(&dir)?;
    }
    Ok(())
}
