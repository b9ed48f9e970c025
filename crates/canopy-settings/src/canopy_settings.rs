//! Canopy Settings System
//!
//! Persisted preferences applied to every grid the application builds:
//! - Grid settings (page sizes, search debounce, multi-sort, density)
//! - Editing settings (optimistic updates, numeric input policy)
//! - Export settings (CSV shape and row scope)

use anyhow::{Context, Result};
use canopy_grid::{Density, NumericInputPolicy, ViewOptions, pagination, pipeline};
use canopy_services::{CsvOptions, ExportScope, GridOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod settings_file;

pub use settings_file::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CanopySettings {
    pub grid: GridSettings,
    pub editing: EditingSettings,
    pub export: ExportSettings,
}

impl CanopySettings {
    /// Load from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "no settings file; using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        config_dir().map(|p| p.join("settings.json"))
    }

    /// Engine options for a grid built from these settings
    pub fn grid_options(&self) -> GridOptions {
        GridOptions::from(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
    pub search_debounce_ms: u64,
    pub multi_sort: bool,
    pub density: Density,
    pub empty_state_message: String,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            page_size: pagination::DEFAULT_PAGE_SIZE,
            page_size_options: pagination::DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            search_debounce_ms: 300,
            multi_sort: false,
            density: Density::Normal,
            empty_state_message: pipeline::DEFAULT_EMPTY_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingSettings {
    pub optimistic_updates: bool,
    pub coerce_invalid_numeric_input_to_zero: bool,
    pub invalidate_on_success: bool,
}

impl Default for EditingSettings {
    fn default() -> Self {
        Self {
            optimistic_updates: true,
            coerce_invalid_numeric_input_to_zero: true,
            invalidate_on_success: true,
        }
    }
}

impl EditingSettings {
    pub fn numeric_policy(&self) -> NumericInputPolicy {
        NumericInputPolicy::from_coerce_flag(self.coerce_invalid_numeric_input_to_zero)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub include_headers: bool,
    pub field_delimiter: char,
    pub export_scope: ExportScope,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            include_headers: true,
            field_delimiter: ',',
            export_scope: ExportScope::Filtered,
        }
    }
}

impl From<&CanopySettings> for GridOptions {
    fn from(settings: &CanopySettings) -> Self {
        let grid = &settings.grid;
        GridOptions {
            view: ViewOptions {
                page_size: grid.page_size,
                page_size_options: grid.page_size_options.clone(),
                multi_sort: grid.multi_sort,
                search_debounce: Duration::from_millis(grid.search_debounce_ms),
                density: grid.density,
                ..ViewOptions::default()
            },
            optimistic_updates: settings.editing.optimistic_updates,
            invalidate_on_success: settings.editing.invalidate_on_success,
            numeric_policy: settings.editing.numeric_policy(),
            empty_state_message: grid.empty_state_message.clone(),
            export_scope: settings.export.export_scope,
            csv: CsvOptions {
                include_headers: settings.export.include_headers,
                field_delimiter: settings.export.field_delimiter,
            },
            ..GridOptions::default()
        }
    }
}
