//! Settings read from `vconsole.toml`.
//!
//! ```toml
//! [backend]
//! base_url = "http://monitor.example.com/pandora_console"
//! metaconsole = false
//! timeout_secs = 30
//!
//! [editor]
//! autosave = true
//! grid_size = 16
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::layout::GRID_SIZE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Console base URL. Without one, edits stay in the local state file.
    pub base_url: Option<String>,
    pub metaconsole: bool,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            metaconsole: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub autosave: bool,
    pub grid_size: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave: true,
            grid_size: GRID_SIZE,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse {}: {}", path.display(), e)))?;

        if config.editor.grid_size == 0 {
            return Err(AppError::ConfigError("editor.grid_size must be positive".into()));
        }
        Ok(config)
    }
}
