use std::path::Path;

use tracing::debug;

use super::types::{StateFile, STATE_VERSION};
use crate::error::AppError;
use crate::ir::VisualConsole;

pub fn read_state(path: &Path) -> Result<VisualConsole, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::StateError(format!("Failed to read {}: {}", path.display(), e)))?;
    let data: StateFile = toml::from_str(&content)
        .map_err(|e| AppError::StateError(format!("Failed to parse {}: {}", path.display(), e)))?;

    if data.meta.version != STATE_VERSION {
        return Err(AppError::StateError(format!(
            "{}: unsupported state version {}",
            path.display(),
            data.meta.version
        )));
    }

    debug!(
        path = %path.display(),
        items = data.console.items.len(),
        user_lines = data.console.user_lines.len(),
        "loaded console state"
    );
    Ok(data.console)
}

pub fn write_state(path: &Path, console: &VisualConsole) -> Result<(), AppError> {
    let data = StateFile::new(console.clone());
    let content = toml::to_string_pretty(&data)
        .map_err(|e| AppError::StateError(format!("Failed to serialize console state: {}", e)))?;
    std::fs::write(path, content)
        .map_err(|e| AppError::StateError(format!("Failed to write {}: {}", path.display(), e)))?;

    Ok(())
}
