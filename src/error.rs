use thiserror::Error;

use crate::editor::validate::ValidationError;
use crate::ir::ItemId;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Console state file error: {0}")]
    StateError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Backend transport error: {0}")]
    Transport(String),

    #[error("Backend rejected {action} for element {id}")]
    Rejected { action: String, id: i64 },

    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("Unknown item {0}")]
    UnknownItem(ItemId),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Operation not allowed in current editor state: {0}")]
    InvalidState(String),
}
