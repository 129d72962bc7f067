//! Types for the console state file.
//!
//! Example `console.toml`:
//! ```toml
//! [meta]
//! version = 1
//!
//! [console]
//! id = 4
//!
//! [console.canvas]
//! width = 1024
//! height = 768
//! background = "europe.jpg"
//!
//! [[console.items]]
//! id = 12
//! kind = "icon"
//! parent = 10
//! position = { x = 100, y = 200 }
//! ```

use serde::{Deserialize, Serialize};

use crate::ir::VisualConsole;

pub const STATE_VERSION: u32 = 1;

/// Entire state file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub meta: StateMeta,
    pub console: VisualConsole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMeta {
    pub version: u32,
}

impl StateFile {
    pub fn new(console: VisualConsole) -> Self {
        Self {
            meta: StateMeta {
                version: STATE_VERSION,
            },
            console,
        }
    }
}
