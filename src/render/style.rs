//! Drawing constants for SVG rendering.

// Font
pub const FONT_FAMILY: &str = "lato, sans-serif";
pub const FONT_SIZE: f64 = 12.0;
pub const LABEL_GAP: f64 = 4.0;

// Colors
pub const CANVAS_BG: &str = "#ffffff";
pub const ITEM_BG: &str = "#f5f5f5";
pub const ITEM_BORDER: &str = "#b2b2b2";
pub const LABEL_TEXT: &str = "#333333";
pub const PERCENTILE_FILL: &str = "#82b92e";
pub const GRID_STROKE: &str = "#e6e6e6";
pub const HANDLE_FILL: &str = "#ffffff";
pub const HANDLE_STROKE: &str = "#000000";
