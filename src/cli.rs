use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::report::DbDialect;

#[derive(Parser, Debug)]
#[command(name = "vconsole", version, about = "Edit and render monitoring visual consoles")]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Console base URL; overrides the settings file
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Queue changes and send them in one batch at the end
    #[arg(long, global = true)]
    pub manual_save: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a console state file to SVG
    Render {
        /// Console state file (TOML)
        state: PathBuf,

        /// Output SVG path (defaults to the state file with .svg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Draw the snapping grid
        #[arg(long)]
        grid: bool,
    },

    /// Resize the canvas, moving every element proportionally
    Resize {
        state: PathBuf,
        width: u32,
        height: u32,
    },

    /// Snap every element onto the grid
    Snap { state: PathBuf },

    /// Print the connector and user line segments as JSON
    Lines { state: PathBuf },

    /// Replay page events (one JSON message per line) onto a state file
    Apply {
        state: PathBuf,

        /// Events file; reads stdin when omitted
        #[arg(short, long)]
        events: Option<PathBuf>,

        /// Base64 parent candidate list embedded in the console page
        #[arg(long)]
        parents: Option<String>,
    },

    /// Users connected during the last hour
    Users {
        #[arg(long, value_enum, default_value = "mysql")]
        dialect: DbDialect,

        /// Query result rows as JSON; prints the SQL when omitted
        #[arg(long)]
        rows: Option<PathBuf>,

        /// Viewer lacks user management rights
        #[arg(long)]
        no_rights: bool,
    },
}
