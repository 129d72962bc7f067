mod backend;
mod cli;
mod config;
mod editor;
mod error;
mod ir;
mod layout;
mod lines;
mod logging;
mod render;
mod report;

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};

use backend::{Backend, HttpBackend, LocalBackend};
use cli::{Cli, Commands};
use config::Config;
use editor::{handle_message, parse_ipc_message, EditorSession, ParentCandidates};
use error::AppError;
use ir::{Element, Size, VisualConsole};
use layout::state_file::{read_state, write_state};
use lines::{LineSet, RecordingSurface};
use render::SvgSurface;
use report::{connected_users_sql, render_report, DbDialect, SessionRow};

type Session = EditorSession<Box<dyn Backend>, SvgSurface>;

fn main() -> Result<(), AppError> {
    logging::init("info");
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.backend_url {
        config.backend.base_url = Some(url);
    }
    if cli.manual_save {
        config.editor.autosave = false;
    }

    match cli.command {
        Commands::Render { state, output, grid } => cmd_render(&config, &state, output, grid)?,
        Commands::Resize { state, width, height } => cmd_resize(&config, &state, Size::new(width, height))?,
        Commands::Snap { state } => cmd_snap(&config, &state)?,
        Commands::Lines { state } => cmd_lines(&state)?,
        Commands::Apply {
            state,
            events,
            parents,
        } => cmd_apply(&config, &state, events, parents)?,
        Commands::Users {
            dialect,
            rows,
            no_rights,
        } => cmd_users(dialect, rows, !no_rights)?,
    }

    Ok(())
}

fn open_backend(config: &Config, console: &VisualConsole) -> Result<Box<dyn Backend>, AppError> {
    match &config.backend.base_url {
        Some(url) => {
            info!(url = %url, "using console backend");
            Ok(Box::new(HttpBackend::new(url, &config.backend)?))
        }
        None => Ok(Box::new(LocalBackend::new(console.next_id()))),
    }
}

fn open_session(config: &Config, state: &Path) -> Result<Session, AppError> {
    let console = read_state(state)?;
    let backend = open_backend(config, &console)?;
    let mut session = EditorSession::new(console, backend, SvgSurface::new());
    session.configure(&config.editor);
    Ok(session)
}

/// Flush anything still queued and store the console.
fn close_session(mut session: Session, state: &Path) -> Result<(), AppError> {
    let pending = session.pending();
    let report = session.save();
    if !report.success() {
        warn!(pending, failed = report.failed, "some queued changes were not saved");
    }
    write_state(state, session.console())?;
    info!(path = %state.display(), "console state saved");
    Ok(())
}

fn cmd_render(config: &Config, state: &Path, output: Option<PathBuf>, grid: bool) -> Result<(), AppError> {
    let console = read_state(state)?;
    let lines = LineSet::from_console(&console);
    let svg = render::render_svg(&console, &lines, grid.then_some(config.editor.grid_size));

    let output = output.unwrap_or_else(|| state.with_extension("svg"));
    std::fs::write(&output, svg)?;
    info!(
        items = console.items.len(),
        connectors = lines.len(),
        path = %output.display(),
        "rendered console"
    );
    Ok(())
}

fn cmd_resize(config: &Config, state: &Path, size: Size) -> Result<(), AppError> {
    let mut session = open_session(config, state)?;
    let outcome = session.resize_canvas(size)?;
    info!(
        width = outcome.size.width,
        height = outcome.size.height,
        clamped = outcome.clamped,
        moved = outcome.report.moved.len(),
        failed = outcome.report.failed.len(),
        "resize done"
    );
    if !outcome.report.is_complete() {
        warn!("some elements kept their old position");
    }
    close_session(session, state)
}

fn cmd_snap(config: &Config, state: &Path) -> Result<(), AppError> {
    let mut session = open_session(config, state)?;
    session.select(Element::Background)?;
    if let Some(report) = session.toggle_grid()? {
        info!(moved = report.moved.len(), failed = report.failed.len(), "snapped to grid");
        if !report.is_complete() {
            warn!("some elements were not snapped");
        }
    }
    close_session(session, state)
}

fn cmd_lines(state: &Path) -> Result<(), AppError> {
    let console = read_state(state)?;
    let lines = LineSet::from_console(&console);
    let mut surface = RecordingSurface::default();
    lines::redraw(&mut surface, &console, &lines, None);

    let json = serde_json::to_string_pretty(&surface.segments)
        .map_err(|e| AppError::StateError(format!("Failed to serialize segments: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn cmd_apply(
    config: &Config,
    state: &Path,
    events: Option<PathBuf>,
    parents: Option<String>,
) -> Result<(), AppError> {
    let mut session = open_session(config, state)?;
    if let Some(encoded) = parents {
        session.set_parents(ParentCandidates::decode(&encoded)?);
    }

    let reader: Box<dyn Read> = match &events {
        Some(path) => Box::new(std::fs::File::open(path)?),
        None => Box::new(std::io::stdin()),
    };

    for (n, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match parse_ipc_message(&line) {
            Ok(msg) => handle_message(&mut session, msg).map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };
        let out = match reply {
            Ok(reply) => serde_json::to_value(&reply)
                .map_err(|e| AppError::StateError(format!("Failed to serialize reply: {}", e)))?,
            Err(e) => {
                warn!(line = n + 1, error = %e, "event not applied");
                serde_json::json!({ "ok": false, "error": e })
            }
        };
        println!("{}", out);
    }

    close_session(session, state)
}

fn cmd_users(dialect: DbDialect, rows: Option<PathBuf>, can_manage_users: bool) -> Result<(), AppError> {
    let Some(path) = rows else {
        println!("{}", connected_users_sql(dialect));
        return Ok(());
    };

    let content = std::fs::read_to_string(&path)?;
    let rows: Vec<SessionRow> = serde_json::from_str(&content)
        .map_err(|e| AppError::StateError(format!("Failed to parse {}: {}", path.display(), e)))?;
    print!("{}", render_report(&rows, can_manage_users));
    Ok(())
}
