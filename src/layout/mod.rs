use crate::error::AppError;
use crate::ir::{Element, Point, Size, VisualConsole, MIN_CANVAS_HEIGHT, MIN_CANVAS_WIDTH};

pub(crate) mod state_file;
pub(crate) mod types;

/// Grid cell size in pixels, for both axes.
pub const GRID_SIZE: u32 = 16;

/// A new absolute position for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub element: Element,
    pub to: Point,
}

/// Clamp a requested canvas size to the editor minimum. The flag is set when
/// either dimension had to be raised.
pub fn clamp_canvas(requested: Size) -> (Size, bool) {
    let width = requested.width.max(MIN_CANVAS_WIDTH);
    let height = requested.height.max(MIN_CANVAS_HEIGHT);
    let clamped = width != requested.width || height != requested.height;
    (Size::new(width, height), clamped)
}

/// Scale a position so it keeps its relative place on the canvas.
pub fn rescale_point(p: Point, from: Size, to: Size) -> Result<Point, AppError> {
    if from.width == 0 || from.height == 0 {
        return Err(AppError::InvalidCanvas {
            width: from.width,
            height: from.height,
        });
    }

    let ratio_x = to.width as f64 / from.width as f64;
    let ratio_y = to.height as f64 / from.height as f64;

    Ok(Point::new(
        (p.x as f64 * ratio_x).round() as i32,
        (p.y as f64 * ratio_y).round() as i32,
    ))
}

/// Quantize a position down to the grid.
pub fn snap_point(p: Point, grid: u32) -> Point {
    let g = grid.max(1) as i32;
    Point::new(p.x.div_euclid(g) * g, p.y.div_euclid(g) * g)
}

/// One move per movable element for a canvas resize from `from` to `to`.
pub fn plan_rescale(console: &VisualConsole, from: Size, to: Size) -> Result<Vec<Move>, AppError> {
    let mut moves = Vec::new();
    for element in console.movable_elements() {
        if let Some(p) = console.element_position(element) {
            moves.push(Move {
                element,
                to: rescale_point(p, from, to)?,
            });
        }
    }
    Ok(moves)
}

/// One move per movable element, snapping it onto the grid. Elements already
/// on the grid still get a move so the backend sees every position.
pub fn plan_snap(console: &VisualConsole, grid: u32) -> Vec<Move> {
    console
        .movable_elements()
        .into_iter()
        .filter_map(|element| {
            console.element_position(element).map(|p| Move {
                element,
                to: snap_point(p, grid),
            })
        })
        .collect()
}
