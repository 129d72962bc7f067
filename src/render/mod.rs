mod item;
mod style;
mod surface;

use svg::node::element::{Circle, Group, Line, Rectangle};
use svg::Document;

use crate::ir::{HandleEnd, VisualConsole, HANDLE_RADIUS};
use crate::lines::{self, LineSet};

use style::*;

pub use surface::SvgSurface;

/// Render a console as SVG: background, optional grid, connector and user
/// lines, then items on top with the line handles last.
pub fn render_svg(console: &VisualConsole, connectors: &LineSet, grid: Option<u32>) -> String {
    let (width, height) = (console.canvas.width, console.canvas.height);

    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", format!("0 0 {} {}", width, height));

    let mut bg = Rectangle::new()
        .set("width", "100%")
        .set("height", "100%")
        .set("fill", CANVAS_BG);
    if let Some(image) = console.canvas.background.as_deref().filter(|b| !b.is_empty()) {
        bg = bg.set("data-background", image);
    }
    doc = doc.add(bg);

    if let Some(step) = grid {
        doc = doc.add(render_grid(width, height, step));
    }

    // Lines first, so items cover their ends
    if !connectors.is_empty() || !console.user_lines.is_empty() {
        let mut surface = SvgSurface::new();
        lines::redraw(&mut surface, console, connectors, None);
        doc = doc.add(surface.into_group());
    }

    for item in &console.items {
        doc = doc.add(item::render_item(item));
    }

    for line in &console.user_lines {
        for end in [HandleEnd::Start, HandleEnd::End] {
            let p = match end {
                HandleEnd::Start => line.start,
                HandleEnd::End => line.end,
            };
            let handle = Circle::new()
                .set("id", format!("{}_{}", end.as_str(), line.id))
                .set("cx", p.x)
                .set("cy", p.y)
                .set("r", HANDLE_RADIUS)
                .set("fill", HANDLE_FILL)
                .set("stroke", HANDLE_STROKE);
            doc = doc.add(handle);
        }
    }

    doc.to_string()
}

fn render_grid(width: u32, height: u32, step: u32) -> Group {
    let step = step.max(1) as usize;
    let mut group = Group::new().set("class", "grid");
    for x in (0..=width).step_by(step) {
        group = group.add(
            Line::new()
                .set("x1", x)
                .set("y1", 0)
                .set("x2", x)
                .set("y2", height)
                .set("stroke", GRID_STROKE),
        );
    }
    for y in (0..=height).step_by(step) {
        group = group.add(
            Line::new()
                .set("x1", 0)
                .set("y1", y)
                .set("x2", width)
                .set("y2", y)
                .set("stroke", GRID_STROKE),
        );
    }
    group
}
