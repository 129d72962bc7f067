use svg::node::element::{Group, Line};

use crate::ir::Point;
use crate::lines::{Stroke, Surface};

/// Line layer of an SVG document.
#[derive(Debug, Default)]
pub struct SvgSurface {
    lines: Vec<Line>,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_group(self) -> Group {
        self.lines
            .into_iter()
            .fold(Group::new().set("class", "lines"), |g, line| g.add(line))
    }
}

impl Surface for SvgSurface {
    fn clear(&mut self) {
        self.lines.clear();
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: Stroke<'_>) {
        self.lines.push(
            Line::new()
                .set("x1", from.x)
                .set("y1", from.y)
                .set("x2", to.x)
                .set("y2", to.y)
                .set("stroke", stroke.color)
                .set("stroke-width", stroke.width),
        );
    }
}
