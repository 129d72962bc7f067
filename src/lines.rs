//! Connector lines between parent and child items, free-form user lines, and
//! the clear-and-redraw pass that paints both.

use serde::Serialize;
use tracing::{debug, trace};

use crate::ir::{ConnectorLine, HandleEnd, ItemId, Point, UserLine, VisualConsole, HANDLE_RADIUS};

/// Color used until the backend reports the parent's status color.
pub const DEFAULT_LINE_COLOR: &str = "#cccccc";

pub const CONNECTOR_WIDTH: u32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct Stroke<'a> {
    pub color: &'a str,
    pub width: u32,
}

/// Anything lines can be drawn on.
pub trait Surface {
    fn clear(&mut self);
    fn draw_line(&mut self, from: Point, to: Point, stroke: Stroke<'_>);
    fn paint(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub color: String,
    pub width: u32,
}

/// Surface that keeps the segments of the last paint.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub segments: Vec<Segment>,
    pub paints: usize,
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.segments.clear();
    }

    fn draw_line(&mut self, from: Point, to: Point, stroke: Stroke<'_>) {
        self.segments.push(Segment {
            from,
            to,
            color: stroke.color.to_string(),
            width: stroke.width,
        });
    }

    fn paint(&mut self) {
        self.paints += 1;
    }
}

/// Connector lines, one per child with a parent.
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    lines: Vec<ConnectorLine>,
}

impl LineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the set from the parent pointers of a console, using the colors it
    /// last stored.
    pub fn from_console(console: &VisualConsole) -> Self {
        let mut set = Self::new();
        for item in &console.items {
            if let Some(parent) = item.parent.filter(|p| p.0 != 0) {
                let color = console
                    .line_colors
                    .get(&item.id.to_string())
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_LINE_COLOR);
                set.upsert(item.id, parent, color);
            }
        }
        set
    }

    pub fn upsert(&mut self, child: ItemId, parent: ItemId, color: impl Into<String>) {
        let color = color.into();
        match self.lines.iter_mut().find(|l| l.id == child) {
            Some(line) => {
                line.node_begin = parent;
                line.color = color;
            }
            None => self.lines.push(ConnectorLine {
                id: child,
                node_begin: parent,
                node_end: child,
                color,
            }),
        }
    }

    /// Point an existing line at a new parent. Returns false when the child has
    /// no line yet.
    pub fn reparent(&mut self, child: ItemId, parent: ItemId) -> bool {
        match self.lines.iter_mut().find(|l| l.node_end == child) {
            Some(line) => {
                line.node_begin = parent;
                true
            }
            None => false,
        }
    }

    pub fn remove_child(&mut self, child: ItemId) -> Option<ConnectorLine> {
        let idx = self.lines.iter().position(|l| l.node_end == child)?;
        Some(self.lines.remove(idx))
    }

    /// Drop the line owned by a deleted item and every line anchored on it.
    pub fn remove_for_deleted(&mut self, id: ItemId) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != id && l.node_begin != id);
        before - self.lines.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectorLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
impl LineSet {
    pub fn get(&self, child: ItemId) -> Option<&ConnectorLine> {
        self.lines.iter().find(|l| l.id == child)
    }
}

/// Move one end of a user line to follow its handle. `handle_pos` is the
/// handle's top-left corner; the endpoint is the handle center.
pub fn move_handle(lines: &mut [UserLine], id: ItemId, end: HandleEnd, handle_pos: Point) -> bool {
    let Some(line) = lines.iter_mut().find(|l| l.id == id) else {
        return false;
    };
    let p = handle_pos.offset(HANDLE_RADIUS);
    match end {
        HandleEnd::Start => line.start = p,
        HandleEnd::End => line.end = p,
    }
    true
}

/// Clear the surface and draw every connector line, then every user line, then
/// the optional in-progress preview line.
pub fn redraw(
    surface: &mut dyn Surface,
    console: &VisualConsole,
    lines: &LineSet,
    preview: Option<&Segment>,
) {
    surface.clear();

    for line in lines.iter() {
        let begin = console.item(line.node_begin);
        let end = console.item(line.node_end);
        match (begin, end) {
            (Some(b), Some(e)) => surface.draw_line(
                b.center(),
                e.center(),
                Stroke {
                    color: &line.color,
                    width: CONNECTOR_WIDTH,
                },
            ),
            _ => debug!(child = %line.id, parent = %line.node_begin, "skipping line with missing endpoint"),
        }
    }

    for line in &console.user_lines {
        surface.draw_line(
            line.start,
            line.end,
            Stroke {
                color: &line.line_color,
                width: line.line_width,
            },
        );
    }

    if let Some(seg) = preview {
        surface.draw_line(
            seg.from,
            seg.to,
            Stroke {
                color: &seg.color,
                width: seg.width,
            },
        );
    }

    surface.paint();
    trace!(connectors = lines.len(), user_lines = console.user_lines.len(), "redrawn");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Canvas, CanvasItem, ItemKind, Size};

    fn console() -> VisualConsole {
        let mut console = VisualConsole::new(
            1,
            Canvas {
                width: 1024,
                height: 768,
                background: None,
            },
        );
        for (id, x, y, parent) in [(1, 0, 0, None), (2, 100, 0, Some(1)), (3, 0, 100, Some(1)), (4, 200, 200, Some(2))] {
            let mut item = CanvasItem::new(ItemId(id), ItemKind::Box, Point::new(x, y));
            item.size = Some(Size::new(20, 20));
            item.parent = parent.map(ItemId);
            console.items.push(item);
        }
        console
    }

    #[test]
    fn test_from_console_one_line_per_child() {
        let mut c = console();
        c.line_colors.insert("3".into(), "#ff0000".into());
        let set = LineSet::from_console(&c);
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(ItemId(3)).unwrap().color, "#ff0000");
        assert_eq!(set.get(ItemId(2)).unwrap().color, DEFAULT_LINE_COLOR);
        assert!(set.get(ItemId(1)).is_none());
    }

    #[test]
    fn test_upsert_keeps_single_line_per_child() {
        let mut set = LineSet::new();
        set.upsert(ItemId(5), ItemId(1), "#aaaaaa");
        set.upsert(ItemId(5), ItemId(2), "#bbbbbb");
        assert_eq!(set.len(), 1);
        let line = set.get(ItemId(5)).unwrap();
        assert_eq!(line.node_begin, ItemId(2));
        assert_eq!(line.node_end, ItemId(5));
        assert_eq!(line.color, "#bbbbbb");
    }

    #[test]
    fn test_delete_removes_owned_and_anchored_lines_only() {
        let mut set = LineSet::from_console(&console());
        // Item 2 owns line 2 (parent 1) and anchors line 4.
        assert_eq!(set.remove_for_deleted(ItemId(2)), 2);
        let remaining: Vec<ItemId> = set.iter().map(|l| l.id).collect();
        assert_eq!(remaining, vec![ItemId(3)]);
    }

    #[test]
    fn test_clearing_parent_leaves_no_line_for_child() {
        let mut c = console();
        let mut set = LineSet::from_console(&c);
        assert!(set.remove_child(ItemId(3)).is_some());
        c.item_mut(ItemId(3)).unwrap().parent = None;

        let mut surface = RecordingSurface::default();
        redraw(&mut surface, &c, &set, None);
        let child_center = c.item(ItemId(3)).unwrap().center();
        assert!(surface
            .segments
            .iter()
            .all(|s| s.from != child_center && s.to != child_center));
        assert_eq!(surface.segments.len(), 2);
    }

    #[test]
    fn test_redraw_clears_and_draws_centers() {
        let mut c = console();
        c.user_lines.push(UserLine {
            id: ItemId(9),
            line_width: 3,
            line_color: "#123456".into(),
            start: Point::new(1, 2),
            end: Point::new(3, 4),
        });
        let set = LineSet::from_console(&c);
        let mut surface = RecordingSurface::default();
        redraw(&mut surface, &c, &set, None);
        redraw(&mut surface, &c, &set, None);

        assert_eq!(surface.paints, 2);
        assert_eq!(surface.segments.len(), 4);
        assert_eq!(surface.segments[0].from, Point::new(10, 10));
        assert_eq!(surface.segments[0].to, Point::new(110, 10));
        assert_eq!(surface.segments[3].color, "#123456");
        assert_eq!(surface.segments[3].width, 3);
    }

    #[test]
    fn test_move_handle_adds_radius() {
        let mut lines = vec![UserLine {
            id: ItemId(9),
            line_width: 1,
            line_color: "#000".into(),
            start: Point::new(0, 0),
            end: Point::new(0, 0),
        }];
        assert!(move_handle(&mut lines, ItemId(9), HandleEnd::End, Point::new(40, 50)));
        assert_eq!(lines[0].end, Point::new(46, 56));
        assert_eq!(lines[0].start, Point::new(0, 0));
        assert!(move_handle(&mut lines, ItemId(9), HandleEnd::Start, Point::new(4, 4)));
        assert_eq!(lines[0].start, Point::new(10, 10));
        assert!(!move_handle(&mut lines, ItemId(1), HandleEnd::Start, Point::new(4, 4)));
    }
}
