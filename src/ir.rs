use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Smallest canvas the editor accepts when the user resizes the background.
pub const MIN_CANVAS_WIDTH: u32 = 1024;
pub const MIN_CANVAS_HEIGHT: u32 = 768;

/// Radius of the handle image drawn at each end of a user line.
pub const HANDLE_RADIUS: i32 = 6;

/// Size used for line endpoints when an item auto-sizes.
pub const DEFAULT_ITEM_SIZE: u32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "box_item")]
    Box,
    #[serde(rename = "static_graph")]
    StaticGraph,
    #[serde(rename = "group_item")]
    Group,
    #[serde(rename = "percentile_item", alias = "percentile_bar")]
    Percentile,
    #[serde(rename = "module_graph")]
    ModuleGraph,
    #[serde(rename = "simple_value")]
    SimpleValue,
    #[serde(rename = "label")]
    Label,
    #[serde(rename = "icon")]
    Icon,
    #[serde(rename = "auto_sla_graph")]
    AutoSlaGraph,
    #[serde(rename = "line_item")]
    Line,
}

impl ItemKind {
    pub const ALL: [ItemKind; 10] = [
        ItemKind::Box,
        ItemKind::StaticGraph,
        ItemKind::Group,
        ItemKind::Percentile,
        ItemKind::ModuleGraph,
        ItemKind::SimpleValue,
        ItemKind::Label,
        ItemKind::Icon,
        ItemKind::AutoSlaGraph,
        ItemKind::Line,
    ];

    /// Name used by the backend for the `type` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Box => "box_item",
            ItemKind::StaticGraph => "static_graph",
            ItemKind::Group => "group_item",
            ItemKind::Percentile => "percentile_item",
            ItemKind::ModuleGraph => "module_graph",
            ItemKind::SimpleValue => "simple_value",
            ItemKind::Label => "label",
            ItemKind::Icon => "icon",
            ItemKind::AutoSlaGraph => "auto_sla_graph",
            ItemKind::Line => "line_item",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentile_bar" => Ok(ItemKind::Percentile),
            _ => ItemKind::ALL
                .iter()
                .copied()
                .find(|k| k.as_str() == s)
                .ok_or_else(|| format!("unknown item type '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, d: i32) -> Self {
        Self { x: self.x + d, y: self.y + d }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentileStyle {
    Bar,
    Bubble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPosition {
    Up,
    Down,
    Left,
    Right,
}

/// Kind-specific content and style. Every field is optional because each kind
/// only uses a few of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_position: Option<LabelPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_percentile: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile_style: Option<PercentileStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_graph: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_linked: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasItem {
    pub id: ItemId,
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemId>,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default)]
    pub attrs: ItemAttrs,
}

impl CanvasItem {
    pub fn new(id: ItemId, kind: ItemKind, position: Point) -> Self {
        Self {
            id,
            kind,
            parent: None,
            position,
            size: None,
            attrs: ItemAttrs::default(),
        }
    }

    pub fn effective_size(&self) -> Size {
        self.size
            .unwrap_or(Size::new(DEFAULT_ITEM_SIZE, DEFAULT_ITEM_SIZE))
    }

    /// Anchor point for connector lines.
    pub fn center(&self) -> Point {
        let size = self.effective_size();
        Point::new(
            self.position.x + (size.width / 2) as i32,
            self.position.y + (size.height / 2) as i32,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

impl Canvas {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Edge from a parent item to one of its children. `id` is always the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorLine {
    pub id: ItemId,
    pub node_begin: ItemId,
    pub node_end: ItemId,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLine {
    pub id: ItemId,
    pub line_width: u32,
    pub line_color: String,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleEnd {
    #[serde(rename = "handler_start")]
    Start,
    #[serde(rename = "handler_end")]
    End,
}

impl HandleEnd {
    pub fn as_str(self) -> &'static str {
        match self {
            HandleEnd::Start => "handler_start",
            HandleEnd::End => "handler_end",
        }
    }

    /// Parse a DOM-style handle id such as `handler_start_12`.
    pub fn parse_element_id(s: &str) -> Option<(HandleEnd, ItemId)> {
        for end in [HandleEnd::Start, HandleEnd::End] {
            if let Some(rest) = s.strip_prefix(end.as_str()).and_then(|r| r.strip_prefix('_')) {
                return rest.parse().ok().map(|id| (end, ItemId(id)));
            }
        }
        None
    }
}

/// Anything on the canvas that can be moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Background,
    Item(ItemId),
    Handle(ItemId, HandleEnd),
}

impl Element {
    pub fn id(self) -> ItemId {
        match self {
            Element::Background => ItemId(0),
            Element::Item(id) | Element::Handle(id, _) => id,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Background => f.write_str("background"),
            Element::Item(id) => write!(f, "item {}", id),
            Element::Handle(id, end) => write!(f, "{}_{}", end.as_str(), id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualConsole {
    pub id: i64,
    pub canvas: Canvas,
    #[serde(default)]
    pub items: Vec<CanvasItem>,
    #[serde(default)]
    pub user_lines: Vec<UserLine>,
    /// Connector line colors keyed by child id, as last reported by the backend.
    #[serde(default)]
    pub line_colors: BTreeMap<String, String>,
}

#[cfg(test)]
impl VisualConsole {
    pub fn new(id: i64, canvas: Canvas) -> Self {
        Self {
            id,
            canvas,
            items: Vec::new(),
            user_lines: Vec::new(),
            line_colors: BTreeMap::new(),
        }
    }
}

impl VisualConsole {
    pub fn item(&self, id: ItemId) -> Option<&CanvasItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut CanvasItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn user_line(&self, id: ItemId) -> Option<&UserLine> {
        self.user_lines.iter().find(|l| l.id == id)
    }

    pub fn user_line_mut(&mut self, id: ItemId) -> Option<&mut UserLine> {
        self.user_lines.iter_mut().find(|l| l.id == id)
    }

    /// Backend `type` name for an element.
    pub fn type_name(&self, element: Element) -> Option<&'static str> {
        match element {
            Element::Background => Some("background"),
            Element::Item(id) => self.item(id).map(|i| i.kind.as_str()),
            Element::Handle(_, end) => Some(end.as_str()),
        }
    }

    /// Current on-canvas position of a movable element. Handles sit one radius
    /// up and left of the line endpoint they control.
    pub fn element_position(&self, element: Element) -> Option<Point> {
        match element {
            Element::Background => Some(Point::default()),
            Element::Item(id) => self.item(id).map(|i| i.position),
            Element::Handle(id, end) => self.user_line(id).map(|l| {
                let p = match end {
                    HandleEnd::Start => l.start,
                    HandleEnd::End => l.end,
                };
                p.offset(-HANDLE_RADIUS)
            }),
        }
    }

    /// Every element that follows the canvas on rescale and grid snap.
    pub fn movable_elements(&self) -> Vec<Element> {
        let mut out: Vec<Element> = self.items.iter().map(|i| Element::Item(i.id)).collect();
        for line in &self.user_lines {
            out.push(Element::Handle(line.id, HandleEnd::Start));
            out.push(Element::Handle(line.id, HandleEnd::End));
        }
        out
    }

    pub fn next_id(&self) -> ItemId {
        let max_item = self.items.iter().map(|i| i.id.0).max().unwrap_or(0);
        let max_line = self.user_lines.iter().map(|l| l.id.0).max().unwrap_or(0);
        ItemId(max_item.max(max_line) + 1)
    }
}
