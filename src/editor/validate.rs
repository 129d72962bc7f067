use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::{
    CanvasItem, ItemId, ItemKind, LabelPosition, PercentileStyle, Point, Size, MIN_CANVAS_HEIGHT, MIN_CANVAS_WIDTH,
};

/// Box size used when the form leaves it at zero.
const DEFAULT_BOX_SIZE: Size = Size {
    width: 300,
    height: 180,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Undefined {0}")]
    Missing(&'static str),

    #[error("A label or an image is required")]
    NoLabelNoImage,

    #[error("Min allowed size is 1024x768")]
    CanvasTooSmall,

    #[error("{count} joined graph items are {overflow} than background")]
    JoinedOverflow { count: u32, overflow: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinDirection {
    Horizontal,
    Vertical,
}

/// Field values of the creation/edit palette, named as the backend expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub label: Option<String>,
    pub image: Option<String>,
    pub left: Option<i32>,
    pub top: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Zero clears the parent.
    pub parent: Option<i64>,
    pub map_linked: Option<i64>,
    pub agent: Option<String>,
    pub id_agent: Option<i64>,
    pub module: Option<i64>,
    pub period: Option<u32>,
    pub process_simple_value: Option<i64>,
    pub max_percentile: Option<u32>,
    pub width_percentile: Option<u32>,
    pub height_percentile: Option<u32>,
    pub type_percentile: Option<PercentileStyle>,
    /// Zero is the "None" choice of the custom graph select.
    pub id_custom_graph: Option<i64>,
    pub width_module_graph: Option<u32>,
    pub height_module_graph: Option<u32>,
    pub width_box: Option<u32>,
    pub height_box: Option<u32>,
    pub border_color: Option<String>,
    pub border_width: Option<u32>,
    pub fill_color: Option<String>,
    pub line_width: Option<u32>,
    pub line_color: Option<String>,
    pub label_position: Option<LabelPosition>,
    pub background: Option<String>,
    /// Module graphs placed side by side as one block.
    pub joined_count: Option<u32>,
    pub joined_direction: Option<JoinDirection>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn filled(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn nonzero(v: Option<i64>) -> bool {
    v.is_some_and(|v| v != 0)
}

impl ItemForm {
    pub fn position(&self) -> Point {
        Point::new(self.left.unwrap_or(0), self.top.unwrap_or(0))
    }

    /// Form parameters for insert/update requests.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let value = serde_json::to_value(self).unwrap_or_default();
        let mut fields = Vec::new();
        if let serde_json::Value::Object(map) = value {
            for (k, v) in map {
                let s = match v {
                    serde_json::Value::Null => continue,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                fields.push((k, s));
            }
        }
        fields
    }

    /// Copy the fields the form carries onto an item, leaving the rest alone.
    pub fn apply_to(&self, item: &mut CanvasItem) {
        let size = match item.kind {
            ItemKind::Box => match (self.width_box, self.height_box) {
                (Some(0), _) | (_, Some(0)) => Some(Some(DEFAULT_BOX_SIZE)),
                (Some(w), Some(h)) => Some(Some(Size::new(w, h))),
                _ => None,
            },
            ItemKind::ModuleGraph => match (self.width_module_graph, self.height_module_graph) {
                (Some(w), Some(h)) => Some(Some(Size::new(w, h))),
                _ => None,
            },
            ItemKind::Percentile => self.width_percentile.map(|w| {
                let height = self.height_percentile.unwrap_or(item.effective_size().height);
                Some(Size::new(w, height))
            }),
            _ => match (self.width, self.height) {
                (Some(0), _) | (_, Some(0)) => Some(None),
                (Some(w), Some(h)) => Some(Some(Size::new(w, h))),
                _ => None,
            },
        };
        if let Some(size) = size {
            item.size = size;
        }

        if let Some(p) = self.parent {
            item.parent = (p != 0).then_some(ItemId(p));
        }

        let attrs = &mut item.attrs;
        if self.label.is_some() {
            attrs.label = self.label.clone();
        }
        if self.image.is_some() {
            attrs.image = self.image.clone();
        }
        if self.label_position.is_some() {
            attrs.label_position = self.label_position;
        }
        if self.agent.is_some() {
            attrs.agent = self.agent.clone();
        }
        if self.module.is_some() {
            attrs.module = self.module;
        }
        if self.period.is_some() {
            attrs.period = self.period;
        }
        if self.max_percentile.is_some() {
            attrs.max_percentile = self.max_percentile;
        }
        if self.type_percentile.is_some() {
            attrs.percentile_style = self.type_percentile;
        }
        if self.id_custom_graph.is_some() {
            attrs.custom_graph = self.id_custom_graph.filter(|g| *g != 0);
        }
        if self.fill_color.is_some() {
            attrs.fill_color = self.fill_color.clone();
        }
        if self.border_color.is_some() {
            attrs.border_color = self.border_color.clone();
        }
        if self.border_width.is_some() {
            attrs.border_width = self.border_width;
        }
        if self.map_linked.is_some() {
            attrs.map_linked = self.map_linked.filter(|m| *m != 0);
        }
    }
}

/// Checks run before an insert request is sent.
pub fn validate_create(kind: ItemKind, form: &ItemForm) -> Result<(), ValidationError> {
    match kind {
        ItemKind::Box => {
            form.width_box.ok_or(ValidationError::Missing("width"))?;
            form.height_box.ok_or(ValidationError::Missing("height"))?;
        }
        ItemKind::StaticGraph | ItemKind::Group => {
            form.width.ok_or(ValidationError::Missing("width"))?;
            form.height.ok_or(ValidationError::Missing("height"))?;
            if !filled(&form.label) && !filled(&form.image) {
                return Err(ValidationError::NoLabelNoImage);
            }
        }
        ItemKind::AutoSlaGraph | ItemKind::SimpleValue => require_agent_module(form)?,
        ItemKind::Label => {
            if !filled(&form.label) {
                return Err(ValidationError::Missing("label"));
            }
        }
        ItemKind::Icon => {
            form.width.ok_or(ValidationError::Missing("width"))?;
            form.height.ok_or(ValidationError::Missing("height"))?;
            if !filled(&form.image) {
                return Err(ValidationError::Missing("image"));
            }
        }
        ItemKind::Percentile => {
            form.width.ok_or(ValidationError::Missing("width"))?;
            require_agent_module(form)?;
            if form.max_percentile.map_or(true, |m| m == 0) {
                return Err(ValidationError::Missing("max percentile"));
            }
            if form.width_percentile.map_or(true, |w| w == 0) {
                return Err(ValidationError::Missing("percentile width"));
            }
        }
        ItemKind::ModuleGraph => {
            form.width_module_graph.ok_or(ValidationError::Missing("width"))?;
            form.height_module_graph.ok_or(ValidationError::Missing("height"))?;
            if !nonzero(form.id_custom_graph) {
                require_agent_module(form)?;
                if form.period.map_or(true, |p| p == 0) {
                    return Err(ValidationError::Missing("period"));
                }
            }
        }
        ItemKind::Line => {}
    }
    Ok(())
}

/// Checks run before an update request is sent for an existing item.
pub fn validate_update(kind: ItemKind, form: &ItemForm, canvas: Size) -> Result<(), ValidationError> {
    match kind {
        ItemKind::Box => {
            form.width_box.ok_or(ValidationError::Missing("width"))?;
            form.height_box.ok_or(ValidationError::Missing("height"))?;
        }
        ItemKind::StaticGraph | ItemKind::Group | ItemKind::Icon | ItemKind::AutoSlaGraph => {
            form.width.ok_or(ValidationError::Missing("width"))?;
            form.height.ok_or(ValidationError::Missing("height"))?;
        }
        ItemKind::Percentile => {
            form.width_percentile.ok_or(ValidationError::Missing("width"))?;
            form.height_percentile.ok_or(ValidationError::Missing("height"))?;
        }
        ItemKind::ModuleGraph => {
            check_joined(form, canvas)?;
            form.width_module_graph.ok_or(ValidationError::Missing("width"))?;
            form.height_module_graph.ok_or(ValidationError::Missing("height"))?;
            if form.id_custom_graph == Some(0) {
                return Err(ValidationError::Missing("graph"));
            }
        }
        ItemKind::Label | ItemKind::SimpleValue | ItemKind::Line => {}
    }
    Ok(())
}

/// Background edits must keep the minimum canvas size.
pub fn validate_background(form: &ItemForm) -> Result<Size, ValidationError> {
    let width = form.width.ok_or(ValidationError::Missing("width"))?;
    let height = form.height.ok_or(ValidationError::Missing("height"))?;
    if width < MIN_CANVAS_WIDTH || height < MIN_CANVAS_HEIGHT {
        return Err(ValidationError::CanvasTooSmall);
    }
    Ok(Size::new(width, height))
}

fn require_agent_module(form: &ItemForm) -> Result<(), ValidationError> {
    if !filled(&form.agent) {
        return Err(ValidationError::Missing("agent"));
    }
    if !nonzero(form.module) {
        return Err(ValidationError::Missing("module"));
    }
    Ok(())
}

fn check_joined(form: &ItemForm, canvas: Size) -> Result<(), ValidationError> {
    let (Some(count), Some(direction)) = (form.joined_count, form.joined_direction) else {
        return Ok(());
    };
    let width = form.width_module_graph.unwrap_or(0);
    let height = form.height_module_graph.unwrap_or(0);
    match direction {
        JoinDirection::Horizontal => {
            let right = form.left.unwrap_or(0) as i64 + width as i64 * count as i64;
            if right > canvas.width as i64 {
                return Err(ValidationError::JoinedOverflow {
                    count,
                    overflow: "wider",
                });
            }
        }
        JoinDirection::Vertical => {
            let bottom = form.top.unwrap_or(0) as i64 + height as i64 * count as i64;
            if bottom > canvas.height as i64 {
                return Err(ValidationError::JoinedOverflow {
                    count,
                    overflow: "higher",
                });
            }
        }
    }
    Ok(())
}
