use crate::ir::{ItemId, ItemKind, Point, Size};

/// Page parameter routed by `ajax.php` to the visual console builder.
pub const BUILDER_PAGE: &str = "include/ajax/visual_console_builder.ajax";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Move,
    Delete,
    Copy,
    Load,
    GetFont,
    GetColorLine,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Move => "move",
            Action::Delete => "delete",
            Action::Copy => "copy",
            Action::Load => "load",
            Action::GetFont => "get_font",
            Action::GetColorLine => "get_color_line",
        }
    }
}

/// One form-encoded call to the builder endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub action: Action,
    pub console_id: Option<i64>,
    pub type_name: Option<String>,
    pub element: Option<ItemId>,
    pub fields: Vec<(String, String)>,
}

impl Request {
    fn new(action: Action, console_id: Option<i64>) -> Self {
        Self {
            action,
            console_id,
            type_name: None,
            element: None,
            fields: Vec::new(),
        }
    }

    fn with_type(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    fn with_element(mut self, id: ItemId) -> Self {
        self.element = Some(id);
        self
    }

    fn with_field(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn insert(console_id: i64, kind: ItemKind, fields: Vec<(String, String)>) -> Self {
        let mut req = Self::new(Action::Insert, Some(console_id)).with_type(kind.as_str());
        req.fields = fields;
        req
    }

    pub fn update(console_id: i64, type_name: &str, id: ItemId, fields: Vec<(String, String)>) -> Self {
        let mut req = Self::new(Action::Update, Some(console_id))
            .with_type(type_name)
            .with_element(id);
        req.fields = fields;
        req
    }

    /// Absolute position update after a drag, a rescale or a grid snap.
    pub fn move_to(console_id: i64, type_name: &str, id: ItemId, to: Point) -> Self {
        Self::new(Action::Move, Some(console_id))
            .with_type(type_name)
            .with_element(id)
            .with_field("top", to.y)
            .with_field("left", to.x)
    }

    pub fn resize_background(console_id: i64, size: Size) -> Self {
        Self::new(Action::Move, Some(console_id))
            .with_type("background")
            .with_element(ItemId(0))
            .with_field("width", size.width)
            .with_field("height", size.height)
    }

    pub fn delete(console_id: i64, id: ItemId) -> Self {
        Self::new(Action::Delete, Some(console_id)).with_element(id)
    }

    pub fn copy(console_id: i64, id: ItemId) -> Self {
        Self::new(Action::Copy, Some(console_id)).with_element(id)
    }

    pub fn load(console_id: i64, type_name: &str, id: ItemId) -> Self {
        Self::new(Action::Load, Some(console_id))
            .with_type(type_name)
            .with_element(id)
    }

    pub fn get_font(console_id: i64) -> Self {
        Self::new(Action::GetFont, Some(console_id))
    }

    pub fn color_line(id: ItemId) -> Self {
        Self::new(Action::GetColorLine, None).with_element(id)
    }

    /// Parameters in the order the endpoint expects them.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("page".to_string(), BUILDER_PAGE.to_string()),
            ("action".to_string(), self.action.as_str().to_string()),
        ];
        if let Some(id) = self.console_id {
            form.push(("id_visual_console".to_string(), id.to_string()));
        }
        if let Some(t) = &self.type_name {
            form.push(("type".to_string(), t.clone()));
        }
        if let Some(id) = self.element {
            form.push(("id_element".to_string(), id.to_string()));
        }
        form.extend(self.fields.iter().cloned());
        form
    }
}

#[cfg(test)]
impl Request {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
