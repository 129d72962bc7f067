use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::hooks::{EditorHooks, NoHooks};
use super::parents::ParentCandidates;
use super::toolbox::{enabled_buttons, ToolButton};
use super::validate::{validate_background, validate_create, validate_update, ItemForm};
use crate::backend::{value_as_i64, Backend, PendingQueue, Request, SaveReport};
use crate::config::EditorConfig;
use crate::error::AppError;
use crate::ir::{
    CanvasItem, Element, HandleEnd, ItemId, ItemKind, Point, Size, UserLine, VisualConsole, HANDLE_RADIUS,
};
use crate::layout::{clamp_canvas, plan_rescale, plan_snap, snap_point, Move, GRID_SIZE};
use crate::lines::{self, LineSet, Segment, Surface, DEFAULT_LINE_COLOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Background,
    Item(ItemId, ItemKind),
    Handle(ItemId, HandleEnd),
}

impl Selection {
    pub fn element(self) -> Element {
        match self {
            Selection::Background => Element::Background,
            Selection::Item(id, _) => Element::Item(id),
            Selection::Handle(id, end) => Element::Handle(id, end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Create(ItemKind),
    Edit(Selection),
}

/// Steps of drawing a new user line: one canvas click for each end.
#[derive(Debug, Clone)]
pub enum LineStep {
    AwaitStart {
        form: ItemForm,
        cursor: Option<Point>,
    },
    AwaitEnd {
        form: ItemForm,
        start: Point,
        cursor: Option<Point>,
    },
}

#[derive(Debug, Clone)]
pub enum Mode {
    Idle,
    Selected(Selection),
    PaletteOpen(Palette),
    CreatingLine(LineStep),
}

/// Moves that went through and moves that failed during a rescale or snap.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub moved: Vec<Element>,
    pub failed: Vec<(Element, AppError)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct ResizeOutcome {
    pub size: Size,
    /// The requested size was below the minimum; items were left in place.
    pub clamped: bool,
    pub report: BatchReport,
}

/// Editing state of one visual console.
pub struct EditorSession<B: Backend, S: Surface, H: EditorHooks = NoHooks> {
    console: VisualConsole,
    lines: LineSet,
    parents: ParentCandidates,
    mode: Mode,
    autosave: bool,
    grid_visible: bool,
    grid_size: u32,
    queue: PendingQueue,
    backend: B,
    surface: S,
    hooks: H,
}

impl<B: Backend, S: Surface> EditorSession<B, S, NoHooks> {
    pub fn new(console: VisualConsole, backend: B, surface: S) -> Self {
        Self::with_hooks(console, backend, surface, NoHooks)
    }
}

impl<B: Backend, S: Surface, H: EditorHooks> EditorSession<B, S, H> {
    pub fn with_hooks(console: VisualConsole, backend: B, surface: S, hooks: H) -> Self {
        let lines = LineSet::from_console(&console);
        let parents = ParentCandidates::from_console(&console);
        let mut session = Self {
            console,
            lines,
            parents,
            mode: Mode::Idle,
            autosave: true,
            grid_visible: false,
            grid_size: GRID_SIZE,
            queue: PendingQueue::default(),
            backend,
            surface,
            hooks,
        };
        session.refresh();
        session
    }

    pub fn configure(&mut self, config: &EditorConfig) {
        self.autosave = config.autosave;
        self.grid_size = config.grid_size.max(1);
    }

    pub fn console(&self) -> &VisualConsole {
        &self.console
    }

    pub fn set_parents(&mut self, parents: ParentCandidates) {
        self.parents = parents;
    }

    /// Parent choices for the open palette; an edited item cannot parent itself.
    pub fn parent_options(&self) -> Vec<(ItemId, &str)> {
        let editing = match self.mode {
            Mode::PaletteOpen(Palette::Edit(Selection::Item(id, _))) => Some(id),
            _ => None,
        };
        self.parents.options_for(editing)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn toolbox(&self) -> BTreeSet<ToolButton> {
        let mut enabled = enabled_buttons(&self.mode, self.autosave);
        self.hooks.toolbox(&mut enabled);
        enabled
    }

    /// System font configured for the console labels.
    pub fn font(&mut self) -> Result<Option<String>, AppError> {
        let resp = self.backend.send(&Request::get_font(self.console.id))?;
        Ok(resp.font().map(str::to_string))
    }

    fn ensure_free(&self, what: &str) -> Result<(), AppError> {
        match self.mode {
            Mode::PaletteOpen(_) | Mode::CreatingLine(_) => Err(AppError::InvalidState(format!(
                "{} while a palette or line drawing is active",
                what
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_autosave(&self, what: &str) -> Result<(), AppError> {
        if self.autosave {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!("{} requires autosave", what)))
        }
    }

    fn selection_for(&self, element: Element) -> Result<Selection, AppError> {
        match element {
            Element::Background => Ok(Selection::Background),
            Element::Item(id) => self
                .console
                .item(id)
                .map(|i| Selection::Item(id, i.kind))
                .ok_or(AppError::UnknownItem(id)),
            Element::Handle(id, end) => self
                .console
                .user_line(id)
                .map(|_| Selection::Handle(id, end))
                .ok_or(AppError::UnknownItem(id)),
        }
    }

    pub fn select(&mut self, element: Element) -> Result<Selection, AppError> {
        self.ensure_free("select")?;
        let selection = self.selection_for(element)?;
        self.mode = Mode::Selected(selection);
        self.hooks.item_selected(selection);
        debug!(%element, "selected");
        Ok(selection)
    }

    pub fn unselect_all(&mut self) {
        if let Mode::Selected(_) = self.mode {
            self.mode = Mode::Idle;
        }
    }

    pub fn open_create_palette(&mut self, kind: ItemKind) -> Result<(), AppError> {
        self.ensure_free("create")?;
        self.ensure_autosave("create")?;
        self.mode = Mode::PaletteOpen(Palette::Create(kind));
        Ok(())
    }

    /// Open the edit palette for the selection and return the stored field
    /// values reported by the backend.
    pub fn open_edit_palette(&mut self) -> Result<Map<String, Value>, AppError> {
        self.ensure_autosave("edit")?;
        let Mode::Selected(selection) = self.mode else {
            return Err(AppError::InvalidState("edit without a selection".into()));
        };

        let element = selection.element();
        let type_name = self
            .console
            .type_name(element)
            .ok_or(AppError::UnknownItem(element.id()))?;
        let resp = self
            .backend
            .send(&Request::load(self.console.id, type_name, element.id()))?
            .ensure_correct("load", element.id())?;

        self.mode = Mode::PaletteOpen(Palette::Edit(selection));
        Ok(resp.extra)
    }

    pub fn cancel_palette(&mut self) {
        self.mode = match self.mode {
            Mode::PaletteOpen(Palette::Edit(sel)) => Mode::Selected(sel),
            Mode::PaletteOpen(Palette::Create(_)) | Mode::CreatingLine(_) => Mode::Idle,
            ref other => other.clone(),
        };
        self.refresh();
    }

    /// Commit the creation palette. Line items go on to the two-click drawing
    /// step and return `None`; every other kind is inserted right away.
    pub fn commit_create(&mut self, mut form: ItemForm) -> Result<Option<ItemId>, AppError> {
        let Mode::PaletteOpen(Palette::Create(kind)) = self.mode else {
            return Err(AppError::InvalidState("no creation palette open".into()));
        };

        self.hooks.read_fields(&mut form);
        validate_create(kind, &form)?;
        self.hooks.validate(kind, &form)?;

        if kind == ItemKind::Line {
            self.mode = Mode::CreatingLine(LineStep::AwaitStart { form, cursor: None });
            return Ok(None);
        }

        let id = self.insert_item(kind, &form)?;
        self.mode = Mode::Idle;
        self.refresh();
        Ok(Some(id))
    }

    fn insert_item(&mut self, kind: ItemKind, form: &ItemForm) -> Result<ItemId, AppError> {
        let req = Request::insert(self.console.id, kind, form.to_fields());
        let resp = self.backend.send(&req)?.ensure_correct("insert", ItemId(0))?;
        let id = resp
            .id_data()
            .ok_or_else(|| AppError::Transport("insert reply without id_data".into()))?;

        let mut item = CanvasItem::new(id, kind, form.position());
        form.apply_to(&mut item);
        let parent = item.parent;
        let text = resp
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", kind, id));
        self.console.items.push(item);
        self.parents.insert(id, text);

        if let Some(parent) = parent {
            self.attach_line(id, parent);
        }

        info!(%id, kind = kind.as_str(), "item created");
        Ok(id)
    }

    /// Track the cursor while drawing a line; once the start is fixed the
    /// surface shows a preview segment.
    pub fn line_pointer(&mut self, p: Point) {
        match &mut self.mode {
            Mode::CreatingLine(LineStep::AwaitStart { cursor, .. })
            | Mode::CreatingLine(LineStep::AwaitEnd { cursor, .. }) => *cursor = Some(p),
            _ => return,
        }
        self.refresh();
    }

    /// Canvas click while drawing a line. The first click fixes the start,
    /// the second inserts the line and returns its id.
    pub fn line_click(&mut self, p: Point) -> Result<Option<ItemId>, AppError> {
        let step = match std::mem::replace(&mut self.mode, Mode::Idle) {
            Mode::CreatingLine(step) => step,
            other => {
                self.mode = other;
                return Err(AppError::InvalidState("not drawing a line".into()));
            }
        };

        match step {
            LineStep::AwaitStart { form, .. } => {
                self.mode = Mode::CreatingLine(LineStep::AwaitEnd {
                    form,
                    start: p,
                    cursor: None,
                });
                Ok(None)
            }
            LineStep::AwaitEnd { form, start, .. } => match self.insert_line(&form, start, p) {
                Ok(id) => {
                    self.refresh();
                    Ok(Some(id))
                }
                Err(e) => {
                    self.mode = Mode::CreatingLine(LineStep::AwaitEnd {
                        form,
                        start,
                        cursor: Some(p),
                    });
                    Err(e)
                }
            },
        }
    }

    fn insert_line(&mut self, form: &ItemForm, start: Point, end: Point) -> Result<ItemId, AppError> {
        let mut fields = form.to_fields();
        fields.push(("line_start_x".into(), start.x.to_string()));
        fields.push(("line_start_y".into(), start.y.to_string()));
        fields.push(("line_end_x".into(), end.x.to_string()));
        fields.push(("line_end_y".into(), end.y.to_string()));

        let req = Request::insert(self.console.id, ItemKind::Line, fields);
        let resp = self.backend.send(&req)?.ensure_correct("insert", ItemId(0))?;
        let id = resp
            .id_data()
            .ok_or_else(|| AppError::Transport("insert reply without id_data".into()))?;

        self.console.user_lines.push(UserLine {
            id,
            line_width: form.line_width.unwrap_or(1),
            line_color: form.line_color.clone().unwrap_or_else(|| "#000000".to_string()),
            start,
            end,
        });
        info!(%id, "line created");
        Ok(id)
    }

    fn line_preview(&self) -> Option<Segment> {
        match &self.mode {
            Mode::CreatingLine(LineStep::AwaitEnd {
                form,
                start,
                cursor: Some(cursor),
            }) => Some(Segment {
                from: *start,
                to: *cursor,
                color: form.line_color.clone().unwrap_or_else(|| "#000000".to_string()),
                width: form.line_width.unwrap_or(1),
            }),
            _ => None,
        }
    }

    pub fn commit_update(&mut self, mut form: ItemForm) -> Result<(), AppError> {
        let Mode::PaletteOpen(Palette::Edit(selection)) = self.mode else {
            return Err(AppError::InvalidState("no edit palette open".into()));
        };

        self.hooks.read_fields(&mut form);

        match selection {
            Selection::Background => {
                let size = validate_background(&form)?;
                let req = Request::update(self.console.id, "background", ItemId(0), form.to_fields());
                self.backend.send(&req)?.ensure_correct("update", ItemId(0))?;
                self.console.canvas.width = size.width;
                self.console.canvas.height = size.height;
                if form.background.is_some() {
                    self.console.canvas.background = form.background.clone();
                }
            }
            Selection::Item(id, kind) => {
                validate_update(kind, &form, self.console.canvas.size())?;
                self.hooks.validate(kind, &form)?;
                let req = Request::update(self.console.id, kind.as_str(), id, form.to_fields());
                self.backend.send(&req)?.ensure_correct("update", id)?;

                let item = self.console.item_mut(id).ok_or(AppError::UnknownItem(id))?;
                form.apply_to(item);
                if let Some(label) = &form.label {
                    self.parents.insert(id, label.clone());
                }
                self.sync_parent_line(id, form.parent);
            }
            Selection::Handle(id, end) => {
                let req = Request::update(self.console.id, end.as_str(), id, form.to_fields());
                self.backend.send(&req)?.ensure_correct("update", id)?;

                let line = self.console.user_line_mut(id).ok_or(AppError::UnknownItem(id))?;
                if let Some(w) = form.line_width {
                    line.line_width = w;
                }
                if let Some(c) = &form.line_color {
                    line.line_color = c.clone();
                }
            }
        }

        self.mode = Mode::Selected(selection);
        self.refresh();
        Ok(())
    }

    fn sync_parent_line(&mut self, child: ItemId, parent: Option<i64>) {
        match parent {
            None => {}
            Some(0) => {
                if self.lines.remove_child(child).is_some() {
                    debug!(%child, "connector removed");
                }
                self.console.line_colors.remove(&child.to_string());
            }
            Some(p) => {
                if !self.lines.reparent(child, ItemId(p)) {
                    self.attach_line(child, ItemId(p));
                }
            }
        }
    }

    fn attach_line(&mut self, child: ItemId, parent: ItemId) {
        let color = self.lookup_line_color(child);
        self.console.line_colors.insert(child.to_string(), color.clone());
        self.lines.upsert(child, parent, color);
    }

    fn lookup_line_color(&mut self, child: ItemId) -> String {
        match self.backend.send(&Request::color_line(child)) {
            Ok(resp) if resp.correct => resp
                .color_line()
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_LINE_COLOR.to_string()),
            Ok(_) => DEFAULT_LINE_COLOR.to_string(),
            Err(e) => {
                debug!(%child, error = %e, "line color lookup failed");
                DEFAULT_LINE_COLOR.to_string()
            }
        }
    }

    /// Keep an element inside the canvas.
    fn contain(&self, element: Element, to: Point) -> Point {
        let size = match element {
            Element::Item(id) => self.console.item(id).map(|i| i.effective_size()),
            Element::Handle(..) => Some(Size::new(2 * HANDLE_RADIUS as u32, 2 * HANDLE_RADIUS as u32)),
            Element::Background => None,
        }
        .unwrap_or(Size::new(0, 0));

        let max_x = i32::try_from(self.console.canvas.width.saturating_sub(size.width)).unwrap_or(i32::MAX);
        let max_y = i32::try_from(self.console.canvas.height.saturating_sub(size.height)).unwrap_or(i32::MAX);
        Point::new(to.x.clamp(0, max_x), to.y.clamp(0, max_y))
    }

    fn send_move(&mut self, m: Move) -> Result<(), AppError> {
        let id = m.element.id();
        let type_name = self.console.type_name(m.element).ok_or(AppError::UnknownItem(id))?;

        // The backend stores line endpoints, not handle corners.
        let stored = match m.element {
            Element::Handle(..) => m.to.offset(HANDLE_RADIUS),
            _ => m.to,
        };
        let req = Request::move_to(self.console.id, type_name, id, stored);

        if self.autosave {
            self.backend.send(&req)?.ensure_correct("move", id)?;
        } else {
            self.queue.push(req);
        }

        self.apply_move(m);
        Ok(())
    }

    fn apply_move(&mut self, m: Move) {
        match m.element {
            Element::Item(id) => {
                if let Some(item) = self.console.item_mut(id) {
                    item.position = m.to;
                }
            }
            Element::Handle(id, end) => {
                lines::move_handle(&mut self.console.user_lines, id, end, m.to);
            }
            Element::Background => {}
        }
    }

    fn run_moves(&mut self, moves: Vec<Move>) -> BatchReport {
        let mut report = BatchReport::default();
        for m in moves {
            match self.send_move(m) {
                Ok(()) => report.moved.push(m.element),
                Err(e) => {
                    warn!(element = %m.element, error = %e, "position update failed");
                    report.failed.push((m.element, e));
                }
            }
        }
        self.refresh();
        report
    }

    /// Drop an element at a new position after a drag.
    pub fn drag(&mut self, element: Element, to: Point) -> Result<(), AppError> {
        self.ensure_free("drag")?;
        if element == Element::Background {
            return Err(AppError::InvalidState("the background cannot be dragged".into()));
        }
        let selection = self.selection_for(element)?;
        self.mode = Mode::Selected(selection);

        let mut to = self.contain(element, to);
        if self.grid_visible {
            to = snap_point(to, self.grid_size);
        }

        let result = self.send_move(Move { element, to });
        self.refresh();
        result
    }

    /// Follow a handle while it is being dragged, without persisting.
    pub fn drag_handle_live(&mut self, id: ItemId, end: HandleEnd, to: Point) -> Result<(), AppError> {
        if !lines::move_handle(&mut self.console.user_lines, id, end, to) {
            return Err(AppError::UnknownItem(id));
        }
        self.refresh();
        Ok(())
    }

    /// Resize the canvas. Below the minimum the size is clamped and only the
    /// background is stored; otherwise every element is rescaled with it.
    pub fn resize_canvas(&mut self, requested: Size) -> Result<ResizeOutcome, AppError> {
        self.ensure_free("resize")?;
        self.unselect_all();

        let original = self.console.canvas.size();
        let (size, clamped) = clamp_canvas(requested);
        let moves = if clamped {
            Vec::new()
        } else {
            plan_rescale(&self.console, original, size)?
        };

        let req = Request::resize_background(self.console.id, size);
        if self.autosave {
            self.backend.send(&req)?.ensure_correct("move", ItemId(0))?;
        } else {
            self.queue.push(req);
        }
        self.console.canvas.width = size.width;
        self.console.canvas.height = size.height;

        if clamped {
            warn!(width = requested.width, height = requested.height, "canvas below minimum, clamped");
        } else {
            info!(from = ?original, to = ?size, "canvas resized");
        }

        let report = self.run_moves(moves);
        Ok(ResizeOutcome { size, clamped, report })
    }

    /// Show or hide the grid. Showing it snaps every element onto it.
    pub fn toggle_grid(&mut self) -> Result<Option<BatchReport>, AppError> {
        self.ensure_autosave("show grid")?;
        if !matches!(self.mode, Mode::Selected(Selection::Background)) {
            return Err(AppError::InvalidState("grid is toggled from the background".into()));
        }

        if self.grid_visible {
            self.grid_visible = false;
            return Ok(None);
        }

        self.grid_visible = true;
        let moves = plan_snap(&self.console, self.grid_size);
        Ok(Some(self.run_moves(moves)))
    }

    pub fn copy_selected(&mut self) -> Result<ItemId, AppError> {
        self.ensure_autosave("copy")?;
        let Mode::Selected(Selection::Item(source_id, _)) = self.mode else {
            return Err(AppError::InvalidState("copy needs a selected item".into()));
        };
        let source = self
            .console
            .item(source_id)
            .cloned()
            .ok_or(AppError::UnknownItem(source_id))?;

        let resp = self
            .backend
            .send(&Request::copy(self.console.id, source_id))?
            .ensure_correct("copy", source_id)?;
        let id = resp
            .id_data()
            .ok_or_else(|| AppError::Transport("copy reply without id_data".into()))?;

        let mut item = source;
        item.id = id;
        if let Some(kind) = resp.item_kind() {
            item.kind = kind;
        }
        if let Some(values) = resp.values() {
            let get = |k: &str| values.get(k).and_then(value_as_i64);
            if let (Some(x), Some(y)) = (get("left"), get("top")) {
                item.position = Point::new(x as i32, y as i32);
            }
            if let Some(p) = get("parent") {
                item.parent = (p != 0).then_some(ItemId(p));
            }
        }

        let parent = item.parent;
        let text = resp
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", item.kind, id));
        self.console.items.push(item);
        self.parents.insert(id, text);
        if let Some(parent) = parent {
            self.attach_line(id, parent);
        }

        info!(from = %source_id, to = %id, "item copied");
        self.refresh();
        Ok(id)
    }

    pub fn delete_selected(&mut self) -> Result<ItemId, AppError> {
        self.ensure_autosave("delete")?;
        let id = match self.mode {
            Mode::Selected(Selection::Item(id, _)) | Mode::Selected(Selection::Handle(id, _)) => id,
            _ => return Err(AppError::InvalidState("delete needs a selected item".into())),
        };

        self.backend
            .send(&Request::delete(self.console.id, id))?
            .ensure_correct("delete", id)?;

        self.parents.remove(id);
        let removed = self.lines.remove_for_deleted(id);
        for item in self.console.items.iter_mut().filter(|i| i.parent == Some(id)) {
            item.parent = None;
            self.console.line_colors.remove(&item.id.to_string());
        }
        self.console.line_colors.remove(&id.to_string());
        self.console.user_lines.retain(|l| l.id != id);
        self.console.items.retain(|i| i.id != id);

        info!(%id, connectors_removed = removed, "item deleted");
        self.mode = Mode::Idle;
        self.refresh();
        Ok(id)
    }

    pub fn set_autosave(&mut self, on: bool) {
        if self.autosave != on {
            info!(autosave = on, pending = self.queue.len(), "autosave toggled");
        }
        self.autosave = on;
    }

    /// Send every queued change. One aggregate flag covers the batch.
    pub fn save(&mut self) -> SaveReport {
        self.queue.flush(&mut self.backend)
    }

    fn refresh(&mut self) {
        let preview = self.line_preview();
        lines::redraw(&mut self.surface, &self.console, &self.lines, preview.as_ref());
    }
}

#[cfg(test)]
impl<B: Backend, S: Surface, H: EditorHooks> EditorSession<B, S, H> {
    pub fn lines(&self) -> &LineSet {
        &self.lines
    }

    pub fn parents(&self) -> &ParentCandidates {
        &self.parents
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn autosave(&self) -> bool {
        self.autosave
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Action, LocalBackend, Response};
    use crate::editor::validate::ValidationError;
    use crate::ir::Canvas;
    use crate::lines::RecordingSurface;

    /// Records requests; rejects moves of listed elements and answers color
    /// lookups with a fixed color.
    #[derive(Default)]
    struct ScriptedBackend {
        sent: Vec<Request>,
        reject_moves: Vec<ItemId>,
        next_id: i64,
    }

    impl Backend for ScriptedBackend {
        fn send(&mut self, request: &Request) -> Result<Response, AppError> {
            self.sent.push(request.clone());
            let resp = match request.action {
                Action::Move if request.element.is_some_and(|e| self.reject_moves.contains(&e)) => {
                    return Err(AppError::Transport("timeout".into()));
                }
                Action::Insert | Action::Copy => {
                    self.next_id += 1;
                    Response::ok().with("id_data", 100 + self.next_id).with("text", "New")
                }
                Action::GetColorLine => Response::ok().with("color_line", "#00ff00"),
                Action::Load => Response::ok().with("label", "Core router"),
                _ => Response::ok(),
            };
            Ok(resp)
        }
    }

    type Session = EditorSession<ScriptedBackend, RecordingSurface>;

    fn console() -> VisualConsole {
        let mut console = VisualConsole::new(
            7,
            Canvas {
                width: 1024,
                height: 768,
                background: None,
            },
        );
        let mut a = CanvasItem::new(ItemId(1), ItemKind::Box, Point::new(512, 384));
        a.size = Some(Size::new(20, 20));
        let mut b = CanvasItem::new(ItemId(2), ItemKind::Icon, Point::new(100, 100));
        b.parent = Some(ItemId(1));
        console.items = vec![a, b];
        console.user_lines.push(UserLine {
            id: ItemId(3),
            line_width: 2,
            line_color: "#ff0000".into(),
            start: Point::new(206, 206),
            end: Point::new(306, 206),
        });
        console
    }

    fn session() -> Session {
        EditorSession::new(console(), ScriptedBackend::default(), RecordingSurface::default())
    }

    fn moves_sent(s: &Session) -> Vec<&Request> {
        s.backend().sent.iter().filter(|r| r.action == Action::Move).collect()
    }

    #[test]
    fn test_new_session_draws_existing_lines() {
        let s = session();
        assert_eq!(s.lines().len(), 1);
        assert_eq!(s.surface().segments.len(), 2);
        assert_eq!(s.parents().len(), 2);
    }

    #[test]
    fn test_resize_rescales_every_element() {
        let mut s = session();
        let outcome = s.resize_canvas(Size::new(1024, 1536)).unwrap();

        assert!(!outcome.clamped);
        assert!(outcome.report.is_complete());
        assert_eq!(outcome.report.moved.len(), 4);
        assert_eq!(s.console().item(ItemId(1)).unwrap().position, Point::new(512, 768));
        assert_eq!(s.console().item(ItemId(2)).unwrap().position, Point::new(100, 200));
        // Handle corner (200, 200) -> (200, 400), endpoint one radius further.
        assert_eq!(s.console().user_line(ItemId(3)).unwrap().start, Point::new(206, 406));
        assert_eq!(s.console().canvas.height, 1536);

        let moves = moves_sent(&s);
        assert_eq!(moves.len(), 5);
        assert_eq!(moves[0].type_name.as_deref(), Some("background"));
        let handle = moves.iter().find(|r| r.type_name.as_deref() == Some("handler_start")).unwrap();
        assert_eq!(handle.field("top"), Some("406"));
        assert_eq!(handle.field("left"), Some("206"));
    }

    #[test]
    fn test_resize_below_minimum_is_clamped_without_rescale() {
        let mut s = session();
        let outcome = s.resize_canvas(Size::new(800, 900)).unwrap();
        assert!(outcome.clamped);
        assert_eq!(outcome.size, Size::new(1024, 900));
        assert!(outcome.report.moved.is_empty());
        assert_eq!(s.console().item(ItemId(1)).unwrap().position, Point::new(512, 384));
        assert_eq!(moves_sent(&s).len(), 1);
    }

    #[test]
    fn test_failed_move_does_not_block_others() {
        let mut s = session();
        s.backend.reject_moves.push(ItemId(1));
        let outcome = s.resize_canvas(Size::new(2048, 1536)).unwrap();

        assert_eq!(outcome.report.failed.len(), 1);
        assert_eq!(outcome.report.failed[0].0, Element::Item(ItemId(1)));
        assert_eq!(outcome.report.moved.len(), 3);
        assert_eq!(s.console().item(ItemId(1)).unwrap().position, Point::new(512, 384));
        assert_eq!(s.console().item(ItemId(2)).unwrap().position, Point::new(200, 200));
    }

    #[test]
    fn test_grid_snap_from_background() {
        let mut s = session();
        s.console.item_mut(ItemId(1)).unwrap().position = Point::new(517, 769 - 400);
        assert!(s.toggle_grid().is_err());

        s.select(Element::Background).unwrap();
        let report = s.toggle_grid().unwrap().unwrap();
        assert!(report.is_complete());
        assert!(s.grid_visible());
        assert_eq!(s.console().item(ItemId(1)).unwrap().position, Point::new(512, 368));

        let before = s.console().items.clone();
        assert!(s.toggle_grid().unwrap().is_none());
        assert_eq!(s.console().items, before);
    }

    #[test]
    fn test_drag_snaps_while_grid_visible_and_stays_inside() {
        let mut s = session();
        s.select(Element::Background).unwrap();
        s.toggle_grid().unwrap();

        s.drag(Element::Item(ItemId(2)), Point::new(37, 70)).unwrap();
        assert_eq!(s.console().item(ItemId(2)).unwrap().position, Point::new(32, 64));
        assert!(matches!(s.mode(), Mode::Selected(Selection::Item(id, _)) if *id == ItemId(2)));

        s.drag(Element::Item(ItemId(2)), Point::new(5000, -20)).unwrap();
        assert_eq!(s.console().item(ItemId(2)).unwrap().position, Point::new(944, 0));
    }

    #[test]
    fn test_drag_on_canvas_wider_than_i32() {
        let mut s = session();
        s.console.canvas.width = 3_000_000_000;

        s.drag(Element::Item(ItemId(2)), Point::new(20, 20)).unwrap();
        assert_eq!(s.console().item(ItemId(2)).unwrap().position, Point::new(20, 20));

        s.drag(Element::Item(ItemId(2)), Point::new(2_000_000_000, 5000)).unwrap();
        assert_eq!(s.console().item(ItemId(2)).unwrap().position, Point::new(2_000_000_000, 698));
    }

    #[test]
    fn test_drag_handle_moves_line_end() {
        let mut s = session();
        s.drag(Element::Handle(ItemId(3), HandleEnd::End), Point::new(400, 300)).unwrap();
        let line = s.console().user_line(ItemId(3)).unwrap();
        assert_eq!(line.end, Point::new(406, 306));
        assert_eq!(line.start, Point::new(206, 206));
        let last = s.backend().sent.last().unwrap();
        assert_eq!(last.type_name.as_deref(), Some("handler_end"));
        assert_eq!(last.field("left"), Some("406"));
    }

    #[test]
    fn test_create_with_parent_draws_colored_line() {
        let mut s = session();
        s.open_create_palette(ItemKind::Label).unwrap();
        let id = s
            .commit_create(ItemForm {
                label: Some("Uplink".into()),
                left: Some(50),
                top: Some(60),
                parent: Some(1),
                ..ItemForm::default()
            })
            .unwrap()
            .unwrap();

        assert!(matches!(s.mode(), Mode::Idle));
        assert_eq!(s.console().item(id).unwrap().position, Point::new(50, 60));
        let line = s.lines().get(id).unwrap();
        assert_eq!(line.node_begin, ItemId(1));
        assert_eq!(line.color, "#00ff00");
        assert!(s.parents().contains(id));
        assert_eq!(s.surface().segments.len(), 3);
    }

    #[test]
    fn test_create_validation_sends_nothing() {
        let mut s = session();
        s.open_create_palette(ItemKind::Label).unwrap();
        let err = s.commit_create(ItemForm::default()).unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::Missing("label"))));
        assert!(s.backend().sent.is_empty());
        assert!(matches!(s.mode(), Mode::PaletteOpen(_)));
    }

    #[test]
    fn test_line_creation_takes_two_clicks() {
        let mut s = session();
        s.open_create_palette(ItemKind::Line).unwrap();
        let form = ItemForm {
            line_width: Some(4),
            line_color: Some("#0000ff".into()),
            ..ItemForm::default()
        };
        assert_eq!(s.commit_create(form).unwrap(), None);
        assert!(matches!(s.mode(), Mode::CreatingLine(LineStep::AwaitStart { .. })));
        assert!(s.toolbox().is_empty());
        assert!(s.drag(Element::Item(ItemId(1)), Point::new(0, 0)).is_err());

        assert_eq!(s.line_click(Point::new(10, 20)).unwrap(), None);
        s.line_pointer(Point::new(90, 80));
        let preview = s.surface().segments.last().unwrap();
        assert_eq!(preview.from, Point::new(10, 20));
        assert_eq!(preview.to, Point::new(90, 80));

        let id = s.line_click(Point::new(100, 120)).unwrap().unwrap();
        assert!(matches!(s.mode(), Mode::Idle));
        let line = s.console().user_line(id).unwrap();
        assert_eq!((line.start, line.end), (Point::new(10, 20), Point::new(100, 120)));
        assert_eq!(line.line_width, 4);

        let insert = s.backend().sent.last().unwrap();
        assert_eq!(insert.type_name.as_deref(), Some("line_item"));
        assert_eq!(insert.field("line_end_y"), Some("120"));
    }

    #[test]
    fn test_update_clearing_parent_removes_line() {
        let mut s = session();
        s.select(Element::Item(ItemId(2))).unwrap();
        let loaded = s.open_edit_palette().unwrap();
        assert_eq!(loaded.get("label").and_then(Value::as_str), Some("Core router"));

        s.commit_update(ItemForm {
            width: Some(0),
            height: Some(0),
            parent: Some(0),
            ..ItemForm::default()
        })
        .unwrap();

        assert!(s.lines().is_empty());
        assert_eq!(s.console().item(ItemId(2)).unwrap().parent, None);
        let child_center = s.console().item(ItemId(2)).unwrap().center();
        assert!(s
            .surface()
            .segments
            .iter()
            .all(|seg| seg.from != child_center && seg.to != child_center));
        assert!(matches!(s.mode(), Mode::Selected(_)));
    }

    #[test]
    fn test_update_reparents_existing_line() {
        let mut console = console();
        console
            .items
            .push(CanvasItem::new(ItemId(4), ItemKind::Label, Point::new(700, 10)));
        let mut s = EditorSession::new(console, ScriptedBackend::default(), RecordingSurface::default());
        s.select(Element::Item(ItemId(2))).unwrap();
        s.open_edit_palette().unwrap();
        s.commit_update(ItemForm {
            width: Some(0),
            height: Some(0),
            parent: Some(4),
            ..ItemForm::default()
        })
        .unwrap();
        assert_eq!(s.lines().len(), 1);
        assert_eq!(s.lines().get(ItemId(2)).unwrap().node_begin, ItemId(4));
    }

    #[test]
    fn test_delete_parent_removes_anchored_lines() {
        let mut s = session();
        s.select(Element::Item(ItemId(1))).unwrap();
        assert_eq!(s.delete_selected().unwrap(), ItemId(1));
        assert!(s.lines().is_empty());
        assert!(s.console().item(ItemId(1)).is_none());
        assert_eq!(s.console().item(ItemId(2)).unwrap().parent, None);
        assert!(!s.parents().contains(ItemId(1)));
        assert!(matches!(s.mode(), Mode::Idle));
    }

    #[test]
    fn test_delete_line_handle_removes_user_line() {
        let mut s = session();
        s.select(Element::Handle(ItemId(3), HandleEnd::Start)).unwrap();
        s.delete_selected().unwrap();
        assert!(s.console().user_lines.is_empty());
        assert_eq!(s.surface().segments.len(), 1);
    }

    #[test]
    fn test_copy_uses_reply_position() {
        let mut s = session();
        s.select(Element::Item(ItemId(2))).unwrap();
        let id = s.copy_selected().unwrap();
        let copy = s.console().item(id).unwrap();
        assert_eq!(copy.kind, ItemKind::Icon);
        assert_eq!(copy.position, Point::new(100, 100));
        assert_eq!(s.lines().len(), 2);
    }

    #[test]
    fn test_manual_save_queues_moves() {
        let mut s = session();
        s.set_autosave(false);
        s.drag(Element::Item(ItemId(2)), Point::new(300, 300)).unwrap();
        s.drag(Element::Item(ItemId(1)), Point::new(10, 10)).unwrap();

        assert_eq!(s.pending(), 2);
        assert!(s.backend().sent.is_empty());
        assert_eq!(s.console().item(ItemId(2)).unwrap().position, Point::new(300, 300));
        assert!(s.copy_selected().is_err());
        assert!(s.toolbox().contains(&ToolButton::Save));

        s.backend.reject_moves.push(ItemId(2));
        let report = s.save();
        assert_eq!(report.sent, 2);
        assert!(!report.success());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn test_palette_blocks_selection_and_resize() {
        let mut s = session();
        s.open_create_palette(ItemKind::Icon).unwrap();
        assert!(s.select(Element::Item(ItemId(1))).is_err());
        assert!(s.resize_canvas(Size::new(2048, 1536)).is_err());
        s.cancel_palette();
        assert!(matches!(s.mode(), Mode::Idle));
    }

    /// Site rules: labels need a prefix, the grid button is hidden.
    #[derive(Default)]
    struct SiteHooks {
        clicked: Vec<Selection>,
    }

    impl EditorHooks for SiteHooks {
        fn read_fields(&self, form: &mut ItemForm) {
            if let Some(label) = &mut form.label {
                *label = label.trim().to_string();
            }
        }

        fn validate(&self, kind: ItemKind, form: &ItemForm) -> Result<(), ValidationError> {
            match (kind, form.label.as_deref()) {
                (ItemKind::Label, Some(l)) if !l.starts_with("site:") => {
                    Err(ValidationError::Missing("site prefix"))
                }
                _ => Ok(()),
            }
        }

        fn item_selected(&mut self, selection: Selection) {
            self.clicked.push(selection);
        }

        fn toolbox(&self, enabled: &mut BTreeSet<ToolButton>) {
            enabled.remove(&ToolButton::ShowGrid);
        }
    }

    #[test]
    fn test_hooks_extend_validation_and_toolbox() {
        let mut s = EditorSession::with_hooks(
            console(),
            ScriptedBackend::default(),
            RecordingSurface::default(),
            SiteHooks::default(),
        );
        s.select(Element::Background).unwrap();
        assert!(!s.toolbox().contains(&ToolButton::ShowGrid));
        assert_eq!(s.hooks.clicked, vec![Selection::Background]);

        s.open_create_palette(ItemKind::Label).unwrap();
        let form = ItemForm {
            label: Some("  Uplink ".into()),
            ..ItemForm::default()
        };
        assert!(matches!(
            s.commit_create(form),
            Err(AppError::Validation(ValidationError::Missing("site prefix")))
        ));
        let form = ItemForm {
            label: Some(" site:Uplink ".into()),
            ..ItemForm::default()
        };
        let id = s.commit_create(form).unwrap().unwrap();
        assert_eq!(s.console().item(id).unwrap().attrs.label.as_deref(), Some("site:Uplink"));
    }

    #[test]
    fn test_local_backend_session() {
        let mut s = EditorSession::new(console(), LocalBackend::new(ItemId(10)), RecordingSurface::default());
        s.open_create_palette(ItemKind::Icon).unwrap();
        let id = s
            .commit_create(ItemForm {
                width: Some(0),
                height: Some(0),
                image: Some("router".into()),
                parent: Some(1),
                ..ItemForm::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(id, ItemId(10));
        assert_eq!(s.lines().get(id).unwrap().color, DEFAULT_LINE_COLOR);
    }
}
