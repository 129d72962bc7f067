use serde::{Deserialize, Serialize};
use tracing::debug;

use super::hooks::EditorHooks;
use super::session::EditorSession;
use super::validate::ItemForm;
use crate::backend::Backend;
use crate::error::AppError;
use crate::ir::{Element, HandleEnd, ItemId, ItemKind, Point, Size};
use crate::lines::Surface;

/// Events posted by the console page.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum IpcMessage {
    #[serde(rename = "select")]
    Select { id: String },
    #[serde(rename = "unselect")]
    Unselect,
    #[serde(rename = "item_moved")]
    ItemMoved { id: String, x: i32, y: i32 },
    #[serde(rename = "handle_dragging")]
    HandleDragging { id: String, x: i32, y: i32 },
    #[serde(rename = "canvas_resized")]
    CanvasResized { width: u32, height: u32 },
    #[serde(rename = "toggle_grid")]
    ToggleGrid,
    #[serde(rename = "open_create")]
    OpenCreate { item_type: ItemKind },
    #[serde(rename = "commit_create")]
    CommitCreate {
        #[serde(default)]
        form: ItemForm,
    },
    #[serde(rename = "open_edit")]
    OpenEdit,
    #[serde(rename = "commit_update")]
    CommitUpdate {
        #[serde(default)]
        form: ItemForm,
    },
    #[serde(rename = "cancel")]
    Cancel,
    #[serde(rename = "line_pointer")]
    LinePointer { x: i32, y: i32 },
    #[serde(rename = "line_click")]
    LineClick { x: i32, y: i32 },
    #[serde(rename = "copy")]
    Copy,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "set_autosave")]
    SetAutosave { enabled: bool },
    #[serde(rename = "save")]
    Save,
    #[serde(rename = "get_font")]
    GetFont,
    #[serde(rename = "toolbox")]
    Toolbox,
}

/// Answer sent back to the page after a message was handled.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct IpcReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clamped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<serde_json::Map<String, serde_json::Value>>,
}

impl IpcReply {
    fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    fn with_id(id: Option<ItemId>) -> Self {
        Self { id, ..Self::ok() }
    }
}

/// Add the parent select options of the open palette under `parents`.
fn with_parents<B, S, H>(
    session: &EditorSession<B, S, H>,
    mut values: serde_json::Map<String, serde_json::Value>,
) -> IpcReply
where
    B: Backend,
    S: Surface,
    H: EditorHooks,
{
    let parents: Vec<serde_json::Value> = session
        .parent_options()
        .into_iter()
        .map(|(id, text)| serde_json::json!({ "id": id.0, "text": text }))
        .collect();
    values.insert("parents".into(), parents.into());
    IpcReply {
        values: Some(values),
        ..IpcReply::ok()
    }
}

pub fn parse_ipc_message(body: &str) -> Result<IpcMessage, String> {
    serde_json::from_str(body).map_err(|e| format!("Failed to parse IPC message: {}", e))
}

/// Map a DOM element id to an editor element: `background` (or `0`), a
/// numeric item id, or `handler_start_<id>` / `handler_end_<id>`.
pub fn parse_element(id: &str) -> Result<Element, AppError> {
    let id = id.trim();
    if id == "background" || id == "0" {
        return Ok(Element::Background);
    }
    if let Some((end, line)) = HandleEnd::parse_element_id(id) {
        return Ok(Element::Handle(line, end));
    }
    id.parse::<i64>()
        .map(|n| Element::Item(ItemId(n)))
        .map_err(|_| AppError::InvalidState(format!("unknown element id '{}'", id)))
}

/// Apply one page event to the session.
pub fn handle_message<B, S, H>(
    session: &mut EditorSession<B, S, H>,
    msg: IpcMessage,
) -> Result<IpcReply, AppError>
where
    B: Backend,
    S: Surface,
    H: EditorHooks,
{
    debug!(?msg, "ipc");

    let reply = match msg {
        IpcMessage::Select { id } => {
            session.select(parse_element(&id)?)?;
            IpcReply::ok()
        }
        IpcMessage::Unselect => {
            session.unselect_all();
            IpcReply::ok()
        }
        IpcMessage::ItemMoved { id, x, y } => {
            session.drag(parse_element(&id)?, Point::new(x, y))?;
            IpcReply::ok()
        }
        IpcMessage::HandleDragging { id, x, y } => match parse_element(&id)? {
            Element::Handle(line, end) => {
                session.drag_handle_live(line, end, Point::new(x, y))?;
                IpcReply::ok()
            }
            other => {
                return Err(AppError::InvalidState(format!("{} is not a line handle", other)));
            }
        },
        IpcMessage::CanvasResized { width, height } => {
            let outcome = session.resize_canvas(Size::new(width, height))?;
            IpcReply {
                clamped: outcome.clamped,
                failed: outcome.report.failed.iter().map(|(e, _)| e.to_string()).collect(),
                ..IpcReply::ok()
            }
        }
        IpcMessage::ToggleGrid => {
            let failed = session
                .toggle_grid()?
                .map(|r| r.failed.iter().map(|(e, _)| e.to_string()).collect())
                .unwrap_or_default();
            IpcReply {
                failed,
                ..IpcReply::ok()
            }
        }
        IpcMessage::OpenCreate { item_type } => {
            session.open_create_palette(item_type)?;
            with_parents(session, serde_json::Map::new())
        }
        IpcMessage::CommitCreate { form } => IpcReply::with_id(session.commit_create(form)?),
        IpcMessage::OpenEdit => {
            let values = session.open_edit_palette()?;
            with_parents(session, values)
        }
        IpcMessage::CommitUpdate { form } => {
            session.commit_update(form)?;
            IpcReply::ok()
        }
        IpcMessage::Cancel => {
            session.cancel_palette();
            IpcReply::ok()
        }
        IpcMessage::LinePointer { x, y } => {
            session.line_pointer(Point::new(x, y));
            IpcReply::ok()
        }
        IpcMessage::LineClick { x, y } => IpcReply::with_id(session.line_click(Point::new(x, y))?),
        IpcMessage::Copy => IpcReply::with_id(Some(session.copy_selected()?)),
        IpcMessage::Delete => IpcReply::with_id(Some(session.delete_selected()?)),
        IpcMessage::SetAutosave { enabled } => {
            session.set_autosave(enabled);
            IpcReply::ok()
        }
        IpcMessage::Save => {
            let report = session.save();
            IpcReply {
                ok: report.success(),
                ..IpcReply::default()
            }
        }
        IpcMessage::GetFont => {
            let mut values = serde_json::Map::new();
            if let Some(font) = session.font()? {
                values.insert("font".into(), font.into());
            }
            IpcReply {
                values: Some(values),
                ..IpcReply::ok()
            }
        }
        IpcMessage::Toolbox => {
            let enabled: Vec<serde_json::Value> = session
                .toolbox()
                .into_iter()
                .map(|b| b.to_string().into())
                .collect();
            let mut values = serde_json::Map::new();
            values.insert("enabled".into(), enabled.into());
            IpcReply {
                values: Some(values),
                ..IpcReply::ok()
            }
        }
    };

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::ir::{Canvas, CanvasItem, UserLine, VisualConsole};
    use crate::lines::RecordingSurface;

    fn session() -> EditorSession<LocalBackend, RecordingSurface> {
        let mut console = VisualConsole::new(
            1,
            Canvas {
                width: 1024,
                height: 768,
                background: None,
            },
        );
        console
            .items
            .push(CanvasItem::new(ItemId(1), ItemKind::Icon, Point::new(100, 100)));
        let mut switch = CanvasItem::new(ItemId(3), ItemKind::Icon, Point::new(300, 100));
        switch.attrs.label = Some("Switch".into());
        console.items.push(switch);
        console.user_lines.push(UserLine {
            id: ItemId(2),
            line_width: 1,
            line_color: "#000000".into(),
            start: Point::new(10, 10),
            end: Point::new(50, 50),
        });
        EditorSession::new(console, LocalBackend::new(ItemId(10)), RecordingSurface::default())
    }

    #[test]
    fn test_parse_item_moved() {
        let json = r#"{"type":"item_moved","id":"12","x":100,"y":200}"#;
        let msg = parse_ipc_message(json).unwrap();
        match msg {
            IpcMessage::ItemMoved { id, x, y } => {
                assert_eq!(id, "12");
                assert_eq!((x, y), (100, 200));
            }
            _ => panic!("Expected ItemMoved"),
        }
    }

    #[test]
    fn test_parse_commit_create_form() {
        let json = r#"{"type":"commit_create","form":{"label":"Router","left":5,"top":6,"parent":3}}"#;
        match parse_ipc_message(json).unwrap() {
            IpcMessage::CommitCreate { form } => {
                assert_eq!(form.label.as_deref(), Some("Router"));
                assert_eq!(form.parent, Some(3));
            }
            _ => panic!("Expected CommitCreate"),
        }
    }

    #[test]
    fn test_parse_open_create_accepts_legacy_kind() {
        let json = r#"{"type":"open_create","item_type":"percentile_bar"}"#;
        assert!(matches!(
            parse_ipc_message(json).unwrap(),
            IpcMessage::OpenCreate {
                item_type: ItemKind::Percentile
            }
        ));
    }

    #[test]
    fn test_parse_invalid_message() {
        let json = r#"{"type":"unknown"}"#;
        assert!(parse_ipc_message(json).is_err());
    }

    #[test]
    fn test_parse_element() {
        assert_eq!(parse_element("background").unwrap(), Element::Background);
        assert_eq!(parse_element("7").unwrap(), Element::Item(ItemId(7)));
        assert_eq!(
            parse_element("handler_end_4").unwrap(),
            Element::Handle(ItemId(4), HandleEnd::End)
        );
        assert!(parse_element("image_4").is_err());
    }

    #[test]
    fn test_handle_move_and_resize() {
        let mut s = session();
        let reply = handle_message(
            &mut s,
            IpcMessage::ItemMoved {
                id: "1".into(),
                x: 200,
                y: 300,
            },
        )
        .unwrap();
        assert!(reply.ok);
        assert_eq!(s.console().item(ItemId(1)).unwrap().position, Point::new(200, 300));

        let reply = handle_message(
            &mut s,
            IpcMessage::CanvasResized {
                width: 500,
                height: 500,
            },
        )
        .unwrap();
        assert!(reply.clamped);
        assert_eq!(s.console().item(ItemId(1)).unwrap().position, Point::new(200, 300));
    }

    #[test]
    fn test_handle_dragging_needs_handle() {
        let mut s = session();
        let msg = IpcMessage::HandleDragging {
            id: "handler_start_2".into(),
            x: 20,
            y: 20,
        };
        handle_message(&mut s, msg).unwrap();
        assert_eq!(s.console().user_line(ItemId(2)).unwrap().start, Point::new(26, 26));

        let msg = IpcMessage::HandleDragging {
            id: "1".into(),
            x: 0,
            y: 0,
        };
        assert!(handle_message(&mut s, msg).is_err());
    }

    #[test]
    fn test_create_flow_replies_with_id() {
        let mut s = session();
        handle_message(
            &mut s,
            IpcMessage::OpenCreate {
                item_type: ItemKind::Label,
            },
        )
        .unwrap();
        let form = ItemForm {
            label: Some("Site A".into()),
            ..ItemForm::default()
        };
        let reply = handle_message(&mut s, IpcMessage::CommitCreate { form }).unwrap();
        assert_eq!(reply.id, Some(ItemId(10)));
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({"ok": true, "id": 10})
        );
    }

    #[test]
    fn test_palettes_list_parent_options() {
        let mut s = session();
        let reply = handle_message(
            &mut s,
            IpcMessage::OpenCreate {
                item_type: ItemKind::Icon,
            },
        )
        .unwrap();
        assert_eq!(
            reply.values.unwrap()["parents"],
            serde_json::json!([{"id": 1, "text": "icon 1"}, {"id": 3, "text": "Switch"}])
        );
        handle_message(&mut s, IpcMessage::Cancel).unwrap();

        handle_message(&mut s, IpcMessage::Select { id: "1".into() }).unwrap();
        let reply = handle_message(&mut s, IpcMessage::OpenEdit).unwrap();
        assert_eq!(
            reply.values.unwrap()["parents"],
            serde_json::json!([{"id": 3, "text": "Switch"}])
        );
    }

    #[test]
    fn test_toolbox_and_font() {
        let mut s = session();
        handle_message(&mut s, IpcMessage::Select { id: "background".into() }).unwrap();
        let reply = handle_message(&mut s, IpcMessage::Toolbox).unwrap();
        let enabled = reply.values.unwrap()["enabled"].as_array().unwrap().clone();
        assert!(enabled.contains(&serde_json::json!("show_grid")));
        assert!(!enabled.contains(&serde_json::json!("delete_item")));

        let reply = handle_message(&mut s, IpcMessage::GetFont).unwrap();
        assert_eq!(reply.values.unwrap()["font"], "lato");
    }

    #[test]
    fn test_manual_save_reply() {
        let mut s = session();
        handle_message(&mut s, IpcMessage::SetAutosave { enabled: false }).unwrap();
        let msg = IpcMessage::ItemMoved {
            id: "1".into(),
            x: 1,
            y: 1,
        };
        handle_message(&mut s, msg).unwrap();
        assert_eq!(s.pending(), 1);
        let reply = handle_message(&mut s, IpcMessage::Save).unwrap();
        assert!(reply.ok);
        assert_eq!(s.pending(), 0);
    }
}
