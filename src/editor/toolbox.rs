use std::collections::BTreeSet;
use std::fmt;

use super::session::{Mode, Palette, Selection};
use crate::ir::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolButton {
    Create(ItemKind),
    CopyItem,
    EditItem,
    DeleteItem,
    ShowGrid,
    Save,
}

impl fmt::Display for ToolButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolButton::Create(kind) => f.write_str(kind.as_str()),
            ToolButton::CopyItem => f.write_str("copy_item"),
            ToolButton::EditItem => f.write_str("edit_item"),
            ToolButton::DeleteItem => f.write_str("delete_item"),
            ToolButton::ShowGrid => f.write_str("show_grid"),
            ToolButton::Save => f.write_str("save_visualmap"),
        }
    }
}

fn create_buttons() -> impl Iterator<Item = ToolButton> {
    ItemKind::ALL.into_iter().map(ToolButton::Create)
}

/// Buttons enabled for the current interaction state.
pub fn enabled_buttons(mode: &Mode, autosave: bool) -> BTreeSet<ToolButton> {
    let mut enabled = BTreeSet::new();

    match mode {
        Mode::PaletteOpen(Palette::Create(kind)) => {
            enabled.insert(ToolButton::Create(*kind));
        }
        Mode::PaletteOpen(Palette::Edit(sel)) => match sel {
            Selection::Item(_, kind) => {
                enabled.insert(ToolButton::Create(*kind));
            }
            Selection::Handle(..) => {
                enabled.insert(ToolButton::Create(ItemKind::Line));
            }
            Selection::Background => {}
        },
        Mode::CreatingLine(_) => {}
        Mode::Idle | Mode::Selected(_) if !autosave => {
            enabled.insert(ToolButton::Save);
        }
        Mode::Idle => enabled.extend(create_buttons()),
        Mode::Selected(sel) => {
            enabled.extend(create_buttons());
            match sel {
                Selection::Background => {
                    enabled.insert(ToolButton::EditItem);
                    enabled.insert(ToolButton::ShowGrid);
                }
                Selection::Item(..) => {
                    enabled.insert(ToolButton::CopyItem);
                    enabled.insert(ToolButton::EditItem);
                    enabled.insert(ToolButton::DeleteItem);
                }
                Selection::Handle(..) => {
                    enabled.insert(ToolButton::EditItem);
                    enabled.insert(ToolButton::DeleteItem);
                }
            }
        }
    }

    enabled
}
