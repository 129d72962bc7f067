use std::collections::BTreeSet;

use super::session::Selection;
use super::toolbox::ToolButton;
use super::validate::{ItemForm, ValidationError};
use crate::ir::ItemKind;

/// Extension points for site-specific item behavior. Every method has a no-op
/// default.
pub trait EditorHooks {
    /// Add or rewrite palette fields before validation.
    fn read_fields(&self, _form: &mut ItemForm) {}

    /// Extra checks after the built-in validation passed.
    fn validate(&self, _kind: ItemKind, _form: &ItemForm) -> Result<(), ValidationError> {
        Ok(())
    }

    fn item_selected(&mut self, _selection: Selection) {}

    /// Adjust the set of enabled toolbox buttons.
    fn toolbox(&self, _enabled: &mut BTreeSet<ToolButton>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl EditorHooks for NoHooks {}
