use std::collections::BTreeMap;

use base64::Engine;

use crate::error::AppError;
use crate::ir::{ItemId, VisualConsole};

/// Items that can be chosen as parent, with their display text.
#[derive(Debug, Clone, Default)]
pub struct ParentCandidates {
    names: BTreeMap<ItemId, String>,
}

impl ParentCandidates {
    pub fn from_console(console: &VisualConsole) -> Self {
        let names = console
            .items
            .iter()
            .map(|i| {
                let text = i
                    .attrs
                    .label
                    .clone()
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| format!("{} {}", i.kind, i.id));
                (i.id, text)
            })
            .collect();
        Self { names }
    }

    /// Decode the list the console page embeds: base64 of a JSON object
    /// mapping item id to display text. Null entries are skipped.
    pub fn decode(encoded: &str) -> Result<Self, AppError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::StateError(format!("Failed to decode parent list: {}", e)))?;
        let raw: BTreeMap<String, Option<String>> = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::StateError(format!("Failed to parse parent list: {}", e)))?;

        let mut names = BTreeMap::new();
        for (key, value) in raw {
            let (Ok(id), Some(text)) = (key.parse::<i64>(), value) else {
                continue;
            };
            names.insert(ItemId(id), text);
        }
        Ok(Self { names })
    }

    pub fn insert(&mut self, id: ItemId, text: impl Into<String>) {
        self.names.insert(id, text.into());
    }

    pub fn remove(&mut self, id: ItemId) -> Option<String> {
        self.names.remove(&id)
    }

    /// Options for the parent select of `editing`; an item cannot be its own
    /// parent.
    pub fn options_for(&self, editing: Option<ItemId>) -> Vec<(ItemId, &str)> {
        self.names
            .iter()
            .filter(|(id, _)| Some(**id) != editing)
            .map(|(id, name)| (*id, name.as_str()))
            .collect()
    }
}

#[cfg(test)]
impl ParentCandidates {
    pub fn contains(&self, id: ItemId) -> bool {
        self.names.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_embedded_list() {
        let json = r#"{"3":"Router","5":null,"8":"Switch"}"#;
        let encoded = base64::engine::general_purpose::STANDARD.encode(json);
        let parents = ParentCandidates::decode(&encoded).unwrap();
        assert_eq!(parents.len(), 2);
        assert_eq!(
            parents.options_for(Some(ItemId(3))),
            vec![(ItemId(8), "Switch")]
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ParentCandidates::decode("not base64!").is_err());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut parents = ParentCandidates::default();
        parents.insert(ItemId(1), "A");
        parents.insert(ItemId(2), "B");
        assert_eq!(parents.remove(ItemId(1)).as_deref(), Some("A"));
        assert!(!parents.contains(ItemId(1)));
        assert_eq!(parents.options_for(None), vec![(ItemId(2), "B")]);
    }
}
