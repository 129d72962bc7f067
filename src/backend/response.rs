use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::ir::{ItemId, ItemKind};

/// JSON reply of the builder endpoint: `{"correct": bool, ...}` plus
/// action-specific fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(default, deserialize_with = "loose_bool")]
    pub correct: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            correct: true,
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Parse a reply body. Anything that is not a JSON object (the endpoint
    /// answers a bare `0` on some failures) counts as not correct.
    pub fn parse(body: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_str(body.trim())
            .map_err(|e| AppError::Transport(format!("Invalid JSON reply: {}", e)))?;
        match value {
            Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| AppError::Transport(format!("Unexpected reply shape: {}", e))),
            _ => Ok(Self::default()),
        }
    }

    pub fn ensure_correct(self, action: &str, id: ItemId) -> Result<Self, AppError> {
        if self.correct {
            Ok(self)
        } else {
            Err(AppError::Rejected {
                action: action.to_string(),
                id: id.0,
            })
        }
    }

    pub fn id_data(&self) -> Option<ItemId> {
        self.extra.get("id_data").and_then(value_as_i64).map(ItemId)
    }

    pub fn text(&self) -> Option<&str> {
        self.extra.get("text").and_then(Value::as_str)
    }

    pub fn color_line(&self) -> Option<&str> {
        self.extra
            .get("color_line")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
    }

    pub fn font(&self) -> Option<&str> {
        self.extra.get("font").and_then(Value::as_str)
    }

    pub fn item_kind(&self) -> Option<ItemKind> {
        self.extra
            .get("type")
            .and_then(Value::as_str)
            .and_then(|t| t.parse().ok())
    }

    pub fn values(&self) -> Option<&Map<String, Value>> {
        self.extra.get("values").and_then(Value::as_object)
    }
}

/// PHP encodes numbers as either JSON numbers or numeric strings.
pub fn value_as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.as_str(), "1" | "true"),
        _ => false,
    })
}
