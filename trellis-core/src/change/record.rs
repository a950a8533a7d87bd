//! A single change record.

use std::fmt;

use serde::Serialize;

use crate::model::ModelId;
use crate::value::Value;

/// What kind of mutation a [`Change`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    /// A previously absent key became present.
    #[serde(rename = "add")]
    Add,
    /// A present key changed value (or was forced).
    #[serde(rename = "update")]
    Update,
    /// A present key became absent.
    #[serde(rename = "delete")]
    Delete,
    /// An element was inserted at an index.
    #[serde(rename = "item:add")]
    ItemAdd,
    /// An element was removed from an index.
    #[serde(rename = "item:delete")]
    ItemDelete,
    /// Elements changed position without changing value.
    #[serde(rename = "reorder")]
    Reorder,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::ItemAdd => "item:add",
            ChangeKind::ItemDelete => "item:delete",
            ChangeKind::Reorder => "reorder",
        }
    }

    /// True for the index-level kinds emitted by lists.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            ChangeKind::ItemAdd | ChangeKind::ItemDelete | ChangeKind::Reorder
        )
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic, typed description of a mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    /// Dotted path, or a reserved pseudo-key such as `items*`.
    pub key: String,
    /// The model whose store changed.
    pub container: ModelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Affected position, for `item:add` / `item:delete` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Change {
    pub fn new(kind: ChangeKind, container: ModelId, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            container,
            old_value: None,
            value: None,
            index: None,
        }
    }

    /// A key-level change, with the kind derived from presence before and after.
    ///
    /// Returns `None` when both sides are absent.
    pub fn keyed(
        container: ModelId,
        key: impl Into<String>,
        old_value: Option<Value>,
        value: Option<Value>,
    ) -> Option<Self> {
        let kind = match (&old_value, &value) {
            (None, None) => return None,
            (None, Some(_)) => ChangeKind::Add,
            (Some(_), None) => ChangeKind::Delete,
            (Some(_), Some(_)) => ChangeKind::Update,
        };
        Some(Self {
            old_value,
            value,
            ..Self::new(kind, container, key)
        })
    }

    /// An `item:add` record at `index`.
    pub fn item_add(
        container: ModelId,
        key: impl Into<String>,
        index: usize,
        previous: Option<Value>,
        value: Value,
    ) -> Self {
        Self {
            old_value: previous,
            value: Some(value),
            index: Some(index),
            ..Self::new(ChangeKind::ItemAdd, container, key)
        }
    }

    /// An `item:delete` record at `index`.
    pub fn item_delete(
        container: ModelId,
        key: impl Into<String>,
        index: usize,
        removed: Value,
    ) -> Self {
        Self {
            old_value: Some(removed),
            index: Some(index),
            ..Self::new(ChangeKind::ItemDelete, container, key)
        }
    }

    pub fn with_old_value(mut self, value: Option<Value>) -> Self {
        self.old_value = value;
        self
    }

    pub fn with_value(mut self, value: Option<Value>) -> Self {
        self.value = value;
        self
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.key)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyed_derives_kind_from_presence() {
        let id = ModelId::new();
        let add = Change::keyed(id, "a", None, Some(Value::from(1))).unwrap();
        let update = Change::keyed(id, "a", Some(Value::from(1)), Some(Value::from(2))).unwrap();
        let delete = Change::keyed(id, "a", Some(Value::from(2)), None).unwrap();

        assert_eq!(add.kind, ChangeKind::Add);
        assert_eq!(update.kind, ChangeKind::Update);
        assert_eq!(delete.kind, ChangeKind::Delete);
        assert!(Change::keyed(id, "a", None, None).is_none());
    }

    #[test]
    fn serializes_with_wire_kind_names() {
        let change = Change::item_add(ModelId::new(), "items*", 1, None, Value::from("x"));
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["kind"], json!("item:add"));
        assert_eq!(json["index"], json!(1));
        assert_eq!(json["value"], json!("x"));
        assert!(json.get("old_value").is_none());
    }

    #[test]
    fn display_includes_index() {
        let change = Change::item_delete(ModelId::new(), "items*", 3, Value::Null);
        assert_eq!(change.to_string(), "item:delete items*[3]");
        assert!(change.kind.is_item_level());
        assert!(!ChangeKind::Update.is_item_level());
    }
}
