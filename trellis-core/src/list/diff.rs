//! Change generation for whole-collection replacement.
//!
//! Replacing the items never computes an edit script. Every existing index
//! is deleted from last to first, then every new value is added from first
//! to last, so a renderer that handles `item:add` and `item:delete` needs no
//! separate replace path. Deleting in descending order keeps each index
//! valid at the moment its record is applied.

use crate::change::{Change, ChangeKind};
use crate::keys;
use crate::model::ModelId;
use crate::value::Value;

/// Records for replacing `old` with `new`, in delivery order: deletes
/// (descending), adds (ascending), the `items` update, then `length` if it
/// changed.
pub(crate) fn replacement(owner: ModelId, old: &[Value], new: &[Value]) -> Vec<Change> {
    let mut changes = Vec::with_capacity(old.len() + new.len() + 2);
    for (index, removed) in old.iter().enumerate().rev() {
        changes.push(Change::item_delete(
            owner,
            keys::ITEMS_INDEX,
            index,
            removed.clone(),
        ));
    }
    for (index, added) in new.iter().enumerate() {
        changes.push(Change::item_add(
            owner,
            keys::ITEMS_INDEX,
            index,
            None,
            added.clone(),
        ));
    }
    changes.push(
        Change::new(ChangeKind::Update, owner, keys::ITEMS)
            .with_old_value(Some(Value::Array(old.to_vec())))
            .with_value(Some(Value::Array(new.to_vec()))),
    );
    if let Some(change) = length_change(owner, old.len(), new.len()) {
        changes.push(change);
    }
    changes
}

/// A `length` update, or `None` if the length did not change.
pub(crate) fn length_change(owner: ModelId, old: usize, new: usize) -> Option<Change> {
    (old != new).then(|| {
        Change::new(ChangeKind::Update, owner, keys::LENGTH)
            .with_old_value(Some(Value::from(old)))
            .with_value(Some(Value::from(new)))
    })
}

/// A `reorder` record carrying the full order before and after.
pub(crate) fn reorder(owner: ModelId, before: Vec<Value>, after: Vec<Value>) -> Change {
    Change::new(ChangeKind::Reorder, owner, keys::ITEMS_INDEX)
        .with_old_value(Some(Value::Array(before)))
        .with_value(Some(Value::Array(after)))
}
