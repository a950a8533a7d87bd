//! Reading and writing values at a [`Path`].
//!
//! Reads never fail: a read through a missing or non-container intermediate
//! yields `None`. A write creates (or replaces) intermediates with objects
//! until it can assign the final segment, and only fails when an array index
//! lies too far past the end of the array to pad.
//!
//! Nested [`Model`]s are opaque to writes: callers that must respect a
//! nested model's own notification rules look it up first with
//! [`nested_model`] and delegate. Reads and `exists` descend into nested
//! models through their public API.

use crate::error::PathError;
use crate::model::Model;
use crate::value::{Object, Value};

use super::Path;

/// Read the value at `path`, or `None` when the path does not resolve.
pub fn read(container: &Value, path: &Path) -> Option<Value> {
    let mut current = container;
    for (depth, segment) in path.iter().enumerate() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::Model(model) => return model.get(path.tail(depth)),
            _ => return None,
        };
    }
    Some(current.clone())
}

/// True if the full path currently resolves to a present value.
pub fn exists(container: &Value, path: &Path) -> bool {
    let mut current = container;
    for (depth, segment) in path.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            Value::Model(model) => return model.has(path.tail(depth)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return false,
        }
    }
    true
}

/// Assign `value` at `path`, creating intermediate objects as needed.
///
/// Returns the value previously stored at the final segment. Writing past the
/// end of an array pads it with `Null`, by at most [`MAX_ARRAY_PADDING`]
/// elements; a write further out is refused before anything is modified.
/// An empty path replaces the container.
pub fn write(container: &mut Value, path: &Path, value: Value) -> Result<Option<Value>, PathError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(Some(std::mem::replace(container, value)));
    };
    check_padding(container, path)?;
    let mut current = container;
    for segment in parents {
        current = descend_or_create(current, segment);
    }
    Ok(assign(current, last, value))
}

/// How many `Null`s a single write may append before its target index.
pub const MAX_ARRAY_PADDING: usize = 1024;

/// Walk the existing structure and reject any array index a write would
/// have to pad beyond [`MAX_ARRAY_PADDING`].
fn check_padding(container: &Value, path: &Path) -> Result<(), PathError> {
    let mut current = container;
    for (depth, segment) in path.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(index) if index.saturating_sub(items.len()) > MAX_ARRAY_PADDING => {
                    return Err(PathError::IndexOutOfRange {
                        path: path.segments()[..=depth].join("."),
                        index,
                        len: items.len(),
                    });
                }
                Ok(index) => items.get(index),
                Err(_) => None,
            },
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(()),
        }
    }
    Ok(())
}

/// Remove the value at `path`, returning it. Missing paths are a no-op.
///
/// Object keys are removed preserving the order of the remaining keys; array
/// elements are removed and later elements shift down.
pub fn remove(container: &mut Value, path: &Path) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = container;
    for segment in parents {
        current = match current {
            Value::Object(map) => map.get_mut(segment.as_str())?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => map.shift_remove(last.as_str()),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

/// Find the first nested model sitting on a strict prefix of `path`.
///
/// Returns the model and the remainder of the path relative to it.
pub fn nested_model(container: &Value, path: &Path) -> Option<(Model, Path)> {
    let mut current = container;
    for (depth, segment) in path.iter().enumerate() {
        current = match current {
            Value::Model(model) => return Some((model.clone(), path.tail(depth))),
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    None
}

fn descend_or_create<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = match current {
        Value::Array(_) => segment.parse::<usize>().ok(),
        _ => None,
    };
    let slot = match (current, index) {
        (Value::Array(items), Some(index)) => {
            if let Some(end) = index.checked_add(1).filter(|end| *end > items.len()) {
                items.resize(end, Value::Null);
            }
            &mut items[index]
        }
        (other, _) => ensure_object(other)
            .entry(segment.to_owned())
            .or_insert(Value::Null),
    };
    if !matches!(slot, Value::Object(_) | Value::Array(_)) {
        *slot = Value::Object(Object::new());
    }
    slot
}

fn assign(container: &mut Value, segment: &str, value: Value) -> Option<Value> {
    if let Value::Array(items) = container {
        if let Ok(index) = segment.parse::<usize>() {
            if index < items.len() {
                return Some(std::mem::replace(&mut items[index], value));
            }
            items.resize(index, Value::Null);
            items.push(value);
            return None;
        }
    }
    ensure_object(container).insert(segment.to_owned(), value)
}

fn ensure_object(value: &mut Value) -> &mut Object {
    if !value.is_object() {
        *value = Value::Object(Object::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        Value::from(json!({
            "user": {"name": "Ada", "tags": ["a", "b"]},
            "count": 3,
            "nothing": null
        }))
    }

    #[test]
    fn read_walks_nested_objects_and_arrays() {
        let doc = doc();
        assert_eq!(read(&doc, &Path::parse("user.name")), Some(Value::from("Ada")));
        assert_eq!(read(&doc, &Path::parse("user.tags.1")), Some(Value::from("b")));
        assert_eq!(read(&doc, &Path::parse("count")), Some(Value::from(3)));
    }

    #[test]
    fn read_missing_intermediate_is_absent() {
        let doc = doc();
        assert_eq!(read(&doc, &Path::parse("missing.deep.key")), None);
        assert_eq!(read(&doc, &Path::parse("count.deeper")), None);
        assert_eq!(read(&doc, &Path::parse("user.tags.9")), None);
        assert_eq!(read(&doc, &Path::parse("user.tags.x")), None);
    }

    #[test]
    fn exists_treats_null_as_present() {
        let doc = doc();
        assert!(exists(&doc, &Path::parse("nothing")));
        assert!(exists(&doc, &Path::parse("user.name")));
        assert!(!exists(&doc, &Path::parse("user.age")));
        assert!(!exists(&doc, &Path::parse("count.x")));
    }

    #[test]
    fn write_creates_intermediates() {
        let mut doc = Value::Object(Object::new());
        let previous = write(&mut doc, &Path::parse("a.b.c"), Value::from(1)).unwrap();
        assert_eq!(previous, None);
        assert_eq!(doc.to_json(), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn write_replaces_scalar_intermediate() {
        let mut doc = doc();
        write(&mut doc, &Path::parse("count.inner"), Value::from(true)).unwrap();
        assert_eq!(read(&doc, &Path::parse("count")).unwrap().to_json(), json!({"inner": true}));
    }

    #[test]
    fn write_returns_previous_value() {
        let mut doc = doc();
        let previous = write(&mut doc, &Path::parse("user.name"), Value::from("Grace")).unwrap();
        assert_eq!(previous, Some(Value::from("Ada")));
    }

    #[test]
    fn write_into_array_pads_with_null() {
        let mut doc = doc();
        write(&mut doc, &Path::parse("user.tags.3"), Value::from("d")).unwrap();
        assert_eq!(
            read(&doc, &Path::parse("user.tags")).unwrap().to_json(),
            json!(["a", "b", null, "d"])
        );
    }

    #[test]
    fn write_far_past_array_end_is_refused() {
        let mut doc = doc();
        let before = doc.clone();
        let err = write(
            &mut doc,
            &Path::parse("user.tags.18446744073709551615"),
            Value::from(1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PathError::IndexOutOfRange {
                path: "user.tags.18446744073709551615".into(),
                index: usize::MAX,
                len: 2,
            }
        );
        assert!(write(&mut doc, &Path::parse("user.tags.5000.name"), Value::from(1)).is_err());
        assert_eq!(doc, before);

        let edge = 2 + MAX_ARRAY_PADDING;
        write(&mut doc, &Path::parse(&format!("user.tags.{edge}")), Value::from("z")).unwrap();
        assert_eq!(read(&doc, &Path::parse("user.tags")).unwrap().as_array().unwrap().len(), edge + 1);
    }

    #[test]
    fn remove_preserves_sibling_order() {
        let mut doc = Value::object([("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(remove(&mut doc, &Path::parse("b")), Some(Value::from(2)));
        let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert_eq!(remove(&mut doc, &Path::parse("x.y")), None);
    }

    #[test]
    fn reads_descend_into_nested_models() {
        let inner = Model::from_data(json!({"city": "Oslo"}));
        let doc = Value::object([("address", Value::Model(inner.clone()))]);
        assert_eq!(read(&doc, &Path::parse("address.city")), Some(Value::from("Oslo")));
        assert!(exists(&doc, &Path::parse("address.city")));

        let (found, rest) = nested_model(&doc, &Path::parse("address.city")).unwrap();
        assert_eq!(found, inner);
        assert_eq!(rest, Path::parse("city"));
        assert!(nested_model(&doc, &Path::parse("address")).is_none());
    }
}
