//! Observable List
//!
//! A [`List`] owns a [`Model`] and keeps an ordered sequence at its `items`
//! key, with `length` kept in sync. Index-aware operations describe what
//! they did with `item:add`, `item:delete` and `reorder` records on the
//! `items*` pseudo-key, so a renderer can reconcile child views index by
//! index. Keys that are not numeric fall through to the owned model, which
//! lets a list carry ordinary attributes next to its items.
//!
//! Every operation is one batch: its index records, the `length` update and
//! the version bump reach observers together.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{List, Observer, Value};
//!
//! let list = List::new(["a", "b", "c", "d"]);
//! let renderer = Observer::new(|changes| {
//!     for change in changes.iter() {
//!         println!("{change}");
//!     }
//! });
//! list.observe(&renderer, ["items*", "length"]);
//!
//! list.insert(1, "x");
//! assert_eq!(list.get(1), Some(Value::from("x")));
//! assert_eq!(list.get(-1), Some(Value::from("d")));
//! assert_eq!(list.len(), 5);
//! ```

mod diff;
mod index;

pub use index::{insertion_point, normalize_index, ListKey};

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;

use crate::change::Change;
use crate::config::ListConfig;
use crate::error::ModelResult;
use crate::keys;
use crate::model::{Matcher, Model, ModelId, ModelState, Observer, SetOptions};
use crate::path::{self, Path};
use crate::value::Value;

const RESERVED: &[&str] = &[keys::ITEMS, keys::LENGTH];

/// An ordered, observable collection.
#[derive(Clone)]
pub struct List {
    model: Model,
    cast: bool,
}

impl List {
    /// A list holding `items`, with default configuration.
    pub fn new<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::with_config(items, ListConfig::default())
    }

    pub fn empty() -> Self {
        Self::new(Vec::<Value>::new())
    }

    pub fn with_config<I, V>(items: I, config: ListConfig) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let cast = config.cast;
        let items: Vec<Value> = items
            .into_iter()
            .map(|item| cast_value(cast, item.into()))
            .collect();
        let length = items.len();
        let model = Model::builder()
            .config(config.model)
            .reserved(RESERVED)
            .data(Value::object([
                (keys::ITEMS, Value::Array(items)),
                (keys::LENGTH, Value::from(length)),
            ]))
            .build();
        Self { model, cast }
    }

    /// The owned model holding items and attributes.
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn id(&self) -> ModelId {
        self.model.id()
    }

    pub fn version(&self) -> u64 {
        self.model.version()
    }

    pub fn is_cast(&self) -> bool {
        self.cast
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The item at an index (negative counts from the end), or an attribute.
    pub fn get(&self, key: impl Into<ListKey>) -> Option<Value> {
        match key.into() {
            ListKey::Index(index) => self.model.with_state(|state| {
                let items = items_of(state)?;
                normalize_index(index, items.len()).map(|at| items[at].clone())
            }),
            ListKey::Name(name) => self.model.get(name),
        }
    }

    pub fn len(&self) -> usize {
        self.model
            .with_state(|state| items_of(state).map_or(0, |items| items.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the items.
    pub fn items(&self) -> Vec<Value> {
        self.model
            .with_state(|state| items_of(state).cloned().unwrap_or_default())
    }

    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.model.with_state(|state| {
            items_of(state).and_then(|items| items.iter().position(|item| item == value))
        })
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    pub fn has(&self, key: impl Into<Path>) -> bool {
        self.model.has(key)
    }

    pub fn gets<I, K>(&self, keys: I) -> IndexMap<String, Value>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.model.gets(keys)
    }

    pub fn test(&self, key: impl Into<Path>, matcher: impl Into<Matcher>) -> bool {
        self.model.test(key, matcher)
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.model.to_json()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write an index, replace all items (`"items"`), or set an attribute.
    ///
    /// `"items.<n>"` is the same as writing index `n`; a deeper
    /// `"items.<n>.<path>"` edits inside that item and, for a plain item,
    /// replaces it with the edited copy.
    pub fn set(&self, key: impl Into<ListKey>, value: impl Into<Value>) -> &Self {
        self.set_with(key, value, SetOptions::default())
    }

    pub fn set_with(
        &self,
        key: impl Into<ListKey>,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> &Self {
        let value = value.into();
        let name = match key.into() {
            ListKey::Index(index) => return self.set_index(index, value, options),
            ListKey::Name(name) => Path::parse(&name),
        };
        match name.first() {
            Some(keys::ITEMS) if name.len() == 1 => match value {
                Value::Array(items) => self.replace_with(items, options),
                other => {
                    tracing::warn!(
                        list = %self.id(),
                        kind = other.type_name(),
                        "list items must be an array; write ignored"
                    );
                    self
                }
            },
            Some(keys::ITEMS) => self.set_item_path(&name, value, options),
            Some(keys::LENGTH) => {
                tracing::warn!(list = %self.id(), "length is maintained by the list; write ignored");
                self
            }
            _ => {
                self.model.set_with(name, value, options);
                self
            }
        }
    }

    fn set_item_path(&self, name: &Path, value: Value, options: SetOptions) -> &Self {
        let Some(index) = name.segments().get(1).and_then(|s| s.parse::<isize>().ok()) else {
            tracing::warn!(list = %self.id(), key = %name, "items are addressed by index; write ignored");
            return self;
        };
        let rest = name.tail(2);
        if rest.is_empty() {
            return self.set_index(index, value, options);
        }
        match self.get(index) {
            Some(Value::Model(item)) => {
                item.set_with(rest, value, options);
            }
            Some(mut item) => match path::write(&mut item, &rest, value) {
                Ok(_) => return self.set_index(index, item, options),
                Err(error) => tracing::warn!(list = %self.id(), error = %error, "write refused"),
            },
            None => tracing::warn!(list = %self.id(), key = %name, "no item at that index; write ignored"),
        }
        self
    }

    fn set_index(&self, index: isize, value: Value, options: SetOptions) -> &Self {
        let value = self.cast(value);
        self.edit(options, |state, owner| {
            let mut items = take_items(state);
            let len = items.len();
            let mut changes = Vec::with_capacity(2);
            match normalize_index(index, len) {
                Some(at) => {
                    if items[at] == value && !options.force {
                        put_items(state, items);
                        return;
                    }
                    changes.push(remove_at(owner, &mut items, at));
                    changes.push(insert_at(owner, &mut items, at, value));
                }
                None => {
                    let at = insertion_point(index, len);
                    changes.push(insert_at(owner, &mut items, at, value));
                    changes.extend(diff::length_change(owner, len, items.len()));
                }
            }
            put_items(state, items);
            record_all(state, changes);
        });
        self
    }

    /// Insert `value` before `index` (negative counts from the end, clamped).
    pub fn insert(&self, index: isize, value: impl Into<Value>) -> &Self {
        self.insert_with(index, value, SetOptions::default())
    }

    pub fn insert_with(&self, index: isize, value: impl Into<Value>, options: SetOptions) -> &Self {
        let value = self.cast(value.into());
        self.edit(options, |state, owner| {
            let mut items = take_items(state);
            let len = items.len();
            let at = insertion_point(index, len);
            let mut changes = vec![insert_at(owner, &mut items, at, value)];
            changes.extend(diff::length_change(owner, len, items.len()));
            put_items(state, items);
            record_all(state, changes);
        });
        self
    }

    pub fn push(&self, value: impl Into<Value>) -> &Self {
        self.insert(isize::MAX, value)
    }

    pub fn unshift(&self, value: impl Into<Value>) -> &Self {
        self.insert(0, value)
    }

    /// Remove and return the item at `index`. Out of range is a silent `None`.
    pub fn remove(&self, index: isize) -> Option<Value> {
        self.remove_with(index, SetOptions::default())
    }

    pub fn remove_with(&self, index: isize, options: SetOptions) -> Option<Value> {
        self.edit(options, |state, owner| {
            let mut items = take_items(state);
            let len = items.len();
            let Some(at) = normalize_index(index, len) else {
                put_items(state, items);
                return None;
            };
            let mut changes = vec![remove_at(owner, &mut items, at)];
            let removed = changes[0].old_value.clone();
            changes.extend(diff::length_change(owner, len, items.len()));
            put_items(state, items);
            record_all(state, changes);
            removed
        })
    }

    pub fn shift(&self) -> Option<Value> {
        self.remove(0)
    }

    pub fn pop(&self) -> Option<Value> {
        self.remove(-1)
    }

    /// Replace every item. See [`diff`] for the records this produces.
    pub fn replace<I, V>(&self, items: I) -> &Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.replace_with(items, SetOptions::default())
    }

    pub fn replace_with<I, V>(&self, items: I, options: SetOptions) -> &Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let new: Vec<Value> = items
            .into_iter()
            .map(|item| self.cast(item.into()))
            .collect();
        self.edit(options, |state, owner| {
            let old = take_items(state);
            if old == new && !options.force {
                put_items(state, old);
                return;
            }
            let changes = diff::replacement(owner, &old, &new);
            put_items(state, new);
            record_all(state, changes);
        });
        self
    }

    pub fn clear(&self) -> &Self {
        self.replace(Vec::<Value>::new())
    }

    /// Clear every attribute, leaving the items alone.
    pub fn reset(&self) -> &Self {
        self.model.reset();
        self
    }

    /// Move the item at `from` to position `to`, emitting one `reorder`.
    pub fn move_item(&self, from: isize, to: isize) -> &Self {
        self.edit(SetOptions::default(), |state, owner| {
            let mut items = take_items(state);
            let len = items.len();
            match (normalize_index(from, len), normalize_index(to, len)) {
                (Some(from), Some(to)) if from != to => {
                    let before = items.clone();
                    let item = items.remove(from);
                    items.insert(to, item);
                    let change = diff::reorder(owner, before, items.clone());
                    put_items(state, items);
                    state.record(change);
                }
                _ => put_items(state, items),
            }
        });
        self
    }

    /// Sort the items in place, emitting one `reorder` if the order changed.
    pub fn sort_by<F>(&self, mut compare: F) -> &Self
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let _gate = self.model.gate();
        let mut sorted = self.items();
        let before = sorted.clone();
        sorted.sort_by(|a, b| compare(a, b));
        if sorted == before {
            return self;
        }
        self.edit(SetOptions::default(), |state, owner| {
            let current = take_items(state);
            let change = diff::reorder(owner, current, sorted.clone());
            put_items(state, sorted);
            state.record(change);
        });
        self
    }

    fn edit<R>(&self, options: SetOptions, f: impl FnOnce(&mut ModelState, ModelId) -> R) -> R {
        let _gate = self.model.gate();
        let owner = self.id();
        let result = self.model.with_state(|state| f(state, owner));
        if !options.skip_observers {
            self.model.flush();
        }
        result
    }

    fn cast(&self, value: Value) -> Value {
        cast_value(self.cast, value)
    }

    // ------------------------------------------------------------------
    // Delegated to the owned model
    // ------------------------------------------------------------------

    pub fn observe<I, K>(&self, observer: &Observer, keys: I) -> &Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.model.observe(observer, keys);
        self
    }

    pub fn observe_all(&self, observer: &Observer) -> &Self {
        self.model.observe_all(observer);
        self
    }

    pub fn unobserve<I, K>(&self, observer: &Observer, keys: I) -> &Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.model.unobserve(observer, keys);
        self
    }

    pub fn compute<F, I, K>(&self, name: &str, compute: F, deps: I) -> ModelResult<&Self>
    where
        F: Fn(&Model) -> Value + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.model.compute(name, compute, deps)?;
        Ok(self)
    }

    pub fn flush(&self) -> &Self {
        self.model.flush();
        self
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("id", &self.id())
            .field("cast", &self.cast)
            .finish()
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
    }
}

fn cast_value(cast: bool, value: Value) -> Value {
    match value {
        Value::Object(map) if cast => Value::Model(Model::from_data(Value::Object(map))),
        other => other,
    }
}

fn items_of(state: &ModelState) -> Option<&Vec<Value>> {
    state
        .store
        .as_object()
        .and_then(|map| map.get(keys::ITEMS))
        .and_then(Value::as_array)
}

fn take_items(state: &mut ModelState) -> Vec<Value> {
    state
        .entry_mut(keys::ITEMS, Value::Array(Vec::new()))
        .as_array_mut()
        .map(std::mem::take)
        .unwrap_or_default()
}

/// Store `items` back and keep `length` in step. Records are queued separately.
fn put_items(state: &mut ModelState, items: Vec<Value>) {
    let length = Value::from(items.len());
    *state.entry_mut(keys::ITEMS, Value::Null) = Value::Array(items);
    *state.entry_mut(keys::LENGTH, Value::Null) = length;
}

fn record_all(state: &mut ModelState, changes: Vec<Change>) {
    for change in changes {
        state.record(change);
    }
}

fn insert_at(owner: ModelId, items: &mut Vec<Value>, at: usize, value: Value) -> Change {
    let previous = items.get(at).cloned();
    items.insert(at, value.clone());
    Change::item_add(owner, keys::ITEMS_INDEX, at, previous, value)
}

fn remove_at(owner: ModelId, items: &mut Vec<Value>, at: usize) -> Change {
    let removed = items.remove(at);
    Change::item_delete(owner, keys::ITEMS_INDEX, at, removed)
}
