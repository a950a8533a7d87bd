//! Observer handles and the per-model observer registry.
//!
//! An [`Observer`] pairs a callback with an opaque [`ObserverId`]. Identity
//! is the id, not the closure, so registering the same handle twice under a
//! key is a no-op and `unobserve` knows exactly what to remove.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::change::ChangeSet;
use crate::config::PathCascade;
use crate::keys;

/// Unique identifier for an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Callback = Arc<dyn Fn(&ChangeSet) + Send + Sync>;

/// A change callback with a stable identity.
///
/// Clones share the id, so a clone is the same observer.
#[derive(Clone)]
pub struct Observer {
    id: ObserverId,
    callback: Callback,
}

impl Observer {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ChangeSet) + Send + Sync + 'static,
    {
        Self {
            id: ObserverId::new(),
            callback: Arc::new(callback),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Invoke the callback with a batch.
    pub fn notify(&self, changes: &ChangeSet) {
        (self.callback)(changes);
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish()
    }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Observer {}

/// Key -> observer multimap plus the wildcard list.
///
/// `observers` keeps first-registration order, which is dispatch order.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: IndexMap<ObserverId, Observer>,
    by_key: HashMap<String, IndexSet<ObserverId>>,
    wildcard: IndexSet<ObserverId>,
}

impl ObserverRegistry {
    /// Register under `key`. Returns false if it was already registered there.
    pub fn register(&mut self, observer: &Observer, key: &str) -> bool {
        let id = observer.id();
        self.observers
            .entry(id)
            .or_insert_with(|| observer.clone());
        if key == keys::WILDCARD {
            self.wildcard.insert(id)
        } else {
            self.by_key.entry(key.to_owned()).or_default().insert(id)
        }
    }

    /// Remove from `key`.
    pub fn unregister(&mut self, id: ObserverId, key: &str) {
        if key == keys::WILDCARD {
            self.wildcard.shift_remove(&id);
        } else if let Some(ids) = self.by_key.get_mut(key) {
            ids.shift_remove(&id);
            if ids.is_empty() {
                self.by_key.remove(key);
            }
        }
        self.forget_if_unused(id);
    }

    /// Remove from every key, including the wildcard.
    pub fn unregister_all(&mut self, id: ObserverId) {
        self.wildcard.shift_remove(&id);
        self.by_key.retain(|_, ids| {
            ids.shift_remove(&id);
            !ids.is_empty()
        });
        self.observers.shift_remove(&id);
    }

    fn forget_if_unused(&mut self, id: ObserverId) {
        let used = self.wildcard.contains(&id) || self.by_key.values().any(|ids| ids.contains(&id));
        if !used {
            self.observers.shift_remove(&id);
        }
    }

    /// Observers interested in a change at `key`, wildcard included.
    pub fn interested(&self, key: &str, cascade: PathCascade) -> Vec<ObserverId> {
        let mut ids: Vec<ObserverId> = self.wildcard.iter().copied().collect();
        match cascade {
            PathCascade::Exact => {
                if let Some(exact) = self.by_key.get(key) {
                    ids.extend(exact.iter().copied());
                }
            }
            _ => {
                for (observed, observers) in &self.by_key {
                    if cascade.matches(observed, key) {
                        ids.extend(observers.iter().copied());
                    }
                }
            }
        }
        ids
    }

    /// The selected observers, in registration order.
    pub fn ordered(&self, selected: &HashSet<ObserverId>) -> Vec<Observer> {
        self.observers
            .iter()
            .filter(|(id, _)| selected.contains(*id))
            .map(|(_, observer)| observer.clone())
            .collect()
    }

    pub fn is_registered(&self, id: ObserverId, key: &str) -> bool {
        if key == keys::WILDCARD {
            self.wildcard.contains(&id)
        } else {
            self.by_key.get(key).is_some_and(|ids| ids.contains(&id))
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }
}
