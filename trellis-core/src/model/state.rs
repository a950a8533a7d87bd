//! Lock-protected model state.
//!
//! Everything here runs with the state mutex held and never calls back into
//! user code. `apply` is the single place where the no-op equality rule,
//! record construction and timestamp tracking happen.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::change::{Change, ChangeKind};
use crate::keys;
use crate::path::{self, Path};
use crate::value::{Object, Value};

use super::computed::ComputedRegistry;
use super::observer::ObserverRegistry;
use super::{Model, ModelId};

pub(crate) struct ModelState {
    owner: ModelId,
    /// Root of the nested store; always an object.
    pub store: Value,
    pub version: u64,
    pub pending: VecDeque<Change>,
    pub observers: ObserverRegistry,
    pub computed: ComputedRegistry,
    /// Set while a delivery loop is draining `pending`.
    pub delivering: bool,
    /// Nested models that took writes routed through this one and still
    /// owe a delivery.
    pub nested: Vec<Model>,
    /// Extra top-level keys skipped by `reset`.
    pub reserved: &'static [&'static str],
    track_timestamps: bool,
}

impl ModelState {
    pub fn new(
        owner: ModelId,
        mut data: Object,
        track_timestamps: bool,
        reserved: &'static [&'static str],
    ) -> Self {
        data.insert(keys::VERSION.to_owned(), Value::from(1u64));
        Self {
            owner,
            store: Value::Object(data),
            version: 1,
            pending: VecDeque::new(),
            observers: ObserverRegistry::default(),
            computed: ComputedRegistry::default(),
            delivering: false,
            nested: Vec::new(),
            reserved,
            track_timestamps,
        }
    }

    pub fn read(&self, path: &Path) -> Option<Value> {
        path::read(&self.store, path)
    }

    pub fn exists(&self, path: &Path) -> bool {
        path::exists(&self.store, path)
    }

    /// Write (or, with `None`, remove) the value at `path`, queueing a record
    /// unless nothing notifiable happened. Returns whether a record was queued.
    pub fn apply(&mut self, path: &Path, value: Option<Value>, force: bool) -> bool {
        let old = self.read(path);
        match (&old, &value) {
            (None, None) => return false,
            (Some(old), Some(new)) if old == new && !force => return false,
            _ => {}
        }
        match &value {
            Some(new) => {
                if let Err(error) = path::write(&mut self.store, path, new.clone()) {
                    tracing::warn!(model = %self.owner, error = %error, "write refused");
                    return false;
                }
            }
            None => {
                path::remove(&mut self.store, path);
            }
        }
        match Change::keyed(self.owner, path.to_string(), old, value) {
            Some(change) => {
                self.record(change);
                true
            }
            None => false,
        }
    }

    pub fn defer_nested(&mut self, model: Model) {
        if !self.nested.contains(&model) {
            self.nested.push(model);
        }
    }

    /// Queue a record built elsewhere, tracking timestamps for it.
    pub fn record(&mut self, change: Change) {
        let tracked = self.track_timestamps && !keys::is_untracked(&change.key);
        self.pending.push_back(change);
        if tracked {
            self.touch_timestamps();
        }
    }

    fn touch_timestamps(&mut self) {
        let now = Value::from(now_millis());
        let created = Path::parse(keys::CREATED_AT);
        if !self.exists(&created) {
            self.apply(&created, Some(now.clone()), false);
        }
        self.apply(&Path::parse(keys::UPDATED_AT), Some(now), false);
    }

    /// Mutable access to a top-level store entry, inserting `default` if absent.
    pub fn entry_mut(&mut self, key: &str, default: Value) -> &mut Value {
        if !self.store.is_object() {
            self.store = Value::Object(Object::new());
        }
        match &mut self.store {
            Value::Object(map) => map.entry(key.to_owned()).or_insert(default),
            _ => unreachable!("store root is always an object"),
        }
    }

    /// Present top-level keys that `reset` may clear.
    pub fn resettable_keys(&self) -> Vec<String> {
        self.store
            .as_object()
            .map(|map| {
                map.keys()
                    .filter(|key| key.as_str() != keys::VERSION)
                    .filter(|key| !self.reserved.contains(&key.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Increment the version and return its `update` record.
    pub fn bump_version(&mut self) -> Change {
        let old = self.version;
        self.version += 1;
        let new = Value::from(self.version);
        *self.entry_mut(keys::VERSION, Value::Null) = new.clone();
        Change::new(ChangeKind::Update, self.owner, keys::VERSION)
            .with_old_value(Some(Value::from(old)))
            .with_value(Some(new))
    }
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as f64)
        .unwrap_or_default()
}
