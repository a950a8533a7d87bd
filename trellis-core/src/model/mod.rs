//! Observable Model
//!
//! A [`Model`] owns a nested key/value store and notifies observers of
//! changes in batches.
//!
//! # Concepts
//!
//! ## Batches
//!
//! Every mutation queues [`Change`](crate::Change) records. Unless the
//! caller defers it with `skip_observers`, the mutation then runs a
//! delivery cycle: the queue is drained, computed properties are brought up
//! to date inside the same batch, the version is bumped, and each
//! interested observer is called once with the whole batch.
//!
//! ## Computed Properties
//!
//! A computed property is an ordinary key whose value is written by the
//! engine whenever one of its dependencies changes. Dependency cycles are
//! rejected when the property is registered.
//!
//! ## Observers
//!
//! Observers are registered per key, or under the wildcard to see every
//! batch. They are handles with a stable identity; see [`Observer`].
//!
//! # Thread Safety
//!
//! A `Model` is a cheap, shareable handle. Each mutate-then-deliver sequence
//! runs under a reentrant gate lock, so concurrent callers are serialized
//! while observers on the delivering thread may still write back into the
//! model. Models are meant to have one logical owner; two threads whose
//! observers write into each other's models can deadlock.

mod computed;
mod context;
mod delivery;
mod matcher;
mod observer;
mod state;

pub use context::RecomputeContext;
pub use matcher::Matcher;
pub use observer::{Observer, ObserverId};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use serde::Serialize;

use crate::config::ModelConfig;
use crate::error::{ErrorReporter, ModelError, ModelResult, TracingReporter};
use crate::keys;
use crate::path::{self, Path};
use crate::value::{Object, Value};

use computed::ComputedSpec;
pub(crate) use state::ModelState;

/// Unique identifier for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelId(u64);

impl ModelId {
    /// Generate a new unique model ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Options for a single write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Record an `update` even if the value is unchanged.
    pub force: bool,
    /// Queue the record but do not run a delivery cycle.
    pub skip_observers: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with `force` set.
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    /// Options with `skip_observers` set.
    pub fn silent() -> Self {
        Self {
            skip_observers: true,
            ..Self::default()
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_skip_observers(mut self, skip: bool) -> Self {
        self.skip_observers = skip;
        self
    }
}

struct ModelInner {
    id: ModelId,
    config: ModelConfig,
    reporter: Arc<dyn ErrorReporter>,
    /// Held across every mutate-then-deliver sequence.
    gate: ReentrantMutex<()>,
    state: Mutex<ModelState>,
}

/// A reactive key/value container.
///
/// # Example
///
/// ```rust
/// use trellis_core::{Model, Observer, Value};
///
/// let model = Model::new();
/// model
///     .compute(
///         "full_name",
///         |m| {
///             let parts: Vec<String> = ["first", "last"]
///                 .iter()
///                 .filter_map(|key| m.get(*key))
///                 .map(|value| value.to_string())
///                 .collect();
///             Value::from(parts.join(" "))
///         },
///         ["first", "last"],
///     )
///     .unwrap();
///
/// model.sets([("first", "Doug"), ("last", "Wilson")]);
/// assert_eq!(model.get("full_name"), Some(Value::from("Doug Wilson")));
/// ```
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

/// Builder for a [`Model`] with non-default configuration.
#[derive(Default)]
pub struct ModelBuilder {
    data: Object,
    config: ModelConfig,
    reporter: Option<Arc<dyn ErrorReporter>>,
    reserved: &'static [&'static str],
}

impl ModelBuilder {
    /// Initial store contents. Must be an object; anything else is ignored.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        match data.into() {
            Value::Object(map) => self.data = map,
            other => {
                tracing::warn!(kind = other.type_name(), "model data must be an object; ignoring");
            }
        }
        self
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Where delivery failures go. Defaults to [`TracingReporter`].
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub(crate) fn reserved(mut self, keys: &'static [&'static str]) -> Self {
        self.reserved = keys;
        self
    }

    pub fn build(self) -> Model {
        let id = ModelId::new();
        let state = ModelState::new(id, self.data, self.config.track_timestamps, self.reserved);
        Model {
            inner: Arc::new(ModelInner {
                id,
                config: self.config,
                reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
                gate: ReentrantMutex::new(()),
                state: Mutex::new(state),
            }),
        }
    }
}

impl Model {
    /// An empty model with default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// A model seeded with `data` (an object). Seeding does not notify.
    pub fn from_data(data: impl Into<Value>) -> Self {
        Self::builder().data(data).build()
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn id(&self) -> ModelId {
        self.inner.id
    }

    pub fn config(&self) -> &ModelConfig {
        &self.inner.config
    }

    /// Number of non-empty delivery cycles so far, plus one.
    pub fn version(&self) -> u64 {
        self.with_state(|state| state.version)
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ModelState) -> R) -> R {
        f(&mut self.inner.state.lock())
    }

    pub(crate) fn gate(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.gate.lock()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The value at `key`, or `None` if the path does not resolve.
    pub fn get(&self, key: impl Into<Path>) -> Option<Value> {
        let path = key.into();
        self.with_state(|state| state.read(&path))
    }

    /// The present values among `keys`; absent keys are omitted.
    pub fn gets<I, K>(&self, keys: I) -> IndexMap<String, Value>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .filter_map(|key| {
                let key = key.as_ref();
                self.get(key).map(|value| (key.to_owned(), value))
            })
            .collect()
    }

    pub fn has(&self, key: impl Into<Path>) -> bool {
        let path = key.into();
        self.with_state(|state| state.exists(&path))
    }

    pub fn has_any<I, K>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter().any(|key| self.has(key.as_ref()))
    }

    pub fn has_all<I, K>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter().all(|key| self.has(key.as_ref()))
    }

    /// Test the value at `key` against a literal or a pattern.
    pub fn test(&self, key: impl Into<Path>, matcher: impl Into<Matcher>) -> bool {
        matcher.into().matches(self.get(key).as_ref())
    }

    /// A copy of the whole store, `version` included.
    pub fn snapshot(&self) -> Value {
        self.with_state(|state| state.store.clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.snapshot().to_json()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn set(&self, key: impl Into<Path>, value: impl Into<Value>) -> &Self {
        self.set_with(key, value, SetOptions::default())
    }

    pub fn set_with(
        &self,
        key: impl Into<Path>,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> &Self {
        self.write_path(key.into(), Some(value.into()), options);
        self
    }

    /// Make `key` absent.
    pub fn unset(&self, key: impl Into<Path>) -> &Self {
        self.unset_with(key, SetOptions::default())
    }

    pub fn unset_with(&self, key: impl Into<Path>, options: SetOptions) -> &Self {
        self.write_path(key.into(), None, options);
        self
    }

    /// Apply several writes as one batch.
    pub fn sets<I, K, V>(&self, entries: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Path>,
        V: Into<Value>,
    {
        self.sets_with(entries, SetOptions::default())
    }

    pub fn sets_with<I, K, V>(&self, entries: I, options: SetOptions) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Path>,
        V: Into<Value>,
    {
        let _gate = self.gate();
        let deferred = options.with_skip_observers(true);
        for (key, value) in entries {
            self.write_path(key.into(), Some(value.into()), deferred);
        }
        if !options.skip_observers {
            self.deliver();
        }
        self
    }

    /// Make every present top-level key absent, except reserved ones, in one batch.
    pub fn reset(&self) -> &Self {
        self.reset_with(SetOptions::default())
    }

    pub fn reset_with(&self, options: SetOptions) -> &Self {
        let _gate = self.gate();
        let keys = self.with_state(|state| state.resettable_keys());
        let deferred = options.with_skip_observers(true);
        for key in keys {
            self.write_path(Path::from_segments([key]), None, deferred);
        }
        if !options.skip_observers {
            self.deliver();
        }
        self
    }

    /// Deliver records left queued by `skip_observers` writes.
    pub fn flush(&self) -> &Self {
        self.deliver();
        self
    }

    fn write_path(&self, path: Path, value: Option<Value>, options: SetOptions) {
        if path.is_empty() {
            tracing::warn!(model = %self.id(), "ignoring write to the store root");
            return;
        }
        if path.first() == Some(keys::VERSION) {
            tracing::warn!(model = %self.id(), key = %path, "version is maintained by the model; write ignored");
            return;
        }

        let _gate = self.gate();
        self.apply_path(&path, value, options.force);
        if !options.skip_observers {
            self.deliver();
        }
    }

    /// Apply one write without delivering. A write that crosses a nested
    /// model is handed to that model, which is delivered after this one.
    fn apply_path(&self, path: &Path, value: Option<Value>, force: bool) {
        let nested = self.with_state(|state| path::nested_model(&state.store, path));
        match nested {
            Some((model, rest)) => {
                let deferred = SetOptions::default().with_force(force).with_skip_observers(true);
                model.write_path(rest, value, deferred);
                self.with_state(|state| state.defer_nested(model));
            }
            None => {
                self.with_state(|state| state.apply(path, value, force));
            }
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    /// Register `observer` under each of `keys`, or under the wildcard if
    /// `keys` is empty. Registering twice under the same key is a no-op.
    pub fn observe<I, K>(&self, observer: &Observer, keys: I) -> &Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.with_state(|state| {
            let mut any = false;
            for key in keys {
                state.observers.register(observer, key.as_ref());
                any = true;
            }
            if !any {
                state.observers.register(observer, keys::WILDCARD);
            }
        });
        self
    }

    /// Register `observer` for every batch.
    pub fn observe_all(&self, observer: &Observer) -> &Self {
        self.with_state(|state| {
            state.observers.register(observer, keys::WILDCARD);
        });
        self
    }

    /// Remove `observer` from each of `keys`, or from everything if `keys`
    /// is empty.
    pub fn unobserve<I, K>(&self, observer: &Observer, keys: I) -> &Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.with_state(|state| {
            let mut any = false;
            for key in keys {
                state.observers.unregister(observer.id(), key.as_ref());
                any = true;
            }
            if !any {
                state.observers.unregister_all(observer.id());
            }
        });
        self
    }

    pub fn unobserve_all(&self, observer: &Observer) -> &Self {
        self.with_state(|state| state.observers.unregister_all(observer.id()));
        self
    }

    pub fn is_observing(&self, observer: &Observer, key: &str) -> bool {
        self.with_state(|state| state.observers.is_registered(observer.id(), key))
    }

    pub fn observer_count(&self) -> usize {
        self.with_state(|state| state.observers.len())
    }

    // ------------------------------------------------------------------
    // Computed properties
    // ------------------------------------------------------------------

    /// Make `name` a computed property of `deps`.
    ///
    /// The body runs immediately to seed the value (delivered as its own
    /// batch if it differs from the current one) and again, inside the
    /// triggering batch, whenever a dependency changes.
    pub fn compute<F, I, K>(&self, name: &str, compute: F, deps: I) -> ModelResult<&Self>
    where
        F: Fn(&Model) -> Value + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let path = Path::parse(name);
        if path.is_empty() || matches!(name, keys::VERSION | keys::WILDCARD | keys::ITEMS_INDEX) {
            return Err(ModelError::ReservedKey {
                key: name.to_owned(),
            });
        }

        let _gate = self.gate();
        let spec = ComputedSpec {
            compute: Arc::new(compute),
            depends_on: deps.into_iter().map(|dep| dep.as_ref().to_owned()).collect(),
        };
        let compute = Arc::clone(&spec.compute);
        let cascade = self.inner.config.cascade;
        self.with_state(|state| {
            if state.exists(&path) && !state.computed.contains(name) {
                tracing::warn!(
                    model = %self.id(),
                    key = name,
                    "computed property shadows an existing key; manual writes will be overwritten"
                );
            }
            state.computed.register(name, spec, cascade)
        })?;

        self.recompute(name, &compute);
        self.deliver();
        Ok(self)
    }

    /// Stop recomputing `name`. Its last value stays as an ordinary key.
    pub fn remove_computed(&self, name: &str) -> &Self {
        self.with_state(|state| state.computed.remove(name));
        self
    }

    pub fn is_computed(&self, name: &str) -> bool {
        self.with_state(|state| state.computed.contains(name))
    }

    /// Dependencies declared for a computed property.
    pub fn dependencies(&self, name: &str) -> Option<Vec<String>> {
        self.with_state(|state| state.computed.get(name).map(|spec| spec.depends_on.clone()))
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Model {}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model").field("id", &self.inner.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
