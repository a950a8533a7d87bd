//! Trellis Core
//!
//! This crate provides the observable data layer of the Trellis client
//! toolkit. It implements:
//!
//! - An observable key/value [`Model`] with dotted-path addressing
//! - Change batching: one notification per observer per delivery cycle
//! - Computed properties that land in the same batch as their dependencies
//! - An ordered [`List`] whose mutations are described index by index
//!
//! Everything that renders, binds, validates or persists is a consumer of
//! this crate: it calls `get`/`set`/`observe` and reacts to the
//! [`ChangeSet`]s the engine produces.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `path`: Parsed dotted paths and the read/write/exists accessor
//! - `change`: Change records and the batch type handed to observers
//! - `model`: The observable model, its observer registry and delivery loop
//! - `list`: The ordered collection built on top of a model
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{Model, Observer};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let model = Model::new();
//! let calls = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&calls);
//! let observer = Observer::new(move |changes| {
//!     assert!(changes.has_all(["first", "last"]));
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//! model.observe(&observer, ["first", "last"]);
//!
//! // One batch, one call
//! model.sets([("first", "Doug"), ("last", "Wilson")]);
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//! assert_eq!(model.version(), 2);
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod keys;
pub mod list;
pub mod model;
pub mod path;
pub mod value;

pub use change::{Change, ChangeKind, ChangeQuery, ChangeSet};
pub use config::{ListConfig, ModelConfig, PathCascade};
pub use error::{
    DeliveryError, ErrorReporter, ModelError, ModelResult, PathError, TracingReporter,
};
pub use list::{List, ListKey};
pub use model::{Matcher, Model, ModelBuilder, ModelId, Observer, ObserverId, SetOptions};
pub use path::Path;
pub use value::{Object, Value};
