//! Error types and the error-reporting seam.
//!
//! Configuration problems surface synchronously as [`ModelError`] from the
//! call that introduces them. Failures during delivery never abort a cycle;
//! they are handed to the model's [`ErrorReporter`] as [`DeliveryError`]s.

use thiserror::Error;

use crate::model::{ModelId, ObserverId};

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Synchronous configuration errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Registering the computed property would close a dependency cycle.
    #[error("computed property `{name}` forms a dependency cycle: {}", .cycle.join(" -> "))]
    ComputedCycle {
        name: String,
        /// The cycle, starting and ending at `name`.
        cycle: Vec<String>,
    },

    /// The key is engine bookkeeping and cannot be computed.
    #[error("`{key}` is a reserved key")]
    ReservedKey { key: String },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// A path write that could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The array index would need more padding than a single write allows.
    #[error("index {index} at `{path}` is too far past the end of an array of length {len}")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

/// Non-fatal failures reported while delivering a batch.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// An observer panicked; the remaining observers still ran.
    #[error("observer {observer} panicked while handling version {version} of model {model}: {message}")]
    ObserverPanicked {
        model: ModelId,
        observer: ObserverId,
        version: u64,
        message: String,
    },

    /// Observers kept queueing changes past the follow-up cycle limit.
    #[error("model {model} hit the limit of {limit} follow-up cycles; {pending} change(s) remain queued")]
    CascadeLimit {
        model: ModelId,
        limit: usize,
        pending: usize,
    },

    /// A recompute re-entered a computed property already being recomputed.
    #[error("computed property `{name}` of model {model} re-entered its own recompute")]
    RecomputeCycle { model: ModelId, name: String },

    /// A compute body panicked; the property keeps its previous value.
    #[error("computed property `{name}` of model {model} panicked: {message}")]
    ComputePanicked {
        model: ModelId,
        name: String,
        message: String,
    },

    /// Nested recomputes went deeper than allowed.
    #[error("recomputing `{name}` of model {model} exceeded depth {limit}")]
    RecomputeLimit {
        model: ModelId,
        name: String,
        limit: usize,
    },
}

/// Receives delivery failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &DeliveryError);
}

/// Default reporter: logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &DeliveryError) {
        tracing::error!(error = %error, "model delivery failure");
    }
}
