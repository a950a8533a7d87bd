//! Model and list configuration.
//!
//! Configuration is plain data with serde defaults, so it can be embedded in
//! an application's own config file or built in code:
//!
//! ```rust
//! use trellis_core::{ModelConfig, PathCascade};
//!
//! let config = ModelConfig::from_json(r#"{"cascade": "ancestors"}"#).unwrap();
//! assert_eq!(config.cascade, PathCascade::Ancestors);
//! assert_eq!(config.max_cascade_cycles, 32);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::path::Path;

/// Whether a change at one path notifies observers of related paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCascade {
    /// Only the exact changed key matches.
    #[default]
    Exact,
    /// A change at `foo.bar` also matches `foo`.
    Ancestors,
    /// A change at `foo` also matches `foo.bar`.
    Descendants,
    /// Both of the above.
    Both,
}

impl PathCascade {
    /// Does a change at `changed` notify interest registered at `observed`?
    pub fn matches(&self, observed: &str, changed: &str) -> bool {
        if observed == changed {
            return true;
        }
        if *self == PathCascade::Exact {
            return false;
        }
        let observed = Path::parse(observed);
        let changed = Path::parse(changed);
        match self {
            PathCascade::Exact => false,
            PathCascade::Ancestors => observed.is_ancestor_of(&changed),
            PathCascade::Descendants => changed.is_ancestor_of(&observed),
            PathCascade::Both => {
                observed.is_ancestor_of(&changed) || changed.is_ancestor_of(&observed)
            }
        }
    }
}

/// Behaviour knobs for a [`Model`](crate::Model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Parent/child path notification policy, for observers and computed
    /// dependencies alike.
    pub cascade: PathCascade,
    /// Maintain `created_at` / `updated_at` on every tracked change.
    pub track_timestamps: bool,
    /// Follow-up cycles (queued by observers) allowed per delivery call.
    pub max_cascade_cycles: usize,
    /// Nested recompute depth allowed on one thread.
    pub max_recompute_depth: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            cascade: PathCascade::Exact,
            track_timestamps: false,
            max_cascade_cycles: 32,
            max_recompute_depth: 64,
        }
    }
}

impl ModelConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_cascade(mut self, cascade: PathCascade) -> Self {
        self.cascade = cascade;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.track_timestamps = enabled;
        self
    }

    pub fn with_max_cascade_cycles(mut self, cycles: usize) -> Self {
        self.max_cascade_cycles = cycles;
        self
    }

    pub fn with_max_recompute_depth(mut self, depth: usize) -> Self {
        self.max_recompute_depth = depth;
        self
    }
}

/// Configuration for a [`List`](crate::List).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    #[serde(flatten)]
    pub model: ModelConfig,
    /// Wrap inserted plain objects into models.
    pub cast: bool,
}

impl ListConfig {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_cast(mut self, cast: bool) -> Self {
        self.cast = cast;
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }
}
