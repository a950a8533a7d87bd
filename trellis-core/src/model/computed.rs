//! Computed Property Registry
//!
//! Maps each computed property name to its compute body and the keys it
//! depends on, and answers "which computed properties does a change at this
//! key trigger?" for the delivery loop.
//!
//! # Cycle Detection
//!
//! Recomputing `x` writes `x`, which triggers every computed property with a
//! dependency matching `x`. Registration walks that trigger graph from the
//! new property and rejects it if the walk comes back around, so a cyclic
//! configuration is refused at the call that introduces it rather than
//! discovered mid-delivery.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::PathCascade;
use crate::error::ModelError;
use crate::value::Value;

use super::Model;

/// A compute body. It receives the owning model to read its dependencies.
pub(crate) type ComputeFn = Arc<dyn Fn(&Model) -> Value + Send + Sync>;

#[derive(Clone)]
pub(crate) struct ComputedSpec {
    pub compute: ComputeFn,
    pub depends_on: Vec<String>,
}

/// All computed properties of one model, in registration order.
#[derive(Default)]
pub(crate) struct ComputedRegistry {
    specs: IndexMap<String, ComputedSpec>,
}

impl ComputedRegistry {
    /// Register (or replace) `name`. Fails without modifying the registry if
    /// the new dependency set closes a cycle.
    pub fn register(
        &mut self,
        name: &str,
        spec: ComputedSpec,
        cascade: PathCascade,
    ) -> Result<(), ModelError> {
        if let Some(cycle) = self.find_cycle(name, &spec.depends_on, cascade) {
            return Err(ModelError::ComputedCycle {
                name: name.to_owned(),
                cycle,
            });
        }
        self.specs.insert(name.to_owned(), spec);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<ComputedSpec> {
        self.specs.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ComputedSpec> {
        self.specs.get(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Computed properties with a dependency matching a change at `key`.
    pub fn triggered_by(&self, key: &str, cascade: PathCascade) -> Vec<(String, ComputeFn)> {
        self.specs
            .iter()
            .filter(|(_, spec)| spec.depends_on.iter().any(|dep| cascade.matches(dep, key)))
            .map(|(name, spec)| (name.clone(), Arc::clone(&spec.compute)))
            .collect()
    }

    /// Walk the trigger graph with `name` (re)defined by `deps`.
    ///
    /// Returns the cycle as a chain starting and ending at `name`.
    fn find_cycle(
        &self,
        name: &str,
        deps: &[String],
        cascade: PathCascade,
    ) -> Option<Vec<String>> {
        let mut nodes: Vec<(&str, &[String])> = self
            .specs
            .iter()
            .filter(|(existing, _)| existing.as_str() != name)
            .map(|(existing, spec)| (existing.as_str(), spec.depends_on.as_slice()))
            .collect();
        nodes.push((name, deps));

        let graph: HashMap<&str, Vec<&str>> = nodes
            .iter()
            .map(|(source, _)| {
                let triggered = nodes
                    .iter()
                    .filter(|(_, deps)| deps.iter().any(|dep| cascade.matches(dep, source)))
                    .map(|(target, _)| *target)
                    .collect();
                (*source, triggered)
            })
            .collect();

        let mut chain = vec![name.to_owned()];
        let mut visited = HashSet::new();
        walk(name, name, &graph, &mut visited, &mut chain).then_some(chain)
    }
}

fn walk<'a>(
    current: &'a str,
    target: &str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    chain: &mut Vec<String>,
) -> bool {
    let Some(next_nodes) = graph.get(current) else {
        return false;
    };
    for &next in next_nodes {
        if next == target {
            chain.push(next.to_owned());
            return true;
        }
        if visited.insert(next) {
            chain.push(next.to_owned());
            if walk(next, target, graph, visited, chain) {
                return true;
            }
            chain.pop();
        }
    }
    false
}
