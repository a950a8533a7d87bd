//! Recompute Context
//!
//! Tracks which computed properties are being recomputed on the current
//! thread. A compute body may write to other models, whose delivery may
//! recompute their own computed properties, and so on; this stack is what
//! bounds that cascade.
//!
//! # Implementation
//!
//! A thread-local stack of `(model, name)` entries. Entering pushes, the
//! returned guard pops on drop, so the stack stays balanced even if a
//! compute body panics.

use std::cell::RefCell;

use crate::error::DeliveryError;

use super::ModelId;

thread_local! {
    static RECOMPUTE_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContextEntry {
    model: ModelId,
    name: String,
}

/// Guard that pops the context when dropped.
#[derive(Debug)]
pub struct RecomputeContext {
    model: ModelId,
}

impl RecomputeContext {
    /// Enter the recompute of `name` on `model`.
    ///
    /// Fails if that property is already being recomputed further up the
    /// stack, or if the stack is already `max_depth` deep.
    pub fn enter(model: ModelId, name: &str, max_depth: usize) -> Result<Self, DeliveryError> {
        RECOMPUTE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack
                .iter()
                .any(|entry| entry.model == model && entry.name == name)
            {
                return Err(DeliveryError::RecomputeCycle {
                    model,
                    name: name.to_owned(),
                });
            }
            if stack.len() >= max_depth {
                return Err(DeliveryError::RecomputeLimit {
                    model,
                    name: name.to_owned(),
                    limit: max_depth,
                });
            }
            stack.push(ContextEntry {
                model,
                name: name.to_owned(),
            });
            Ok(Self { model })
        })
    }

    /// Check if any recompute is running on this thread.
    pub fn is_active() -> bool {
        RECOMPUTE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Current nesting depth.
    pub fn depth() -> usize {
        RECOMPUTE_STACK.with(|stack| stack.borrow().len())
    }

    /// The innermost property being recomputed, if any.
    pub fn current() -> Option<(ModelId, String)> {
        RECOMPUTE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| (entry.model, entry.name.clone()))
        })
    }
}

impl Drop for RecomputeContext {
    fn drop(&mut self) {
        RECOMPUTE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.model, self.model,
                    "RecomputeContext mismatch: expected {:?}, got {:?}",
                    self.model, entry.model
                );
            }
        });
    }
}
