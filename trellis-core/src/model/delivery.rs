//! Delivery Cycle
//!
//! Turns the pending queue into batches and hands them to observers.
//!
//! # How It Works
//!
//! 1. Pop records off the pending queue one at a time. For each record,
//!    select the interested observers (exact key, cascade policy, wildcard)
//!    without calling them yet.
//!
//! 2. If the record's key is a dependency of a computed property, run the
//!    compute body and apply the result. Its record lands in the same queue
//!    being drained, so dependency and derived value share one batch.
//!
//! 3. Once the queue is empty, append the version bump and build the batch.
//!
//! 4. Call every selected observer exactly once, in registration order,
//!    with the whole batch. A panicking observer is reported and skipped.
//!
//! 5. Records queued by observers while step 4 ran form the next cycle,
//!    which starts only after the current one has finished.
//!
//! 6. Nested models that received writes routed through this model are
//!    delivered last, each with its own batch and version bump.
//!
//! The state lock is only ever held between user callbacks, never across
//! them, so observers and compute bodies are free to read and write the
//! model they are attached to.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use crate::change::ChangeSet;
use crate::error::DeliveryError;
use crate::path::Path;

use super::computed::ComputeFn;
use super::context::RecomputeContext;
use super::observer::Observer;
use super::Model;

/// Clears the delivering flag when the loop exits, including by panic.
struct DeliveringGuard<'a> {
    model: &'a Model,
}

impl Drop for DeliveringGuard<'_> {
    fn drop(&mut self) {
        self.model.with_state(|state| state.delivering = false);
    }
}

impl Model {
    /// Drain the pending queue into as many cycles as it takes.
    ///
    /// A call made while this model is already delivering (from an observer
    /// or compute body) leaves the queue alone; the running loop picks its
    /// records up as the next cycle. Nested models written through this one
    /// are delivered afterwards, each as its own batch.
    pub(crate) fn deliver(&self) {
        let _gate = self.inner.gate.lock();
        self.drain();
        self.deliver_nested();
    }

    fn deliver_nested(&self) {
        let nested = self.with_state(|state| std::mem::take(&mut state.nested));
        for model in nested {
            model.deliver();
        }
    }

    fn drain(&self) {
        let already_delivering =
            self.with_state(|state| std::mem::replace(&mut state.delivering, true));
        if already_delivering {
            return;
        }
        let _delivering = DeliveringGuard { model: self };

        let limit = self.inner.config.max_cascade_cycles;
        let mut cycles = 0usize;
        loop {
            let pending = self.with_state(|state| state.pending.len());
            if pending == 0 {
                break;
            }
            if cycles > limit {
                self.report(DeliveryError::CascadeLimit {
                    model: self.id(),
                    limit,
                    pending,
                });
                break;
            }
            self.run_cycle();
            cycles += 1;
        }
    }

    fn run_cycle(&self) {
        let cascade = self.inner.config.cascade;
        let span = tracing::debug_span!("deliver", model = %self.id());
        let _enter = span.enter();

        let mut batch = Vec::new();
        let mut selected = HashSet::new();
        loop {
            let next = self.with_state(|state| {
                let change = state.pending.pop_front()?;
                selected.extend(state.observers.interested(&change.key, cascade));
                let triggered = state.computed.triggered_by(&change.key, cascade);
                Some((change, triggered))
            });
            let Some((change, triggered)) = next else {
                break;
            };
            tracing::trace!(change = %change, "processing change");
            batch.push(change);
            for (name, compute) in triggered {
                self.recompute(&name, &compute);
            }
        }
        if batch.is_empty() {
            return;
        }

        let (changes, observers) = self.with_state(|state| {
            let bump = state.bump_version();
            selected.extend(state.observers.interested(&bump.key, cascade));
            batch.push(bump);
            let observers = state.observers.ordered(&selected);
            (ChangeSet::new(std::mem::take(&mut batch), state.version), observers)
        });

        tracing::debug!(
            version = changes.version(),
            changes = changes.len(),
            observers = observers.len(),
            "dispatching batch"
        );
        for observer in &observers {
            self.dispatch(observer, &changes);
        }
    }

    /// Run one compute body and apply its result with observers deferred.
    /// A body that panics is reported and the property keeps its old value.
    pub(crate) fn recompute(&self, name: &str, compute: &ComputeFn) {
        let depth = self.inner.config.max_recompute_depth;
        let _ctx = match RecomputeContext::enter(self.id(), name, depth) {
            Ok(ctx) => ctx,
            Err(error) => {
                self.report(error);
                return;
            }
        };
        match panic::catch_unwind(AssertUnwindSafe(|| compute(self))) {
            Ok(value) => self.apply_path(&Path::parse(name), Some(value), false),
            Err(payload) => self.report(DeliveryError::ComputePanicked {
                model: self.id(),
                name: name.to_owned(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn dispatch(&self, observer: &Observer, changes: &ChangeSet) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(changes)));
        if let Err(payload) = outcome {
            self.report(DeliveryError::ObserverPanicked {
                model: self.id(),
                observer: observer.id(),
                version: changes.version(),
                message: panic_message(payload.as_ref()),
            });
        }
    }

    pub(crate) fn report(&self, error: DeliveryError) {
        self.inner.reporter.report(&error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
