//! Integration Tests for Models and Lists
//!
//! These tests drive the public API the way binding, rendering and
//! validation code does, and check what observers actually receive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use trellis_core::{
    ChangeKind, ChangeQuery, ChangeSet, DeliveryError, ErrorReporter, List, ListConfig, Model,
    ModelConfig, Observer, PathCascade, SetOptions, Value,
};

/// Observer that stores every batch it receives.
fn recorder() -> (Observer, Arc<Mutex<Vec<ChangeSet>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer = Observer::new(move |changes| sink.lock().push(changes.clone()));
    (observer, seen)
}

#[derive(Default)]
struct CollectingReporter(Mutex<Vec<DeliveryError>>);

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: &DeliveryError) {
        self.0.lock().push(error.clone());
    }
}

fn full_name(model: &Model) -> Value {
    let parts: Vec<String> = ["first", "last"]
        .iter()
        .filter_map(|key| model.get(*key))
        .filter(|value| !value.is_null())
        .map(|value| value.to_string())
        .collect();
    Value::from(parts.join(" "))
}

/// A computed property observed on its own name sees one batch carrying
/// both inputs and the derived value.
#[test]
fn computed_full_name_is_delivered_with_its_inputs() {
    let model = Model::from_data(json!({}));
    let (observer, seen) = recorder();
    model.observe(&observer, ["full_name"]);
    model
        .compute("full_name", full_name, ["first", "last"])
        .unwrap();

    // Seeding to "" is a real change and is delivered on its own
    seen.lock().clear();

    model.sets([("first", "Doug"), ("last", "Wilson")]);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let batch = &seen[0];
    assert_eq!(
        batch.get("full_name").and_then(|c| c.value.clone()),
        Some(Value::from("Doug Wilson"))
    );
    assert!(batch.has("first"));
    assert_eq!(batch.as_slice().last().unwrap().key, "version");
}

/// Computed coherence: an observer of one input sees the derived value too.
#[test]
fn observer_of_an_input_sees_the_computed_change() {
    let model = Model::new();
    let (observer, seen) = recorder();
    model.observe(&observer, ["first"]);
    model
        .compute("full_name", full_name, ["first", "last"])
        .unwrap();

    model.set("first", "Ada");
    assert_eq!(model.get("full_name"), Some(Value::from("Ada")));
    assert!(seen.lock()[0].has_all(["first", "full_name"]));
}

/// Insert into the middle of a list.
#[test]
fn list_insert_delivers_item_add_and_length_together() {
    let list = List::new(["a", "b", "c", "d"]);
    let (observer, seen) = recorder();
    list.observe(&observer, ["items*", "items", "length"]);

    list.insert(1, "x");

    assert_eq!(list.get(1), Some(Value::from("x")));
    assert_eq!(list.get(2), Some(Value::from("b")));
    assert_eq!(list.len(), 5);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let adds = seen[0].query_all(&ChangeQuery::new().kind(ChangeKind::ItemAdd));
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].index, Some(1));
    let length = seen[0].get("length").unwrap();
    assert_eq!(length.old_value, Some(Value::from(4)));
    assert_eq!(length.value, Some(Value::from(5)));
}

/// Writes deferred with `skip_observers` fold into the next delivery.
#[test]
fn deferred_writes_form_one_batch() {
    let model = Model::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let (observer, seen) = recorder();
    let counter = Arc::clone(&calls);
    let counting = Observer::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    model.observe(&observer, ["a", "c"]).observe(&counting, ["b"]);

    model.set_with("a", 1, SetOptions::silent());
    model.sets_with([("b", 2)], SetOptions::silent());
    model.set("c", 3);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].keys(), vec!["a", "b", "c", "version"]);
    assert_eq!(model.version(), 2);
}

/// Every observer of one batch gets the same shared batch.
#[test]
fn observers_share_one_batch() {
    let model = Model::new();
    let (first, first_seen) = recorder();
    let (second, second_seen) = recorder();
    model.observe(&first, ["a"]).observe(&second, ["b"]);

    model.sets([("a", 1), ("b", 2)]);

    let first_seen = first_seen.lock();
    let second_seen = second_seen.lock();
    assert!(first_seen[0].same_batch(&second_seen[0]));
    assert_eq!(first_seen[0].len(), 3);
}

/// Observers run in registration order.
#[test]
fn observers_run_in_registration_order() {
    let model = Model::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let observers: Vec<Observer> = (0..3)
        .map(|n| {
            let order = Arc::clone(&order);
            Observer::new(move |_| order.lock().push(n))
        })
        .collect();
    model.observe(&observers[2], ["x"]);
    model.observe_all(&observers[0]);
    model.observe(&observers[1], ["x"]);

    model.set("x", true);
    assert_eq!(*order.lock(), vec![2, 0, 1]);
}

/// Version monotonicity across cycles of different sizes.
#[test]
fn version_counts_delivery_cycles() {
    let model = Model::new();
    let start = model.version();

    model.set("a", 1);
    model.sets([("b", 1), ("c", 2), ("d", 3)]);
    model.set("a", 1); // no-op
    model.unset("b");

    assert_eq!(model.version(), start + 3);
}

/// A panicking observer is reported; others in the batch still run.
#[test]
fn observer_panics_are_isolated() {
    let reporter = Arc::new(CollectingReporter::default());
    let model = Model::builder()
        .data(json!({"a": 0}))
        .reporter(reporter.clone())
        .build();

    let (before, before_seen) = recorder();
    let failing = Observer::new(|_| panic!("boom"));
    let (after, after_seen) = recorder();
    model
        .observe(&before, ["a"])
        .observe(&failing, ["a"])
        .observe(&after, ["a"]);

    model.set("a", 1);
    model.set("a", 2);

    assert_eq!(before_seen.lock().len(), 2);
    assert_eq!(after_seen.lock().len(), 2);
    assert_eq!(reporter.0.lock().len(), 2);
    assert_eq!(model.get("a"), Some(Value::from(2)));
}

/// Records left queued by the cascade limit go out with the next delivery.
#[test]
fn cascade_limit_keeps_records_queued() {
    let reporter = Arc::new(CollectingReporter::default());
    let model = Model::builder()
        .config(ModelConfig::default().with_max_cascade_cycles(0))
        .reporter(reporter.clone())
        .build();

    let echo = {
        let model = model.clone();
        Observer::new(move |changes| {
            if changes.has("ping") {
                model.set("pong", true);
            }
        })
    };
    model.observe(&echo, ["ping"]);

    model.set("ping", 1);
    assert_eq!(model.get("pong"), Some(Value::from(true)));
    assert_eq!(model.version(), 2);
    assert!(matches!(
        reporter.0.lock().as_slice(),
        [DeliveryError::CascadeLimit { pending: 1, .. }]
    ));

    model.flush();
    assert_eq!(model.version(), 3);
}

/// An observer writing to a different model starts that model's cycle.
#[test]
fn observers_can_write_to_other_models() {
    let source = Model::new();
    let target = Model::new();
    let (observer, seen) = recorder();
    target.observe(&observer, ["mirror"]);

    let bridge = {
        let target = target.clone();
        Observer::new(move |changes| {
            if let Some(change) = changes.get("value") {
                target.set("mirror", change.value.clone());
            }
        })
    };
    source.observe(&bridge, ["value"]);

    source.set("value", "hello");
    assert_eq!(target.get("mirror"), Some(Value::from("hello")));
    assert_eq!(seen.lock().len(), 1);
}

/// Parent/child notification under each cascade policy.
#[test]
fn cascade_policies() {
    let cases = [
        (PathCascade::Exact, false, false),
        (PathCascade::Ancestors, true, false),
        (PathCascade::Descendants, false, true),
        (PathCascade::Both, true, true),
    ];
    for (policy, parent_notified, child_notified) in cases {
        let model = Model::with_config(ModelConfig::default().with_cascade(policy));
        let (parent, parent_seen) = recorder();
        let (child, child_seen) = recorder();
        model.observe(&parent, ["user"]).observe(&child, ["user.name"]);

        model.set("user.name", "Ada");
        assert_eq!(!parent_seen.lock().is_empty(), parent_notified, "{policy:?} parent");
        child_seen.lock().clear();

        model.set("user", json!({"name": "Grace"}));
        assert_eq!(!child_seen.lock().is_empty(), child_notified, "{policy:?} child");
    }
}

/// Validation-style write-back through nested paths.
#[test]
fn nested_paths_create_intermediates() {
    let model = Model::new();
    let (observer, seen) = recorder();
    model.observe(&observer, ["validation_errors.email"]);

    model.set("validation_errors.email", Value::array(["is required"]));
    assert_eq!(
        model.to_json()["validation_errors"],
        json!({"email": ["is required"]})
    );
    assert_eq!(seen.lock()[0].get("validation_errors.email").unwrap().kind, ChangeKind::Add);
    assert_eq!(model.get("validation_errors.missing.deeper"), None);
}

/// Replacing a list reconciles through deletes then adds.
#[test]
fn list_replacement_round_trip() {
    let list = List::new([1, 2, 3]);
    let (observer, seen) = recorder();
    list.observe(&observer, ["items*", "items", "length"]);

    list.set("items", Value::array([4, 5]));
    list.set("items", Value::array([6, 7]));

    assert_eq!(list.get("items"), Some(Value::array([6, 7])));
    let seen = seen.lock();
    assert_eq!(seen.len(), 2);

    let deletes = seen[0].query_all(&ChangeQuery::new().kind(ChangeKind::ItemDelete));
    let indices: Vec<_> = deletes.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![Some(2), Some(1), Some(0)]);
    assert!(seen[0].has("length"));
    assert!(!seen[1].has("length"));
}

/// Cast lists hand out models that can be observed independently.
#[test]
fn cast_items_are_observable_models() {
    let list = List::with_config(
        vec![json!({"title": "write tests", "done": false})],
        ListConfig::default().with_cast(true),
    );
    let item = list.get(0).and_then(|v| v.as_model().cloned()).unwrap();
    let (observer, seen) = recorder();
    item.observe(&observer, ["done"]);

    list.model().set("items.0.done", true);
    assert_eq!(item.get("done"), Some(Value::from(true)));
    assert_eq!(seen.lock().len(), 1);
}

/// A model can be driven from another thread.
#[test]
fn model_is_shareable_across_threads() {
    let model = Model::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    model.observe_all(&Observer::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let model = model.clone();
            std::thread::spawn(move || {
                model.set(format!("key{n}"), n);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(model.version(), 5);
}

/// A form model editing a nested address model in one batched call.
#[test]
fn form_batch_reaches_the_nested_model() {
    let address = Model::from_data(json!({"street": "Storgata 1", "city": "Oslo"}));
    let form = Model::from_data(Value::object([
        ("name", Value::from("Ada")),
        ("address", Value::Model(address.clone())),
    ]));
    let (address_observer, address_seen) = recorder();
    let (form_observer, form_seen) = recorder();
    address.observe(&address_observer, ["street", "city"]);
    form.observe(&form_observer, ["name"]);

    form.sets([
        ("name", Value::from("Grace")),
        ("address.street", Value::from("Bryggen 2")),
        ("address.city", Value::from("Bergen")),
    ]);

    let address_seen = address_seen.lock();
    assert_eq!(address_seen.len(), 1);
    assert!(address_seen[0].has_all(["street", "city"]));
    assert_eq!(address.version(), 2);
    assert_eq!(form_seen.lock().len(), 1);
    assert!(form.get("address").is_some_and(|v| v.as_model() == Some(&address)));
}

/// A failing derived value does not block the writes that triggered it.
#[test]
fn failing_compute_is_reported_without_losing_the_batch() {
    let reporter = Arc::new(CollectingReporter::default());
    let model = Model::builder()
        .data(json!({"amount": 10, "rate": 2}))
        .reporter(reporter.clone())
        .build();
    model
        .compute(
            "per_unit",
            |m| {
                let amount = m.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let rate = m.get("rate").and_then(|v| v.as_f64()).unwrap_or(0.0);
                assert!(rate != 0.0, "rate must not be zero");
                Value::from(amount / rate)
            },
            ["amount", "rate"],
        )
        .unwrap();
    let (observer, seen) = recorder();
    model.observe(&observer, ["rate"]);
    let version = model.version();

    model.set("rate", 0);

    assert_eq!(model.get("rate"), Some(Value::from(0)));
    assert_eq!(model.get("per_unit"), Some(Value::from(5)));
    assert_eq!(model.version(), version + 1);
    assert_eq!(seen.lock().len(), 1);
    assert!(matches!(
        reporter.0.lock().as_slice(),
        [DeliveryError::ComputePanicked { .. }]
    ));
}

/// Array writes too far past the end are refused; the model keeps working.
#[test]
fn unreasonable_array_index_is_refused() {
    let model = Model::from_data(json!({"scores": [3, 5]}));
    let (observer, seen) = recorder();
    model.observe_all(&observer);

    model.set("scores.18446744073709551615", 1);
    model.set("scores.99999999.detail", 1);
    assert_eq!(model.to_json()["scores"], json!([3, 5]));
    assert!(seen.lock().is_empty());

    model.set("scores.2", 8);
    assert_eq!(model.to_json()["scores"], json!([3, 5, 8]));
    assert_eq!(seen.lock().len(), 1);
}
