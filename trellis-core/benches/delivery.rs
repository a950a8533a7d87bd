//! Delivery throughput benchmarks.
//!
//! Run with: cargo bench --package trellis-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use trellis_core::{List, Model, Observer, Value};

// ============================================================================
// Helper functions
// ============================================================================

/// A model with `observers` key observers spread over ten keys.
fn observed_model(observers: usize) -> (Model, Vec<Observer>) {
    let model = Model::new();
    let handles: Vec<Observer> = (0..observers)
        .map(|_| Observer::new(|changes| {
            black_box(changes.len());
        }))
        .collect();
    for (n, observer) in handles.iter().enumerate() {
        model.observe(observer, [format!("field_{}", n % 10)]);
    }
    (model, handles)
}

// ============================================================================
// Benchmark: one batch of N writes
// ============================================================================

fn bench_batched_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_sets");

    for num_keys in [1, 10, 100, 1000] {
        group.throughput(Throughput::Elements(num_keys as u64));
        let (model, _observers) = observed_model(50);

        group.bench_with_input(BenchmarkId::from_parameter(num_keys), &num_keys, |b, &n| {
            let mut round = 0u64;
            b.iter(|| {
                round += 1;
                model.sets((0..n).map(|i| (format!("field_{}", i), round)));
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: computed chain recompute
// ============================================================================

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [1, 8, 32] {
        let model = Model::from_data(json!({"c0": 0}));
        for level in 1..=depth {
            let source = format!("c{}", level - 1);
            let read = source.clone();
            model
                .compute(
                    &format!("c{}", level),
                    move |m| Value::from(m.get(read.as_str()).and_then(|v| v.as_f64()).unwrap_or(0.0) + 1.0),
                    [source],
                )
                .expect("chain has no cycles");
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut round = 0u64;
            b.iter(|| {
                round += 1;
                model.set("c0", round);
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: list replacement diff
// ============================================================================

fn bench_list_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_replace");

    for len in [10, 100, 1000] {
        group.throughput(Throughput::Elements(len as u64));
        let list = List::new((0..len).map(Value::from));
        let renderer = Observer::new(|changes| {
            black_box(changes.len());
        });
        list.observe(&renderer, ["items*"]);

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let mut round = 0i32;
            b.iter(|| {
                round += 1;
                list.replace((0..len).map(|i| i + round));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_batched_sets,
    bench_computed_chain,
    bench_list_replace
);
criterion_main!(benches);
