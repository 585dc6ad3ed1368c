use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tether_core::reactive::{computed, effect, reactive, Effect};
use tether_core::value::Object;

fn bench_untracked_read(c: &mut Criterion) {
    let state = reactive(Object::new().with("x", 1));
    c.bench_function("untracked_read", |b| {
        b.iter(|| black_box(state.get("x")))
    });
}

fn bench_write_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_fan_out");
    for subscribers in [1usize, 16, 256] {
        let state = reactive(Object::new().with("x", 0));
        let sink = Arc::new(AtomicI64::new(0));
        let effects: Vec<Effect> = (0..subscribers)
            .map(|_| {
                let (view, sink) = (state.clone(), sink.clone());
                effect(move || {
                    let v = view.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
                    sink.fetch_add(v, Ordering::Relaxed);
                })
            })
            .collect();

        group.bench_function(format!("{subscribers}_effects"), |b| {
            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                state.set("x", black_box(n));
            })
        });
        drop(effects);
    }
    group.finish();
}

fn bench_computed_read(c: &mut Criterion) {
    let state = reactive(Object::new().with("a", 2).with("b", 3));
    let view = state.clone();
    let product = computed(move || {
        view.get_as::<i64>("a").unwrap_or(0) * view.get_as::<i64>("b").unwrap_or(0)
    });

    c.bench_function("computed_read", |b| b.iter(|| black_box(product.value())));
}

criterion_group!(
    benches,
    bench_untracked_read,
    bench_write_fan_out,
    bench_computed_read
);
criterion_main!(benches);
