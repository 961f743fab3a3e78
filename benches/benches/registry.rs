// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_anchor::AnchorRegistry;

/// Registry where `anchors` elements each carry `fan_out` subscribers.
///
/// Subscriber `h` listens on elements `h % anchors` and `(h + 1) % anchors`,
/// the way a chain of connectors shares its endpoints.
fn build_registry(anchors: u32, fan_out: u32) -> AnchorRegistry<u32, u32> {
    let mut registry = AnchorRegistry::new();
    for handle in 0..anchors * fan_out / 2 {
        registry.register_element(handle % anchors, handle);
        registry.register_element((handle + 1) % anchors, handle);
    }
    registry
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_anchor");
    group.sample_size(50);

    for &(anchors, fan_out) in &[(256_u32, 2_u32), (256_u32, 16_u32), (4_096_u32, 2_u32)] {
        let registry = build_registry(anchors, fan_out);

        group.bench_function(format!("notify_one(n={anchors},k={fan_out})"), |b| {
            b.iter(|| {
                let fired = registry.notify(black_box(anchors / 2)).count();
                black_box(fired);
            });
        });

        group.bench_function(format!("notify_all(n={anchors},k={fan_out})"), |b| {
            b.iter(|| black_box(registry.notify_all().count()));
        });

        group.bench_function(format!("register(n={anchors},k={fan_out})"), |b| {
            b.iter(|| black_box(build_registry(anchors, fan_out)));
        });

        group.bench_function(format!("unregister_all(n={anchors},k={fan_out})"), |b| {
            b.iter_batched(
                || build_registry(anchors, fan_out),
                |mut registry| {
                    for handle in 0..anchors * fan_out / 2 {
                        registry.unregister_element(handle % anchors, handle);
                        registry.unregister_element((handle + 1) % anchors, handle);
                    }
                    black_box(registry);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_registry);
criterion_main!(benches);
