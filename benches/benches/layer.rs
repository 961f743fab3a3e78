// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Vec2};
use understory_anchor::Anchor;
use understory_connector::{
    ConnectorLayer, ConnectorStyle, ElementId, LabelContent, MemoryDocument, SvgBackend,
};

type Layer = ConnectorLayer<SvgBackend<ElementId>, MemoryDocument>;

/// A grid of `nodes` boxes where each box links to its right-hand neighbour.
fn build_layer(nodes: u32, with_decorations: bool) -> (Layer, Vec<ElementId>) {
    let mut doc = MemoryDocument::new();
    let root = doc.insert(Rect::new(0.0, 0.0, 10_000.0, 10_000.0));
    let elements: Vec<_> = (0..nodes)
        .map(|i| {
            let x = f64::from(i % 64) * 120.0;
            let y = f64::from(i / 64) * 80.0;
            doc.insert(Rect::new(x, y, x + 60.0, y + 30.0))
        })
        .collect();

    let mut layer = ConnectorLayer::new(SvgBackend::new(), doc);
    layer
        .set_container(Some(root))
        .expect("root is attached");
    let style = ConnectorStyle {
        with_head: Some(with_decorations),
        shared_marker: with_decorations.then(|| "arrow".into()),
        label: with_decorations.then(|| LabelContent::text("edge")),
        ..ConnectorStyle::default()
    };
    for pair in elements.windows(2) {
        layer.add_connector(Anchor::Element(pair[0]), Anchor::Element(pair[1]), style.clone());
    }
    (layer, elements)
}

fn bench_layer(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_connector");
    group.sample_size(30);

    for &nodes in &[256_u32, 2_048_u32] {
        for &decorated in &[false, true] {
            let tag = if decorated { "decorated" } else { "plain" };

            group.bench_function(format!("notify_moved(n={nodes},{tag})"), |b| {
                b.iter_batched(
                    || build_layer(nodes, decorated),
                    |(mut layer, elements)| {
                        let moved = elements[elements.len() / 2];
                        layer.document_mut().translate(moved, Vec2::new(5.0, 5.0));
                        black_box(layer.notify(moved));
                    },
                    BatchSize::LargeInput,
                );
            });

            group.bench_function(format!("refresh_all(n={nodes},{tag})"), |b| {
                let (mut layer, _) = build_layer(nodes, decorated);
                b.iter(|| black_box(layer.refresh_all()));
            });

            group.bench_function(format!("container_swap(n={nodes},{tag})"), |b| {
                b.iter_batched(
                    || {
                        let (mut layer, _) = build_layer(nodes, decorated);
                        let other = layer
                            .document_mut()
                            .insert(Rect::new(0.0, 0.0, 10_000.0, 10_000.0));
                        (layer, other)
                    },
                    |(mut layer, other)| {
                        layer
                            .set_container(Some(other))
                            .expect("container is attached");
                        black_box(layer);
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_layer);
criterion_main!(benches);
