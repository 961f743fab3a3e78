// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `understory_connector` crate.
//!
//! These drive a [`ConnectorLayer`] over the in-memory document and the
//! recording SVG backend, and check the lifecycle guarantees: subscriptions are
//! never duplicated or leaked, shared markers outlive all but their last user,
//! missing anchors leave geometry alone, and a container swap leaves nothing
//! behind on the old surface.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kurbo::{Point, Rect, Vec2};
use understory_anchor::Anchor;
use understory_connector::{
    ConnectorId, ConnectorLayer, ConnectorStyle, ControllerState, CurveRenderer, ElementId,
    LabelContent, LabelKind, LayerDefaults, MemoryDocument, PathGeometry, PathParams,
    PathRenderer, PointerEvent, PointerHandler, SurfaceError, SvgBackend, marker_element_id,
};

type Layer = ConnectorLayer<SvgBackend<ElementId>, MemoryDocument>;

#[derive(Clone, Default)]
struct CountingRenderer(Rc<Cell<usize>>);

impl CountingRenderer {
    fn take(&self) -> usize {
        self.0.replace(0)
    }
}

impl PathRenderer for CountingRenderer {
    fn render(&self, start: Rect, end: Rect, params: PathParams) -> PathGeometry {
        self.0.set(self.0.get() + 1);
        CurveRenderer.render(start, end, params)
    }
}

struct Fixture {
    layer: Layer,
    root: ElementId,
    a: ElementId,
    b: ElementId,
    renders: CountingRenderer,
}

fn fixture() -> Fixture {
    let mut doc = MemoryDocument::new();
    let root = doc.insert(Rect::new(0.0, 0.0, 800.0, 600.0));
    let a = doc.insert_keyed("a", Rect::new(10.0, 10.0, 60.0, 40.0));
    let b = doc.insert_keyed("b", Rect::new(300.0, 200.0, 350.0, 230.0));
    let renders = CountingRenderer::default();
    let mut layer = ConnectorLayer::with_renderer(SvgBackend::new(), doc, renders.clone());
    layer.set_container(Some(root)).unwrap();
    Fixture {
        layer,
        root,
        a,
        b,
        renders,
    }
}

fn add(layer: &mut Layer, style: ConnectorStyle) -> ConnectorId {
    layer.add_connector(Anchor::key("a"), Anchor::key("b"), style)
}

fn path_node(layer: &Layer, id: ConnectorId) -> understory_connector::NodeId {
    layer.connector(id).unwrap().path().node().unwrap()
}

#[test]
fn repeated_registration_fires_once() {
    let Fixture {
        mut layer,
        a,
        renders,
        ..
    } = fixture();
    let id = add(&mut layer, ConnectorStyle::default());

    layer.set_anchors(id, Anchor::key("a"), Anchor::key("b"));
    layer.set_anchors(id, Anchor::Element(a), Anchor::key("b"));
    assert_eq!(layer.registry().subscribers(a), [id]);

    renders.take();
    assert_eq!(layer.notify(a), 1);
    assert_eq!(renders.take(), 1);
}

#[test]
fn disposed_connector_is_never_notified() {
    let Fixture {
        mut layer, a, b, ..
    } = fixture();
    let gone = add(&mut layer, ConnectorStyle::default());
    let kept = add(&mut layer, ConnectorStyle::default());

    assert!(layer.remove_connector(gone));
    assert_eq!(layer.registry().subscribers(a), [kept]);
    assert_eq!(layer.registry().subscribers(b), [kept]);
    assert_eq!(layer.notify(a), 1);

    assert!(layer.remove_connector(kept));
    assert!(layer.registry().is_empty());
    assert_eq!(layer.notify(a), 0);
}

#[test]
fn detached_anchor_entries_are_swept_on_dispose() {
    let Fixture {
        mut layer, b, ..
    } = fixture();
    let first = add(&mut layer, ConnectorStyle::default());
    let second = add(&mut layer, ConnectorStyle::default());

    // `second` still subscribes to `b`, but `b` has left the document.
    layer.document_mut().detach(b);
    layer.remove_connector(first);
    assert!(!layer.registry().contains(b));
    assert_eq!(layer.state(second), Some(ControllerState::Live));
}

#[test]
fn reattached_anchor_is_subscribed_again_after_a_sweep() {
    let Fixture {
        mut layer, b, ..
    } = fixture();
    let gone = add(&mut layer, ConnectorStyle::default());
    let kept = add(&mut layer, ConnectorStyle::default());

    layer.document_mut().detach(b);
    layer.remove_connector(gone);
    assert!(!layer.registry().is_registered(b, kept));

    layer.document_mut().attach(b);
    assert_eq!(layer.refresh_all(), 1);
    assert!(layer.registry().is_registered(b, kept));

    layer.document_mut().translate(b, Vec2::new(0.0, 40.0));
    assert_eq!(layer.notify(b), 1);
    assert_eq!(
        layer.connector(kept).unwrap().inputs().unwrap().end,
        Rect::new(300.0, 240.0, 350.0, 270.0)
    );
}

#[test]
fn shared_marker_outlives_all_but_the_last_connector() {
    let Fixture { mut layer, .. } = fixture();
    let style = || ConnectorStyle {
        with_head: Some(true),
        shared_marker: Some("arrow".into()),
        ..ConnectorStyle::default()
    };
    let first = add(&mut layer, style());
    let second = add(&mut layer, style());

    let marker = layer.connector(first).unwrap().marker().unwrap();
    assert_eq!(layer.connector(second).unwrap().marker(), Some(marker));
    assert_eq!(layer.surface().unwrap().markers().len(), 1);
    assert_eq!(layer.surface().unwrap().markers().refs(marker.id()), 2);

    layer.remove_connector(first);
    assert!(layer.backend().is_live(marker.node()));
    let path = path_node(&layer, second);
    assert_eq!(
        layer.backend().path(path).unwrap().marker_end,
        Some(marker.id())
    );

    layer.remove_connector(second);
    assert!(!layer.backend().is_live(marker.node()));
    assert!(layer.surface().unwrap().markers().is_empty());
}

#[test]
fn unshared_markers_are_distinct() {
    let Fixture { mut layer, .. } = fixture();
    let style = || ConnectorStyle {
        with_head: Some(true),
        ..ConnectorStyle::default()
    };
    let first = add(&mut layer, style());
    let second = add(&mut layer, style());
    let m1 = layer.connector(first).unwrap().marker().unwrap();
    let m2 = layer.connector(second).unwrap().marker().unwrap();
    assert_ne!(m1.id(), m2.id());
    assert_eq!(layer.backend().marker_count(), 2);
}

#[test]
fn missing_anchor_keeps_last_geometry() {
    let Fixture {
        mut layer, a, b, ..
    } = fixture();
    let id = add(&mut layer, ConnectorStyle::default());
    let before = *layer.connector(id).unwrap().geometry().unwrap();
    let path = path_node(&layer, id);
    let drawn = layer.backend().path(path).unwrap().path.clone();

    layer.document_mut().detach(b);
    layer.document_mut().translate(a, Vec2::new(40.0, 40.0));
    assert_eq!(layer.notify(a), 0);
    assert!(!layer.update(id));
    assert_eq!(layer.refresh_all(), 0);

    assert_eq!(*layer.connector(id).unwrap().geometry().unwrap(), before);
    assert_eq!(layer.backend().path(path).unwrap().path, drawn);
    assert_eq!(layer.state(id), Some(ControllerState::Live));

    // Once the anchor is back, the next update catches up.
    layer.document_mut().attach(b);
    assert!(layer.update(id));
    assert_ne!(*layer.connector(id).unwrap().geometry().unwrap(), before);
}

#[test]
fn container_swap_leaves_nothing_on_the_old_surface() {
    let Fixture { mut layer, .. } = fixture();
    let other = layer
        .document_mut()
        .insert(Rect::new(100.0, 100.0, 900.0, 700.0));
    let id = add(
        &mut layer,
        ConnectorStyle {
            with_head: Some(true),
            label: Some(LabelContent::text("x")),
            ..ConnectorStyle::default()
        },
    );
    let old_surface = layer.surface().unwrap().id();
    let old_nodes = layer.backend().nodes_in(old_surface).to_vec();
    assert_eq!(old_nodes.len(), 3);

    layer.set_container(Some(other)).unwrap();
    let surface = layer.surface().unwrap();
    assert_eq!(surface.epoch(), 2);
    assert_eq!(surface.container(), other);
    assert!(!layer.backend().is_surface_live(old_surface));
    for node in &old_nodes {
        assert!(!layer.backend().is_live(*node));
    }

    let new_nodes = layer.backend().nodes_in(surface.id());
    assert_eq!(new_nodes.len(), 3);
    assert!(new_nodes.iter().all(|node| !old_nodes.contains(node)));
    assert_eq!(layer.controller(id).unwrap().epoch(), 2);
    assert_eq!(layer.backend().node_count(), 3);

    // Geometry is relative to the new container.
    let start = layer.connector(id).unwrap().geometry().unwrap().start();
    assert_eq!(start, Point::new(-40.0, -75.0));
}

#[test]
fn adding_a_head_keeps_path_and_label() {
    let Fixture {
        mut layer, a, b, ..
    } = fixture();
    let base = ConnectorStyle {
        curviness: Some(0.5),
        label: Some(LabelContent::text("C1")),
        ..ConnectorStyle::default()
    };
    let c1 = add(&mut layer, base.clone());
    let path = path_node(&layer, c1);
    let label = layer.connector(c1).unwrap().label().unwrap().node().unwrap();
    assert!(layer.connector(c1).unwrap().marker().is_none());

    layer.set_style(
        c1,
        ConnectorStyle {
            with_head: Some(true),
            head_color: Some("red".into()),
            ..base
        },
    );
    let connector = layer.connector(c1).unwrap();
    let marker = connector.marker().unwrap();
    assert_eq!(layer.backend().marker_count(), 1);
    assert_eq!(layer.backend().marker(marker.node()).unwrap().fill, "red");
    assert_eq!(connector.path().node(), Some(path));
    assert_eq!(connector.label().unwrap().node(), Some(label));
    assert_eq!(
        layer.backend().path(path).unwrap().marker_end,
        Some(marker.id())
    );

    layer.remove_connector(c1);
    assert!(!layer.backend().is_live(path));
    assert!(!layer.backend().is_live(marker.node()));
    assert!(!layer.backend().is_live(label));
    assert!(!layer.registry().is_registered(a, c1));
    assert!(!layer.registry().is_registered(b, c1));
    assert!(layer.registry().is_empty());
}

#[test]
fn removing_the_head_releases_the_marker() {
    let Fixture { mut layer, .. } = fixture();
    let id = add(
        &mut layer,
        ConnectorStyle {
            head_size: Some(10.0),
            ..ConnectorStyle::default()
        },
    );
    let path = path_node(&layer, id);
    let marker = layer.connector(id).unwrap().marker().unwrap();
    assert_eq!(layer.backend().marker(marker.node()).unwrap().size, 10.0);

    layer.set_style(
        id,
        ConnectorStyle {
            head_size: Some(10.0),
            with_head: Some(false),
            ..ConnectorStyle::default()
        },
    );
    assert!(layer.connector(id).unwrap().marker().is_none());
    assert!(!layer.backend().is_live(marker.node()));
    assert_eq!(layer.backend().path(path).unwrap().marker_end, None);
    assert_eq!(path_node(&layer, id), path);
}

#[test]
fn styling_changes_apply_in_place() {
    let Fixture { mut layer, .. } = fixture();
    let id = add(
        &mut layer,
        ConnectorStyle {
            with_head: Some(true),
            label: Some(LabelContent::text("one")),
            ..ConnectorStyle::default()
        },
    );
    let nodes = layer.backend().node_count();
    let path = path_node(&layer, id);
    let before = *layer.connector(id).unwrap().geometry().unwrap();

    layer.set_style(
        id,
        ConnectorStyle {
            with_head: Some(true),
            color: Some("teal".into()),
            stroke_width: Some(3.0),
            class_name: Some("edge".into()),
            curviness: Some(0.0),
            head_color: Some("navy".into()),
            label: Some(LabelContent::text("two")),
            label_class_name: Some("caption".into()),
            ..ConnectorStyle::default()
        },
    );
    assert_eq!(layer.backend().node_count(), nodes);
    assert_eq!(path_node(&layer, id), path);
    assert_eq!(layer.state(id), Some(ControllerState::Live));

    let desc = layer.backend().path(path).unwrap();
    assert_eq!(desc.stroke, "teal");
    assert_eq!(desc.stroke_width, 3.0);
    assert_eq!(desc.class_name.as_deref(), Some("edge"));

    let connector = layer.connector(id).unwrap();
    let after = connector.geometry().unwrap();
    assert_eq!(after.start(), before.start());
    assert_ne!(after.curve, before.curve);

    let marker = connector.marker().unwrap();
    assert_eq!(layer.backend().marker(marker.node()).unwrap().fill, "navy");
    let label = layer
        .backend()
        .label(connector.label().unwrap().node().unwrap())
        .unwrap();
    assert_eq!(label.text, "two");
    assert_eq!(label.class_name.as_deref(), Some("caption"));
    assert_eq!(label.position, after.midpoint);
}

#[test]
fn label_presence_toggles_without_touching_the_path() {
    let Fixture { mut layer, .. } = fixture();
    let id = add(&mut layer, ConnectorStyle::default());
    let path = path_node(&layer, id);

    layer.set_style(
        id,
        ConnectorStyle {
            label: Some(LabelContent::text("hi")),
            ..ConnectorStyle::default()
        },
    );
    let connector = layer.connector(id).unwrap();
    let label = connector.label().unwrap();
    assert_eq!(label.position(), Some(connector.geometry().unwrap().midpoint));
    let label = label.node().unwrap();

    layer.set_style(id, ConnectorStyle::default());
    assert!(layer.connector(id).unwrap().label().is_none());
    assert!(!layer.backend().is_live(label));
    assert_eq!(path_node(&layer, id), path);
}

#[test]
fn switching_label_kind_recreates_the_connector() {
    let Fixture { mut layer, .. } = fixture();
    let id = add(
        &mut layer,
        ConnectorStyle {
            label: Some(LabelContent::text("text")),
            ..ConnectorStyle::default()
        },
    );
    let old_path = path_node(&layer, id);
    let old_label = layer.connector(id).unwrap().label().unwrap().node().unwrap();

    let placed = Rc::new(Cell::new(None));
    let sink = placed.clone();
    layer.set_style(
        id,
        ConnectorStyle {
            label: Some(LabelContent::custom(move |p| sink.set(Some(p)))),
            ..ConnectorStyle::default()
        },
    );

    assert!(!layer.backend().is_live(old_path));
    assert!(!layer.backend().is_live(old_label));
    let connector = layer.connector(id).unwrap();
    assert_ne!(connector.path().node(), Some(old_path));
    assert_eq!(connector.label().unwrap().kind(), LabelKind::Custom);
    assert_eq!(placed.get(), Some(connector.geometry().unwrap().midpoint));
    assert_eq!(layer.backend().node_count(), 1);
    assert_eq!(layer.state(id), Some(ControllerState::Live));
}

#[test]
fn custom_label_follows_the_midpoint() {
    let Fixture {
        mut layer, b, ..
    } = fixture();
    let placed = Rc::new(RefCell::new(Vec::new()));
    let sink = placed.clone();
    let id = add(
        &mut layer,
        ConnectorStyle {
            label: Some(LabelContent::custom(move |p| sink.borrow_mut().push(p))),
            ..ConnectorStyle::default()
        },
    );
    assert_eq!(placed.borrow().len(), 1);

    layer.document_mut().translate(b, Vec2::new(100.0, 0.0));
    layer.notify(b);
    let midpoint = layer.connector(id).unwrap().geometry().unwrap().midpoint;
    assert_eq!(placed.borrow().len(), 2);
    assert_eq!(placed.borrow().last(), Some(&midpoint));
}

#[test]
fn clicks_and_hovers_reach_their_handlers() {
    let Fixture { mut layer, .. } = fixture();
    let clicks = Rc::new(RefCell::new(Vec::new()));
    let sink = clicks.clone();
    let on_click: PointerHandler = Rc::new(move |event: &PointerEvent| sink.borrow_mut().push(*event));
    let id = add(
        &mut layer,
        ConnectorStyle {
            on_click: Some(on_click),
            ..ConnectorStyle::default()
        },
    );
    let plain = add(&mut layer, ConnectorStyle::default());
    let path = path_node(&layer, id);
    assert!(layer.backend().path(path).unwrap().interactive);
    assert!(
        !layer
            .backend()
            .path(path_node(&layer, plain))
            .unwrap()
            .interactive
    );

    let position = Point::new(5.0, 6.0);
    assert!(layer.pointer_click(path, position));
    assert!(!layer.pointer_hover(path, position));
    assert!(!layer.pointer_click(path_node(&layer, plain), position));
    assert_eq!(
        *clicks.borrow(),
        [PointerEvent {
            connector: id,
            position
        }]
    );
}

#[test]
fn unavailable_container_waits_in_creating() {
    let mut doc = MemoryDocument::new();
    let root = doc.insert(Rect::new(0.0, 0.0, 800.0, 600.0));
    doc.insert_keyed("a", Rect::new(10.0, 10.0, 60.0, 40.0));
    doc.insert_keyed("b", Rect::new(300.0, 200.0, 350.0, 230.0));
    let mut backend = SvgBackend::new();
    backend.refuse(root);
    let mut layer = ConnectorLayer::new(backend, doc);

    assert_eq!(
        layer.set_container(Some(root)),
        Err(SurfaceError::BackendRefused)
    );
    let id = add(&mut layer, ConnectorStyle::default());
    assert_eq!(layer.state(id), Some(ControllerState::Creating));
    assert!(layer.connector(id).is_none());
    assert_eq!(layer.refresh_all(), 0);
    assert!(layer.registry().is_empty());

    layer.backend_mut().accept(root);
    assert_eq!(layer.refresh_all(), 1);
    assert_eq!(layer.state(id), Some(ControllerState::Live));
    assert_eq!(layer.registry().len(), 2);
}

#[test]
fn unbinding_the_container_tears_everything_down() {
    let Fixture {
        mut layer, root, a, ..
    } = fixture();
    let id = add(&mut layer, ConnectorStyle::default());

    layer.set_container(None).unwrap();
    assert!(layer.surface().is_none());
    assert_eq!(layer.backend().node_count(), 0);
    assert_eq!(layer.state(id), Some(ControllerState::Creating));
    assert_eq!(layer.notify(a), 0);

    layer.set_container(Some(root)).unwrap();
    assert_eq!(layer.state(id), Some(ControllerState::Live));
    assert_eq!(layer.notify(a), 1);
}

#[test]
fn unregistered_connectors_follow_only_refresh_all() {
    let Fixture {
        mut layer, a, ..
    } = fixture();
    let id = add(
        &mut layer,
        ConnectorStyle {
            use_register: Some(false),
            ..ConnectorStyle::default()
        },
    );
    assert!(layer.registry().is_empty());

    let before = *layer.connector(id).unwrap().geometry().unwrap();
    layer.document_mut().translate(a, Vec2::new(0.0, 50.0));
    assert_eq!(layer.notify(a), 0);
    assert_eq!(*layer.connector(id).unwrap().geometry().unwrap(), before);

    assert_eq!(layer.refresh_all(), 1);
    assert_ne!(*layer.connector(id).unwrap().geometry().unwrap(), before);

    // Turning registration back on subscribes right away.
    layer.set_style(id, ConnectorStyle::default());
    assert!(layer.registry().is_registered(a, id));
}

#[test]
fn key_anchor_follows_its_new_element() {
    let Fixture {
        mut layer, b, ..
    } = fixture();
    let id = add(&mut layer, ConnectorStyle::default());

    layer.document_mut().remove(b);
    let b2 = layer
        .document_mut()
        .insert_keyed("b", Rect::new(500.0, 10.0, 550.0, 40.0));
    assert_eq!(layer.refresh_all(), 1);
    assert!(layer.registry().is_registered(b2, id));
    assert!(!layer.registry().contains(b));

    layer
        .document_mut()
        .translate(b2, Vec2::new(0.0, 100.0));
    assert_eq!(layer.notify(b2), 1);
    assert_eq!(
        layer.connector(id).unwrap().geometry().unwrap().end(),
        Point::new(500.0, 125.0)
    );
}

#[test]
fn layer_defaults_sit_between_connector_and_engine() {
    let Fixture { mut layer, .. } = fixture();
    let plain = add(&mut layer, ConnectorStyle::default());
    let red = add(
        &mut layer,
        ConnectorStyle {
            color: Some("red".into()),
            ..ConnectorStyle::default()
        },
    );
    assert_eq!(
        layer.backend().path(path_node(&layer, plain)).unwrap().stroke,
        "black"
    );

    layer.set_defaults(LayerDefaults {
        color: Some("blue".into()),
        head_size: Some(9.0),
        ..LayerDefaults::default()
    });
    let plain_path = layer.backend().path(path_node(&layer, plain)).unwrap();
    assert_eq!(plain_path.stroke, "blue");
    assert_eq!(
        layer.backend().path(path_node(&layer, red)).unwrap().stroke,
        "red"
    );

    // A layer-wide head size implies a head on every connector.
    let marker = layer.connector(plain).unwrap().marker().unwrap();
    let desc = layer.backend().marker(marker.node()).unwrap();
    assert_eq!(desc.size, 9.0);
    assert_eq!(desc.fill, "blue");
    assert_eq!(layer.backend().marker_count(), 2);
}

#[test]
fn offsets_and_scale_shape_the_placed_rectangles() {
    let Fixture { mut layer, .. } = fixture();
    let id = add(
        &mut layer,
        ConnectorStyle {
            offset_start_x: Some(10.0),
            offset_end_y: Some(-20.0),
            scale: Some(2.0),
            only_integer_coords: Some(true),
            ..ConnectorStyle::default()
        },
    );
    let geometry = layer.connector(id).unwrap().geometry().unwrap();
    // Start (10,10,60,40) + (10,0), halved: right edge at x=35, center y=12.5.
    assert_eq!(geometry.start(), Point::new(35.0, 13.0));
    // End (300,200,350,230) + (0,-20), halved: left edge at x=150, center y=97.5.
    assert_eq!(geometry.end(), Point::new(150.0, 98.0));
}

#[test]
fn svg_export_reflects_the_layer() {
    let Fixture { mut layer, .. } = fixture();
    let id = add(
        &mut layer,
        ConnectorStyle {
            head_color: Some("red".into()),
            label: Some(LabelContent::text("a & b")),
            label_class_name: Some("note".into()),
            ..ConnectorStyle::default()
        },
    );
    let surface = layer.surface().unwrap().id();
    let svg = layer.backend().to_svg(surface).unwrap();
    let marker = marker_element_id(layer.connector(id).unwrap().marker().unwrap().id());
    assert!(svg.contains(&format!("<marker id=\"{marker}\"")));
    assert!(svg.contains(&format!("marker-end=\"url(#{marker})\"")));
    assert!(svg.contains("<text class=\"connector-label note\""));
    assert!(svg.contains(">a &amp; b</text>"));
}
