// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_connector --heading-base-level=0

//! Understory Connector: curved links between anchors on a mutable surface.
//!
//! This crate keeps a set of connectors (a stroke, an optional arrowhead and an
//! optional label) in sync with the elements they join, while those elements
//! move, resize, appear and disappear on their own. It does not decide when
//! things move; the embedder says "this element may have moved" and the engine
//! re-lays out exactly the connectors that care.
//!
//! ## Pieces
//!
//! - [`SurfaceHost`]: one drawable root per container. A container change tears
//!   the old root down completely and bumps the surface [epoch](Surface::epoch).
//! - [`create_connector`]: builds a [`Connector`] from a [`ResolvedStyle`]. The
//!   arrowhead comes from the surface's [`MarkerPool`], which generates ids and
//!   reference-counts shared definitions.
//! - [`Connector`]: one [`Path`], at most one marker and at most one [`Label`].
//!   Updates and reconfigurations mutate these in place.
//! - [`ConnectorController`]: the lifecycle of one connector, from
//!   [`Unmounted`](ControllerState::Unmounted) through
//!   [`Live`](ControllerState::Live) to [`Disposed`](ControllerState::Disposed).
//!   It subscribes to its anchors in an
//!   [`AnchorRegistry`](understory_anchor::AnchorRegistry), recreates on
//!   surface changes, and adds or removes the marker and label when their
//!   presence flips.
//! - [`ConnectorLayer`]: the entry point. It owns a backend, a document, the
//!   registry and the controllers of one container.
//!
//! The engine draws through the [`DrawingBackend`] trait and measures through
//! the [`Document`] trait. [`SvgBackend`] and [`MemoryDocument`] implement them
//! in memory, for tests and headless use. Geometry comes from a
//! [`PathRenderer`]; the default [`CurveRenderer`] draws a cubic Bezier between
//! the facing edges of the two anchor rectangles.
//!
//! ## Styling
//!
//! Every style field resolves through the same chain: the connector's own
//! [`ConnectorStyle`], then the layer's [`LayerDefaults`], then a built-in
//! default. An arrowhead is drawn when asked for explicitly, or when a head
//! color or size is configured anywhere in the chain.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::Rect;
//! use understory_anchor::Anchor;
//! use understory_connector::{
//!     ConnectorLayer, ConnectorStyle, ControllerState, LabelContent, MemoryDocument, SvgBackend,
//! };
//!
//! let mut doc = MemoryDocument::new();
//! let root = doc.insert(Rect::new(0.0, 0.0, 800.0, 600.0));
//! let a = doc.insert_keyed("a", Rect::new(10.0, 10.0, 60.0, 40.0));
//! let b = doc.insert_keyed("b", Rect::new(300.0, 200.0, 350.0, 230.0));
//!
//! let mut layer = ConnectorLayer::new(SvgBackend::new(), doc);
//! layer.set_container(Some(root)).unwrap();
//!
//! let id = layer.add_connector(
//!     Anchor::key("a"),
//!     Anchor::key("b"),
//!     ConnectorStyle {
//!         head_color: Some("red".into()),
//!         label: Some(LabelContent::text("depends on")),
//!         ..ConnectorStyle::default()
//!     },
//! );
//! assert_eq!(layer.state(id), Some(ControllerState::Live));
//!
//! // A detached anchor leaves the connector where it was.
//! layer.document_mut().detach(b);
//! assert!(!layer.update(id));
//! assert!(layer.connector(id).unwrap().geometry().is_some());
//!
//! // Removing the connector releases every node and subscription.
//! layer.remove_connector(id);
//! assert_eq!(layer.backend().node_count(), 0);
//! assert!(layer.registry().is_empty());
//! ```
//!
//! ## Logging
//!
//! Lifecycle transitions are reported through the [`log`] facade at `debug`
//! level; skipped updates at `trace`. No logger is installed by this crate.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod backend;
mod config;
mod connector;
mod controller;
mod document;
mod factory;
mod geometry;
mod layer;
mod marker;
mod primitives;
mod surface;
mod svg;

pub use backend::{DrawingBackend, LabelDesc, MarkerDesc, MarkerId, NodeId, PathDesc, SurfaceId};
pub use config::{
    ConnectorStyle, DEFAULT_COLOR, DEFAULT_CURVINESS, DEFAULT_HEAD_SIZE, DEFAULT_SCALE,
    DEFAULT_STROKE_WIDTH, LabelContent, LabelKind, LabelPlacement, LayerDefaults, PointerEvent,
    PointerHandler, ResolvedStyle, StyleChanges,
};
pub use connector::{Connector, LayoutInputs};
pub use controller::{ConnectorController, ControllerCx, ControllerState};
pub use document::{Document, ElementId, MemoryDocument};
pub use factory::{create_connector, create_label, create_marker};
pub use geometry::{CurveRenderer, PathGeometry, PathParams, PathRenderer, place_rect};
pub use layer::{ConnectorId, ConnectorLayer};
pub use marker::{MarkerPool, MarkerRef};
pub use primitives::{CustomLabel, Label, Path, TextLabel};
pub use surface::{Surface, SurfaceError, SurfaceHost};
pub use svg::{LABEL_BASE_CLASS, SvgBackend, SvgNode, marker_element_id};
