// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle of one connector against a surface, a document and the registry.
//!
//! ```text
//! Unmounted ──mount──▶ Creating ──surface──▶ Live ──dispose──▶ Disposed
//!                         ▲                   │ ▲
//!                         └──surface lost─────┘ └── reconfigure / recreate
//! ```
//!
//! Reconfiguring and recreating are transient phases inside a single call on a
//! `Live` controller. They have no [`ControllerState`] variant and only show up
//! in `debug` log records; the controller is `Live` again when the call returns.

use core::fmt;
use core::hash::Hash;

use kurbo::Point;
use smallvec::SmallVec;
use understory_anchor::{Anchor, AnchorRegistry};

use crate::backend::{DrawingBackend, NodeId};
use crate::config::{
    ConnectorStyle, LayerDefaults, PointerEvent, PointerHandler, ResolvedStyle, StyleChanges,
};
use crate::connector::{Connector, LayoutInputs};
use crate::document::Document;
use crate::factory;
use crate::geometry::PathRenderer;
use crate::layer::ConnectorId;
use crate::marker::MarkerPool;
use crate::surface::Surface;

/// Where a controller is in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Never mounted.
    Unmounted,
    /// Waiting for a surface.
    Creating,
    /// The connector exists on the current surface.
    Live,
    /// Torn down for good.
    Disposed,
}

/// Everything a controller operation touches besides the controller itself.
pub struct ControllerCx<'a, B, D>
where
    D: Document,
{
    /// Drawing backend.
    pub backend: &'a mut B,
    /// Document the anchors resolve against.
    pub document: &'a D,
    /// Anchor subscriptions, keyed by connector.
    pub registry: &'a mut AnchorRegistry<D::Element, ConnectorId>,
    /// The live surface, if there is one.
    pub surface: Option<&'a mut Surface<D::Element>>,
    /// Geometry collaborator.
    pub renderer: &'a dyn PathRenderer,
}

impl<B, D> fmt::Debug for ControllerCx<'_, B, D>
where
    D: Document,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerCx")
            .field("registry_len", &self.registry.len())
            .field("surface", &self.surface.as_ref().map(|surface| surface.id()))
            .finish_non_exhaustive()
    }
}

/// Drives one connector from creation to disposal.
#[derive(Debug)]
pub struct ConnectorController<E> {
    id: ConnectorId,
    start: Anchor<E>,
    end: Anchor<E>,
    style: ConnectorStyle,
    resolved: ResolvedStyle,
    state: ControllerState,
    connector: Option<Connector>,
    epoch: u64,
    registered: SmallVec<[E; 2]>,
}

impl<E> ConnectorController<E>
where
    E: Copy + Eq + Hash + fmt::Debug,
{
    /// Creates an unmounted controller.
    #[must_use]
    pub fn new(
        id: ConnectorId,
        start: Anchor<E>,
        end: Anchor<E>,
        style: ConnectorStyle,
        defaults: &LayerDefaults,
    ) -> Self {
        let resolved = ResolvedStyle::resolve(&style, defaults);
        Self {
            id,
            start,
            end,
            style,
            resolved,
            state: ControllerState::Unmounted,
            connector: None,
            epoch: 0,
            registered: SmallVec::new(),
        }
    }

    /// Handle this controller subscribes with.
    #[must_use]
    pub fn id(&self) -> ConnectorId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The connector, while live.
    #[must_use]
    pub fn connector(&self) -> Option<&Connector> {
        self.connector.as_ref()
    }

    /// Anchor the connector starts at.
    #[must_use]
    pub fn start(&self) -> &Anchor<E> {
        &self.start
    }

    /// Anchor the connector ends at.
    #[must_use]
    pub fn end(&self) -> &Anchor<E> {
        &self.end
    }

    /// Per-connector overrides as last configured.
    #[must_use]
    pub fn style(&self) -> &ConnectorStyle {
        &self.style
    }

    /// Effective style.
    #[must_use]
    pub fn resolved(&self) -> &ResolvedStyle {
        &self.resolved
    }

    /// Elements this controller is currently subscribed to.
    #[must_use]
    pub fn registered(&self) -> &[E] {
        &self.registered
    }

    /// Epoch of the surface the connector was built on; `0` if never built.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns `true` if `node` is this connector's path.
    #[must_use]
    pub fn owns_node(&self, node: NodeId) -> bool {
        self.connector
            .as_ref()
            .and_then(|connector| connector.path().node())
            == Some(node)
    }

    /// First mount. Same as [`sync_surface`](Self::sync_surface).
    pub fn mount<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        self.sync_surface(cx);
    }

    /// Brings the connector in line with the current surface.
    ///
    /// Without a surface the controller waits in [`ControllerState::Creating`].
    /// A surface with a different epoch than the one the connector was built on
    /// means the container changed: the old connector is disposed and a fresh
    /// one is created.
    pub fn sync_surface<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        match self.state {
            ControllerState::Disposed => {}
            ControllerState::Live
                if cx
                    .surface
                    .as_deref()
                    .is_some_and(|surface| surface.epoch() == self.epoch) => {}
            _ => {
                if self.connector.is_some() {
                    log::debug!("connector {:?} recreating", self.id);
                }
                self.release_connector(cx);
                self.create(cx);
            }
        }
    }

    /// Replaces the per-connector overrides.
    pub fn reconfigure<B, D>(
        &mut self,
        cx: &mut ControllerCx<'_, B, D>,
        style: ConnectorStyle,
        defaults: &LayerDefaults,
    ) where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        self.style = style;
        self.apply_style(cx, defaults);
    }

    /// Re-resolves the style after the layer defaults changed.
    pub fn refresh_defaults<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>, defaults: &LayerDefaults)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        self.apply_style(cx, defaults);
    }

    /// Points the connector at new anchors and lays it out again.
    pub fn set_anchors<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>, start: Anchor<E>, end: Anchor<E>)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        if self.state == ControllerState::Disposed {
            return;
        }
        self.start = start;
        self.end = end;
        if self.state == ControllerState::Live {
            self.register_anchors(cx);
            self.update(cx);
        }
    }

    /// Recomputes the geometry from the current anchor rectangles.
    ///
    /// Returns `false` and leaves the previous geometry in place when either
    /// anchor or the container cannot be measured.
    pub fn update<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>) -> bool
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        if self.state != ControllerState::Live {
            return false;
        }
        let Some(surface) = cx.surface.as_deref() else {
            return false;
        };
        if surface.epoch() != self.epoch {
            return false;
        }
        let container = surface.container();
        let Some(connector) = self.connector.as_mut() else {
            return false;
        };

        let (Some(start), Some(end)) = (
            self.start.resolve(cx.document),
            self.end.resolve(cx.document),
        ) else {
            log::trace!("connector {:?} skipped: anchor unresolved", self.id);
            return false;
        };
        let (Some(start_rect), Some(end_rect), Some(container_rect)) = (
            cx.document.bounding_rect(start),
            cx.document.bounding_rect(end),
            cx.document.bounding_rect(container),
        ) else {
            log::trace!("connector {:?} skipped: nothing to measure", self.id);
            return false;
        };

        connector.update(
            cx.backend,
            &self.resolved,
            cx.renderer,
            LayoutInputs {
                start: start_rect,
                end: end_rect,
                container: container_rect,
            },
        );
        if self.resolved.use_register {
            self.follow_elements(cx.registry, [start, end]);
        }
        true
    }

    /// Unsubscribes and releases every primitive. Idempotent.
    pub fn dispose<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        if self.state == ControllerState::Disposed {
            return;
        }
        self.unregister_all(cx.registry);
        self.release_connector(cx);
        cx.registry.sweep(cx.document);
        self.state = ControllerState::Disposed;
        log::debug!("connector {:?} disposed", self.id);
    }

    /// Runs the click handler, if one is configured.
    pub fn handle_click(&self, position: Point) -> bool {
        self.dispatch(self.resolved.on_click.as_ref(), position)
    }

    /// Runs the hover handler, if one is configured.
    pub fn handle_hover(&self, position: Point) -> bool {
        self.dispatch(self.resolved.on_hover.as_ref(), position)
    }

    fn dispatch(&self, handler: Option<&PointerHandler>, position: Point) -> bool {
        if self.state != ControllerState::Live {
            return false;
        }
        let Some(handler) = handler else {
            return false;
        };
        handler(&PointerEvent {
            connector: self.id,
            position,
        });
        true
    }

    fn create<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        let Some(surface) = cx.surface.as_deref_mut() else {
            self.state = ControllerState::Creating;
            return;
        };
        let connector = factory::create_connector(cx.backend, surface, &self.resolved);
        self.epoch = surface.epoch();
        self.connector = Some(connector);
        self.state = ControllerState::Live;
        log::debug!("connector {:?} created on epoch {}", self.id, self.epoch);

        self.register_anchors(cx);
        self.update(cx);
    }

    fn apply_style<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>, defaults: &LayerDefaults)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        let next = ResolvedStyle::resolve(&self.style, defaults);
        let changes = self.resolved.diff(&next);
        self.resolved = next;
        if changes.is_empty() || self.state != ControllerState::Live {
            return;
        }

        let current = cx
            .surface
            .as_deref()
            .is_some_and(|surface| surface.epoch() == self.epoch);
        if !current {
            self.sync_surface(cx);
            return;
        }
        if changes.contains(StyleChanges::LABEL_KIND) {
            log::debug!("connector {:?} recreating: label kind changed", self.id);
            self.release_connector(cx);
            self.create(cx);
            return;
        }

        log::debug!("connector {:?} reconfiguring: {changes:?}", self.id);
        let (Some(surface), Some(connector)) = (cx.surface.as_deref_mut(), self.connector.as_mut())
        else {
            return;
        };

        if changes.intersects(StyleChanges::HEAD_PRESENCE | StyleChanges::SHARED_MARKER) {
            let next = self
                .resolved
                .with_head
                .then(|| factory::create_marker(cx.backend, surface, &self.resolved));
            if let Some(previous) = connector.set_marker(cx.backend, next) {
                surface.markers_mut().release(cx.backend, previous);
            }
            log::debug!(
                "connector {:?} marker {}",
                self.id,
                if self.resolved.with_head { "attached" } else { "detached" }
            );
        }
        if changes.contains(StyleChanges::LABEL_PRESENCE) {
            let next = factory::create_label(cx.backend, surface.id(), &self.resolved);
            if let Some(mut previous) = connector.set_label(cx.backend, next) {
                previous.remove(cx.backend);
            }
        }
        connector.reconfigure(
            cx.backend,
            Some(surface.markers_mut()),
            &self.resolved,
            cx.renderer,
            changes,
        );

        if changes.contains(StyleChanges::REGISTRATION) {
            if self.resolved.use_register {
                self.register_anchors(cx);
            } else {
                self.unregister_all(cx.registry);
            }
        }
    }

    /// Drops subscriptions and disposes the connector, releasing markers only
    /// into the pool they came from.
    fn release_connector<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        self.unregister_all(cx.registry);
        let Some(mut connector) = self.connector.take() else {
            return;
        };
        let markers: Option<&mut MarkerPool> = match cx.surface.as_deref_mut() {
            Some(surface) if surface.epoch() == self.epoch => Some(surface.markers_mut()),
            _ => None,
        };
        connector.dispose(cx.backend, markers);
        if self.state == ControllerState::Live {
            self.state = ControllerState::Creating;
        }
    }

    /// Clears earlier subscriptions, then subscribes to both resolved anchors.
    fn register_anchors<B, D>(&mut self, cx: &mut ControllerCx<'_, B, D>)
    where
        B: DrawingBackend<Container = E>,
        D: Document<Element = E>,
    {
        self.unregister_all(cx.registry);
        if !self.resolved.use_register {
            return;
        }
        for anchor in [&self.start, &self.end] {
            if let Some(element) = anchor.resolve(cx.document) {
                cx.registry.register_element(element, self.id);
                if !self.registered.contains(&element) {
                    self.registered.push(element);
                }
            }
        }
    }

    /// Moves subscriptions to the elements the anchors resolve to now.
    ///
    /// The registry is the source of truth: a sweep may have dropped a
    /// subscription while the element was detached, so every current element
    /// is re-registered unless the registry still lists this connector.
    fn follow_elements(&mut self, registry: &mut AnchorRegistry<E, ConnectorId>, elements: [E; 2]) {
        let id = self.id;
        self.registered.retain(|element| {
            let keep = elements.contains(element);
            if !keep {
                registry.unregister_element(*element, id);
            }
            keep
        });
        for element in elements {
            if !registry.is_registered(element, id) {
                registry.register_element(element, id);
                log::trace!("connector {id:?} subscribed to {element:?}");
            }
            if !self.registered.contains(&element) {
                self.registered.push(element);
            }
        }
    }

    fn unregister_all(&mut self, registry: &mut AnchorRegistry<E, ConnectorId>) {
        for element in self.registered.drain(..) {
            registry.unregister_element(element, self.id);
        }
    }
}
