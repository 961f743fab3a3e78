// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! All connectors of one container, wired to a document and a backend.

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::Point;
use understory_anchor::{Anchor, AnchorRegistry};

use crate::backend::{DrawingBackend, NodeId};
use crate::config::{ConnectorStyle, LayerDefaults};
use crate::connector::Connector;
use crate::controller::{ConnectorController, ControllerCx, ControllerState};
use crate::document::Document;
use crate::geometry::{CurveRenderer, PathRenderer};
use crate::surface::{Surface, SurfaceError, SurfaceHost};

/// Identifier of a connector in a [`ConnectorLayer`].
///
/// A slot index plus a generation counter. Ids of removed connectors never
/// alias a connector added later.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConnectorId(u32, u32);

impl ConnectorId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Slot<E> {
    generation: u32,
    controller: Option<ConnectorController<E>>,
}

/// The connectors drawn into one container.
///
/// The layer owns the backend, the document and the anchor registry, and keeps
/// one [`ConnectorController`] per connector. Everything happens synchronously
/// inside the call that triggers it.
///
/// # Example
///
/// ```rust
/// use kurbo::Rect;
/// use understory_anchor::Anchor;
/// use understory_connector::{ConnectorLayer, ConnectorStyle, MemoryDocument, SvgBackend};
///
/// let mut doc = MemoryDocument::new();
/// let root = doc.insert(Rect::new(0.0, 0.0, 400.0, 400.0));
/// let a = doc.insert_keyed("a", Rect::new(0.0, 0.0, 20.0, 20.0));
/// let b = doc.insert_keyed("b", Rect::new(200.0, 0.0, 220.0, 20.0));
///
/// let mut layer = ConnectorLayer::new(SvgBackend::new(), doc);
/// layer.set_container(Some(root)).unwrap();
/// let id = layer.add_connector(Anchor::key("a"), Anchor::key("b"), ConnectorStyle::default());
///
/// layer.document_mut().translate(b, kurbo::Vec2::new(0.0, 100.0));
/// assert_eq!(layer.notify(b), 1);
/// assert_eq!(layer.connector(id).unwrap().geometry().unwrap().end().y, 110.0);
/// ```
pub struct ConnectorLayer<B, D>
where
    D: Document,
{
    backend: B,
    document: D,
    host: SurfaceHost<D::Element>,
    container: Option<D::Element>,
    defaults: LayerDefaults,
    registry: AnchorRegistry<D::Element, ConnectorId>,
    renderer: Box<dyn PathRenderer>,
    slots: Vec<Slot<D::Element>>,
    free: Vec<u32>,
}

impl<B, D> core::fmt::Debug for ConnectorLayer<B, D>
where
    D: Document,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectorLayer")
            .field("container", &self.container)
            .field("defaults", &self.defaults)
            .field("epoch", &self.host.epoch())
            .field(
                "connectors",
                &self.slots.iter().filter(|slot| slot.controller.is_some()).count(),
            )
            .finish_non_exhaustive()
    }
}

impl<B, D> ConnectorLayer<B, D>
where
    B: DrawingBackend<Container = D::Element>,
    D: Document,
{
    /// Creates a layer with the default [`CurveRenderer`] and no container.
    pub fn new(backend: B, document: D) -> Self {
        Self::with_renderer(backend, document, CurveRenderer)
    }

    /// Creates a layer with a custom path renderer.
    pub fn with_renderer(backend: B, document: D, renderer: impl PathRenderer + 'static) -> Self {
        Self {
            backend,
            document,
            host: SurfaceHost::new(),
            container: None,
            defaults: LayerDefaults::default(),
            registry: AnchorRegistry::new(),
            renderer: Box::new(renderer),
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Binds the layer to `container`, or unbinds it with `None`.
    ///
    /// Every connector follows: connectors on a previous surface are recreated
    /// on the new one. When no surface can be provided, connectors wait until a
    /// later call to this method or [`refresh_all`](Self::refresh_all)
    /// succeeds.
    pub fn set_container(&mut self, container: Option<D::Element>) -> Result<(), SurfaceError> {
        self.container = container;
        let result = self.sync_surface();
        self.for_each_controller(|controller, cx| controller.sync_surface(cx));
        result
    }

    /// The container the layer is bound to.
    #[must_use]
    pub fn container(&self) -> Option<D::Element> {
        self.container
    }

    /// Replaces the surface-wide defaults and reconfigures every connector.
    pub fn set_defaults(&mut self, defaults: LayerDefaults) {
        if defaults == self.defaults {
            return;
        }
        self.defaults = defaults;
        let defaults = self.defaults.clone();
        self.for_each_controller(|controller, cx| controller.refresh_defaults(cx, &defaults));
    }

    /// The surface-wide defaults.
    #[must_use]
    pub fn defaults(&self) -> &LayerDefaults {
        &self.defaults
    }

    /// Adds a connector between two anchors and mounts it.
    pub fn add_connector(
        &mut self,
        start: Anchor<D::Element>,
        end: Anchor<D::Element>,
        style: ConnectorStyle,
    ) -> ConnectorId {
        let id = self.allocate();
        let controller = ConnectorController::new(id, start, end, style, &self.defaults);
        self.slots[id.idx()].controller = Some(controller);
        self.with_controller(id, |controller, cx| controller.mount(cx));
        id
    }

    /// Replaces the per-connector overrides. Returns `false` for unknown ids.
    pub fn set_style(&mut self, id: ConnectorId, style: ConnectorStyle) -> bool {
        let defaults = self.defaults.clone();
        self.with_controller(id, |controller, cx| controller.reconfigure(cx, style, &defaults))
            .is_some()
    }

    /// Points a connector at new anchors. Returns `false` for unknown ids.
    pub fn set_anchors(
        &mut self,
        id: ConnectorId,
        start: Anchor<D::Element>,
        end: Anchor<D::Element>,
    ) -> bool {
        self.with_controller(id, |controller, cx| controller.set_anchors(cx, start, end))
            .is_some()
    }

    /// Disposes a connector and frees its id. Returns `false` for unknown ids.
    pub fn remove_connector(&mut self, id: ConnectorId) -> bool {
        if self
            .with_controller(id, |controller, cx| controller.dispose(cx))
            .is_none()
        {
            return false;
        }
        let slot = &mut self.slots[id.idx()];
        slot.controller = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.0);
        true
    }

    /// Re-lays out every connector subscribed to `element`.
    ///
    /// Subscribers run in registration order. Returns how many connectors were
    /// laid out.
    pub fn notify(&mut self, element: D::Element) -> usize {
        let mut updated = 0;
        for id in self.registry.notify(element) {
            if self
                .with_controller(id, |controller, cx| controller.update(cx))
                .unwrap_or(false)
            {
                updated += 1;
            }
        }
        updated
    }

    /// Re-lays out every connector, subscribed or not.
    ///
    /// This is the fallback for changes that cannot be pinned to one element,
    /// such as a resize or scroll of the page. It also retries a surface that
    /// could not be created earlier.
    pub fn refresh_all(&mut self) -> usize {
        if let Err(err) = self.sync_surface() {
            log::debug!("refresh without surface: {err}");
        }
        let mut updated = 0;
        self.for_each_controller(|controller, cx| {
            controller.sync_surface(cx);
            if controller.update(cx) {
                updated += 1;
            }
        });
        updated
    }

    /// Re-lays out one connector. Returns `false` if nothing was laid out.
    pub fn update(&mut self, id: ConnectorId) -> bool {
        self.with_controller(id, |controller, cx| controller.update(cx))
            .unwrap_or(false)
    }

    /// Dispatches a click on a backend node to the connector owning it.
    pub fn pointer_click(&self, node: NodeId, position: Point) -> bool {
        self.controller_for_node(node)
            .is_some_and(|controller| controller.handle_click(position))
    }

    /// Dispatches a hover on a backend node to the connector owning it.
    pub fn pointer_hover(&self, node: NodeId, position: Point) -> bool {
        self.controller_for_node(node)
            .is_some_and(|controller| controller.handle_hover(position))
    }

    /// Lifecycle state of a connector.
    #[must_use]
    pub fn state(&self, id: ConnectorId) -> Option<ControllerState> {
        self.controller(id).map(ConnectorController::state)
    }

    /// The rendered connector, while live.
    #[must_use]
    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.controller(id)?.connector()
    }

    /// The controller of a connector.
    #[must_use]
    pub fn controller(&self, id: ConnectorId) -> Option<&ConnectorController<D::Element>> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.controller.as_ref()
    }

    /// Ids of all connectors, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = ConnectorId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.controller.as_ref().map(|_| ConnectorId(to_u32(index), slot.generation))
        })
    }

    /// Number of connectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.controller.is_some()).count()
    }

    /// Returns `true` if the layer has no connectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The live surface.
    #[must_use]
    pub fn surface(&self) -> Option<&Surface<D::Element>> {
        self.host.current()
    }

    /// The drawing backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the drawing backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The document.
    #[must_use]
    pub fn document(&self) -> &D {
        &self.document
    }

    /// Mutable access to the document.
    ///
    /// Moving elements does not re-lay anything out by itself; follow up with
    /// [`notify`](Self::notify) or [`refresh_all`](Self::refresh_all).
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Anchor subscriptions.
    #[must_use]
    pub fn registry(&self) -> &AnchorRegistry<D::Element, ConnectorId> {
        &self.registry
    }

    /// Tears down the surface and disposes every connector.
    pub fn clear(&mut self) {
        self.for_each_controller(|controller, cx| controller.dispose(cx));
        self.host.teardown(&mut self.backend);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.controller.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(to_u32(index));
            }
        }
        self.registry.clear();
    }

    fn sync_surface(&mut self) -> Result<(), SurfaceError> {
        match self.container {
            Some(container) => self
                .host
                .ensure(&mut self.backend, &self.document, container)
                .map(|_| ())
                .inspect_err(|err| log::debug!("no surface for {container:?}: {err}")),
            None => {
                self.host.teardown(&mut self.backend);
                Ok(())
            }
        }
    }

    fn allocate(&mut self) -> ConnectorId {
        if let Some(index) = self.free.pop() {
            let generation = self.slots[index as usize].generation;
            return ConnectorId(index, generation);
        }
        let index = to_u32(self.slots.len());
        self.slots.push(Slot {
            generation: 1,
            controller: None,
        });
        ConnectorId(index, 1)
    }

    fn controller_for_node(&self, node: NodeId) -> Option<&ConnectorController<D::Element>> {
        self.slots
            .iter()
            .filter_map(|slot| slot.controller.as_ref())
            .find(|controller| controller.owns_node(node))
    }

    /// Runs `f` on one controller with a context borrowed from the layer.
    fn with_controller<R>(
        &mut self,
        id: ConnectorId,
        f: impl FnOnce(&mut ConnectorController<D::Element>, &mut ControllerCx<'_, B, D>) -> R,
    ) -> Option<R> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        let controller = slot.controller.as_mut()?;
        let mut cx = ControllerCx {
            backend: &mut self.backend,
            document: &self.document,
            registry: &mut self.registry,
            surface: self.host.current_mut(),
            renderer: &*self.renderer,
        };
        Some(f(controller, &mut cx))
    }

    fn for_each_controller(
        &mut self,
        mut f: impl FnMut(&mut ConnectorController<D::Element>, &mut ControllerCx<'_, B, D>),
    ) {
        let mut cx = ControllerCx {
            backend: &mut self.backend,
            document: &self.document,
            registry: &mut self.registry,
            surface: self.host.current_mut(),
            renderer: &*self.renderer,
        };
        for controller in self.slots.iter_mut().filter_map(|slot| slot.controller.as_mut()) {
            f(controller, &mut cx);
        }
    }
}

fn to_u32(index: usize) -> u32 {
    u32::try_from(index).expect("too many connectors for ConnectorId (u32)")
}
