// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The unit of composition: one path, at most one marker, at most one label.

use kurbo::Rect;

use crate::backend::{DrawingBackend, SurfaceId};
use crate::config::{ResolvedStyle, StyleChanges};
use crate::geometry::{PathGeometry, PathRenderer, place_rect};
use crate::marker::{MarkerPool, MarkerRef};
use crate::primitives::{Label, Path};

/// Document-space rectangles a layout was computed from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LayoutInputs {
    /// Bounding rectangle of the start anchor.
    pub start: Rect,
    /// Bounding rectangle of the end anchor.
    pub end: Rect,
    /// Bounding rectangle of the surface's container.
    pub container: Rect,
}

/// A rendered connector.
///
/// Built by [`create_connector`](crate::create_connector). The path is owned;
/// the marker is referenced through the surface's [`MarkerPool`].
#[derive(Clone, Debug)]
pub struct Connector {
    surface: SurfaceId,
    path: Path,
    marker: Option<MarkerRef>,
    label: Option<Label>,
    inputs: Option<LayoutInputs>,
    disposed: bool,
}

impl Connector {
    pub(crate) fn new(
        surface: SurfaceId,
        path: Path,
        marker: Option<MarkerRef>,
        label: Option<Label>,
    ) -> Self {
        Self {
            surface,
            path,
            marker,
            label,
            inputs: None,
            disposed: false,
        }
    }

    /// Surface the primitives were created on.
    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// The stroke.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The arrowhead reference.
    #[must_use]
    pub fn marker(&self) -> Option<MarkerRef> {
        self.marker
    }

    /// The label.
    #[must_use]
    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    /// Geometry of the last successful layout.
    #[must_use]
    pub fn geometry(&self) -> Option<&PathGeometry> {
        self.path.geometry()
    }

    /// Inputs of the last successful layout.
    #[must_use]
    pub fn inputs(&self) -> Option<&LayoutInputs> {
        self.inputs.as_ref()
    }

    /// Returns `true` once disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Lays the connector out between two anchor rectangles.
    ///
    /// The caller only gets here when both anchors resolved; a connector whose
    /// anchors are missing keeps its previous geometry.
    pub fn update<B>(
        &mut self,
        backend: &mut B,
        style: &ResolvedStyle,
        renderer: &dyn PathRenderer,
        inputs: LayoutInputs,
    ) where
        B: DrawingBackend + ?Sized,
    {
        if self.disposed {
            return;
        }
        let start = place_rect(inputs.start, inputs.container, style.offset_start, style.scale);
        let end = place_rect(inputs.end, inputs.container, style.offset_end, style.scale);
        let geometry = renderer.render(start, end, style.path_params());
        self.path.set_geometry(backend, geometry);
        if let Some(label) = &mut self.label {
            label.set_position(backend, geometry.midpoint);
        }
        self.inputs = Some(inputs);
    }

    /// Applies `changes` from `style` to the existing primitives.
    ///
    /// Nothing is recreated here. Marker and label presence are the caller's
    /// business, through [`set_marker`](Self::set_marker) and
    /// [`set_label`](Self::set_label). Geometry changes re-run the last layout.
    pub fn reconfigure<B>(
        &mut self,
        backend: &mut B,
        markers: Option<&mut MarkerPool>,
        style: &ResolvedStyle,
        renderer: &dyn PathRenderer,
        changes: StyleChanges,
    ) where
        B: DrawingBackend + ?Sized,
    {
        if self.disposed {
            return;
        }
        if changes.intersects(StyleChanges::PATH) {
            self.path.restyle(backend, style);
        }
        if changes.contains(StyleChanges::HEAD_STYLE)
            && let (Some(marker), Some(markers)) = (self.marker, markers)
        {
            markers.restyle(backend, marker, style.head_size, &style.head_fill);
        }
        if let Some(label) = &mut self.label {
            if changes.contains(StyleChanges::LABEL_CONTENT)
                && let Some(content) = &style.label
            {
                label.set_content(backend, content);
            }
            if changes.contains(StyleChanges::LABEL_CLASS) {
                label.set_class_name(backend, style.label_class_name.as_ref());
            }
        }
        if changes.contains(StyleChanges::GEOMETRY)
            && let Some(inputs) = self.inputs
        {
            self.update(backend, style, renderer, inputs);
        }
    }

    /// Swaps the arrowhead reference and returns the previous one.
    ///
    /// The caller releases the returned reference.
    pub fn set_marker<B>(&mut self, backend: &mut B, marker: Option<MarkerRef>) -> Option<MarkerRef>
    where
        B: DrawingBackend + ?Sized,
    {
        if self.disposed {
            return marker;
        }
        self.path.set_marker(backend, marker.map(MarkerRef::id));
        core::mem::replace(&mut self.marker, marker)
    }

    /// Swaps the label and returns the previous one.
    ///
    /// A new label is placed at the current midpoint right away. The caller
    /// removes the returned label.
    pub fn set_label<B>(&mut self, backend: &mut B, label: Option<Label>) -> Option<Label>
    where
        B: DrawingBackend + ?Sized,
    {
        if self.disposed {
            return label;
        }
        let mut label = label;
        if let (Some(label), Some(geometry)) = (&mut label, self.path.geometry()) {
            label.set_position(backend, geometry.midpoint);
        }
        core::mem::replace(&mut self.label, label)
    }

    /// Releases the path, the marker reference and the label, in that order.
    ///
    /// The marker definition survives while other connectors still reference
    /// it. Pass `None` for `markers` when the surface is already gone. Calling
    /// this again does nothing.
    pub fn dispose<B>(&mut self, backend: &mut B, markers: Option<&mut MarkerPool>)
    where
        B: DrawingBackend + ?Sized,
    {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.path.remove(backend);
        if let (Some(marker), Some(markers)) = (self.marker.take(), markers) {
            markers.release(backend, marker);
        }
        if let Some(label) = &mut self.label {
            label.remove(backend);
        }
        self.label = None;
    }
}
