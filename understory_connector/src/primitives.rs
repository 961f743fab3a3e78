// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drawable pieces a connector is made of.
//!
//! Each primitive owns at most one backend node and can be removed exactly
//! once; every operation after removal is a no-op.

use alloc::string::String;
use core::fmt;

use kurbo::{BezPath, Point};

use crate::backend::{DrawingBackend, LabelDesc, MarkerId, NodeId, PathDesc, SurfaceId};
use crate::config::{LabelContent, LabelKind, LabelPlacement, ResolvedStyle};
use crate::geometry::PathGeometry;

/// The connector stroke.
#[derive(Clone, Debug)]
pub struct Path {
    node: Option<NodeId>,
    desc: PathDesc,
    geometry: Option<PathGeometry>,
}

impl Path {
    /// Creates the stroke node with an empty path.
    pub fn new<B>(
        backend: &mut B,
        surface: SurfaceId,
        style: &ResolvedStyle,
        marker_end: Option<MarkerId>,
    ) -> Self
    where
        B: DrawingBackend + ?Sized,
    {
        let desc = PathDesc {
            path: BezPath::new(),
            stroke: style.color.clone(),
            stroke_width: style.stroke_width,
            class_name: style.class_name.clone(),
            marker_end,
            orientation: 0.0,
            interactive: style.on_click.is_some() || style.on_hover.is_some(),
        };
        let node = backend.create_path(surface, &desc);
        Self {
            node: Some(node),
            desc,
            geometry: None,
        }
    }

    /// Backend node, or `None` once removed.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// The description last sent to the backend.
    #[must_use]
    pub fn desc(&self) -> &PathDesc {
        &self.desc
    }

    /// Geometry of the last successful layout.
    #[must_use]
    pub fn geometry(&self) -> Option<&PathGeometry> {
        self.geometry.as_ref()
    }

    /// Writes new geometry.
    pub fn set_geometry<B>(&mut self, backend: &mut B, geometry: PathGeometry)
    where
        B: DrawingBackend + ?Sized,
    {
        let Some(node) = self.node else {
            return;
        };
        self.desc.path = geometry.to_path();
        self.desc.orientation = geometry.orientation;
        self.geometry = Some(geometry);
        backend.update_path(node, &self.desc);
    }

    /// Applies stroke, class name and interactivity from `style`.
    pub fn restyle<B>(&mut self, backend: &mut B, style: &ResolvedStyle)
    where
        B: DrawingBackend + ?Sized,
    {
        let Some(node) = self.node else {
            return;
        };
        self.desc.stroke.clone_from(&style.color);
        self.desc.stroke_width = style.stroke_width;
        self.desc.class_name.clone_from(&style.class_name);
        self.desc.interactive = style.on_click.is_some() || style.on_hover.is_some();
        backend.update_path(node, &self.desc);
    }

    /// Points the end of the stroke at another arrowhead, or at none.
    pub fn set_marker<B>(&mut self, backend: &mut B, marker: Option<MarkerId>)
    where
        B: DrawingBackend + ?Sized,
    {
        let Some(node) = self.node else {
            return;
        };
        if self.desc.marker_end == marker {
            return;
        }
        self.desc.marker_end = marker;
        backend.update_path(node, &self.desc);
    }

    /// Destroys the stroke node.
    pub fn remove<B>(&mut self, backend: &mut B)
    where
        B: DrawingBackend + ?Sized,
    {
        if let Some(node) = self.node.take() {
            backend.destroy_node(node);
        }
    }

    /// Returns `true` once removed.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.node.is_none()
    }
}

/// Engine-rendered text label.
#[derive(Clone, Debug)]
pub struct TextLabel {
    node: Option<NodeId>,
    desc: LabelDesc,
    placed: bool,
}

/// Externally rendered label content.
///
/// The engine only computes where it goes and hands that to the placement
/// callback.
#[derive(Clone)]
pub struct CustomLabel {
    placement: LabelPlacement,
    position: Option<Point>,
    removed: bool,
}

impl fmt::Debug for CustomLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomLabel")
            .field("position", &self.position)
            .field("removed", &self.removed)
            .finish_non_exhaustive()
    }
}

/// Label anchored to the path midpoint.
#[derive(Clone, Debug)]
pub enum Label {
    /// Text drawn by the backend.
    Text(TextLabel),
    /// Content drawn by the embedder.
    Custom(CustomLabel),
}

impl Label {
    /// Creates a label for `content`.
    ///
    /// Text labels get a backend node right away; custom labels are placed
    /// once a position is known.
    pub fn new<B>(
        backend: &mut B,
        surface: SurfaceId,
        content: &LabelContent,
        class_name: Option<&String>,
    ) -> Self
    where
        B: DrawingBackend + ?Sized,
    {
        match content {
            LabelContent::Text(text) => {
                let desc = LabelDesc {
                    text: text.clone(),
                    class_name: class_name.cloned(),
                    position: Point::ZERO,
                };
                let node = backend.create_label(surface, &desc);
                Self::Text(TextLabel {
                    node: Some(node),
                    desc,
                    placed: false,
                })
            }
            LabelContent::Custom(placement) => Self::Custom(CustomLabel {
                placement: placement.clone(),
                position: None,
                removed: false,
            }),
        }
    }

    /// The label kind.
    #[must_use]
    pub fn kind(&self) -> LabelKind {
        match self {
            Self::Text(_) => LabelKind::Text,
            Self::Custom(_) => LabelKind::Custom,
        }
    }

    /// Backend node of a text label.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Text(label) => label.node,
            Self::Custom(_) => None,
        }
    }

    /// Last position written, if the label has been placed.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Text(label) => label.placed.then_some(label.desc.position),
            Self::Custom(label) => label.position,
        }
    }

    /// Text of a text label.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(label) => Some(&label.desc.text),
            Self::Custom(_) => None,
        }
    }

    /// Moves the label. Custom content is told through its placement callback.
    pub fn set_position<B>(&mut self, backend: &mut B, position: Point)
    where
        B: DrawingBackend + ?Sized,
    {
        match self {
            Self::Text(label) => {
                let Some(node) = label.node else {
                    return;
                };
                label.desc.position = position;
                label.placed = true;
                backend.update_label(node, &label.desc);
            }
            Self::Custom(label) => {
                if label.removed {
                    return;
                }
                label.position = Some(position);
                (label.placement)(position);
            }
        }
    }

    /// Replaces the content, keeping the node.
    ///
    /// Content of the other kind is ignored; switching kinds takes a new label.
    pub fn set_content<B>(&mut self, backend: &mut B, content: &LabelContent)
    where
        B: DrawingBackend + ?Sized,
    {
        match (self, content) {
            (Self::Text(label), LabelContent::Text(text)) => {
                let Some(node) = label.node else {
                    return;
                };
                if label.desc.text != *text {
                    label.desc.text.clone_from(text);
                    backend.update_label(node, &label.desc);
                }
            }
            (Self::Custom(label), LabelContent::Custom(placement)) => {
                if label.removed {
                    return;
                }
                label.placement = placement.clone();
                if let Some(position) = label.position {
                    (label.placement)(position);
                }
            }
            _ => {}
        }
    }

    /// Sets the class name of a text label.
    pub fn set_class_name<B>(&mut self, backend: &mut B, class_name: Option<&String>)
    where
        B: DrawingBackend + ?Sized,
    {
        if let Self::Text(label) = self
            && let Some(node) = label.node
            && label.desc.class_name.as_ref() != class_name
        {
            label.desc.class_name = class_name.cloned();
            backend.update_label(node, &label.desc);
        }
    }

    /// Destroys the label. Custom content stops receiving positions.
    pub fn remove<B>(&mut self, backend: &mut B)
    where
        B: DrawingBackend + ?Sized,
    {
        match self {
            Self::Text(label) => {
                if let Some(node) = label.node.take() {
                    backend.destroy_node(node);
                }
            }
            Self::Custom(label) => label.removed = true,
        }
    }

    /// Returns `true` once removed.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        match self {
            Self::Text(label) => label.node.is_none(),
            Self::Custom(label) => label.removed,
        }
    }
}
