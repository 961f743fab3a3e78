// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing backend trait and the plain-data descriptors it consumes.

use alloc::string::String;
use core::fmt::Debug;

use kurbo::{BezPath, Point};

/// Identifier of a drawable surface root created by a backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

/// Identifier of a drawable node (path, marker or label) created by a backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Identifier of an arrowhead definition.
///
/// Marker ids are generated by the engine, never supplied by callers, so two
/// live markers on one surface cannot collide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u32);

/// A connector stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct PathDesc {
    /// Path data; empty until the first successful layout.
    pub path: BezPath,
    /// Stroke color.
    pub stroke: String,
    /// Stroke width.
    pub stroke_width: f64,
    /// Class name passed through from the style.
    pub class_name: Option<String>,
    /// Arrowhead drawn at the end of the path.
    pub marker_end: Option<MarkerId>,
    /// Direction of travel at the end point, in radians.
    pub orientation: f64,
    /// Whether the path receives pointer events.
    pub interactive: bool,
}

/// An arrowhead definition.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerDesc {
    /// Engine-generated id.
    pub id: MarkerId,
    /// Width and height of the arrowhead.
    pub size: f64,
    /// Fill color.
    pub fill: String,
}

/// An engine-rendered text label.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelDesc {
    /// Label text.
    pub text: String,
    /// Class name in addition to the backend's base label class.
    pub class_name: Option<String>,
    /// Anchor position (the path midpoint).
    pub position: Point,
}

/// Low-level factory for drawable nodes.
///
/// This is the seam between the engine and whatever actually draws: a DOM/SVG
/// binding, a retained scene, or the recording [`SvgBackend`](crate::SvgBackend).
///
/// Implementations must treat operations on destroyed surfaces and nodes as
/// no-ops. Notifications can arrive after a surface has been torn down, and
/// they must stay harmless.
pub trait DrawingBackend {
    /// Identity of the element a surface is mounted into.
    type Container: Copy + Eq + Debug;

    /// Creates a surface root inside `container`.
    ///
    /// Returns `None` if the backend cannot mount into the container.
    fn create_surface(&mut self, container: Self::Container) -> Option<SurfaceId>;

    /// Removes a surface root from its container, together with every node in it.
    fn destroy_surface(&mut self, surface: SurfaceId);

    /// Creates a path node.
    fn create_path(&mut self, surface: SurfaceId, desc: &PathDesc) -> NodeId;

    /// Replaces the description of a path node.
    fn update_path(&mut self, node: NodeId, desc: &PathDesc);

    /// Creates an arrowhead definition.
    fn create_marker(&mut self, surface: SurfaceId, desc: &MarkerDesc) -> NodeId;

    /// Replaces the description of an arrowhead definition.
    fn update_marker(&mut self, node: NodeId, desc: &MarkerDesc);

    /// Creates a text label node.
    fn create_label(&mut self, surface: SurfaceId, desc: &LabelDesc) -> NodeId;

    /// Replaces the description of a text label node.
    fn update_label(&mut self, node: NodeId, desc: &LabelDesc);

    /// Destroys any node.
    fn destroy_node(&mut self, node: NodeId);
}
