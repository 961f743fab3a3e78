// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A recording SVG backend.
//!
//! [`SvgBackend`] keeps every surface and node it creates in plain arenas, can
//! export a surface as an SVG fragment, and exposes enough introspection for
//! tests to assert on exactly what the engine created and destroyed.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Debug, Write as _};

use kurbo::{BezPath, PathEl};

use crate::backend::{
    DrawingBackend, LabelDesc, MarkerDesc, MarkerId, NodeId, PathDesc, SurfaceId,
};

/// Class carried by every label element, before any configured class name.
pub const LABEL_BASE_CLASS: &str = "connector-label";

/// Outline of the arrowhead in marker units (a 10x10 box).
const MARKER_OUTLINE: &str = "M0 0L10 5L0 10Z";

/// A node recorded by [`SvgBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum SvgNode {
    /// A connector stroke.
    Path(PathDesc),
    /// An arrowhead definition.
    Marker(MarkerDesc),
    /// A text label.
    Label(LabelDesc),
}

#[derive(Clone, Debug)]
struct SurfaceSlot<C> {
    container: C,
    nodes: Vec<NodeId>,
}

#[derive(Clone, Debug)]
struct Node {
    surface: SurfaceId,
    data: SvgNode,
}

/// A recording [`DrawingBackend`] that can export surfaces as SVG.
///
/// Ids are never reused. Creating a node on a destroyed surface yields an id
/// that is already dead.
#[derive(Clone, Debug)]
pub struct SvgBackend<C> {
    surfaces: Vec<Option<SurfaceSlot<C>>>,
    nodes: Vec<Option<Node>>,
    refused: Vec<C>,
}

impl<C> Default for SvgBackend<C> {
    fn default() -> Self {
        Self {
            surfaces: Vec::new(),
            nodes: Vec::new(),
            refused: Vec::new(),
        }
    }
}

impl<C: Copy + Eq + Debug> SvgBackend<C> {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes [`DrawingBackend::create_surface`] fail for `container`.
    pub fn refuse(&mut self, container: C) {
        if !self.refused.contains(&container) {
            self.refused.push(container);
        }
    }

    /// Lets surfaces be created in `container` again.
    pub fn accept(&mut self, container: C) {
        self.refused.retain(|c| *c != container);
    }

    /// Returns `true` if `surface` has been created and not destroyed.
    #[must_use]
    pub fn is_surface_live(&self, surface: SurfaceId) -> bool {
        self.surface(surface).is_some()
    }

    /// Container a live surface is mounted into.
    #[must_use]
    pub fn container(&self, surface: SurfaceId) -> Option<C> {
        self.surface(surface).map(|slot| slot.container)
    }

    /// Ids of all live surfaces.
    pub fn live_surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.surfaces
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| SurfaceId(to_u32(index)))
    }

    /// Live nodes of a surface in creation order.
    #[must_use]
    pub fn nodes_in(&self, surface: SurfaceId) -> &[NodeId] {
        self.surface(surface)
            .map(|slot| slot.nodes.as_slice())
            .unwrap_or(&[])
    }

    /// A live node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&SvgNode> {
        self.live(node).map(|n| &n.data)
    }

    /// A live path node.
    #[must_use]
    pub fn path(&self, node: NodeId) -> Option<&PathDesc> {
        match self.node(node)? {
            SvgNode::Path(desc) => Some(desc),
            _ => None,
        }
    }

    /// A live marker node.
    #[must_use]
    pub fn marker(&self, node: NodeId) -> Option<&MarkerDesc> {
        match self.node(node)? {
            SvgNode::Marker(desc) => Some(desc),
            _ => None,
        }
    }

    /// A live label node.
    #[must_use]
    pub fn label(&self, node: NodeId) -> Option<&LabelDesc> {
        match self.node(node)? {
            SvgNode::Label(desc) => Some(desc),
            _ => None,
        }
    }

    /// Returns `true` if `node` has been created and not destroyed.
    #[must_use]
    pub fn is_live(&self, node: NodeId) -> bool {
        self.live(node).is_some()
    }

    /// Surface a live node belongs to.
    #[must_use]
    pub fn node_surface(&self, node: NodeId) -> Option<SurfaceId> {
        self.live(node).map(|n| n.surface)
    }

    /// Number of live nodes across all surfaces.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Number of live markers across all surfaces.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter(|n| matches!(n.data, SvgNode::Marker(_)))
            .count()
    }

    /// Exports a live surface as an SVG `<g>` fragment.
    ///
    /// Markers are collected into a leading `<defs>` block, followed by paths
    /// and labels in creation order.
    #[must_use]
    pub fn to_svg(&self, surface: SurfaceId) -> Option<String> {
        let slot = self.surface(surface)?;
        let mut defs = String::new();
        let mut body = String::new();
        for &id in &slot.nodes {
            let Some(node) = self.live(id) else {
                continue;
            };
            match &node.data {
                SvgNode::Marker(desc) => write_marker(&mut defs, desc),
                SvgNode::Path(desc) => write_path(&mut body, desc),
                SvgNode::Label(desc) => write_label(&mut body, desc),
            }
        }
        let mut out = String::from("<g class=\"connector-surface\">");
        if !defs.is_empty() {
            let _ = write!(out, "<defs>{defs}</defs>");
        }
        out.push_str(&body);
        out.push_str("</g>");
        Some(out)
    }

    fn surface(&self, surface: SurfaceId) -> Option<&SurfaceSlot<C>> {
        self.surfaces.get(surface.0 as usize)?.as_ref()
    }

    fn live(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.0 as usize)?.as_ref()
    }

    fn push_node(&mut self, surface: SurfaceId, data: SvgNode) -> NodeId {
        let id = NodeId(to_u32(self.nodes.len()));
        match self.surfaces.get_mut(surface.0 as usize) {
            Some(Some(slot)) => {
                slot.nodes.push(id);
                self.nodes.push(Some(Node { surface, data }));
            }
            _ => {
                log::trace!("node {id:?} requested on dead surface {surface:?}");
                self.nodes.push(None);
            }
        }
        id
    }

    fn live_data_mut(&mut self, node: NodeId) -> Option<&mut SvgNode> {
        self.nodes
            .get_mut(node.0 as usize)?
            .as_mut()
            .map(|n| &mut n.data)
    }
}

impl<C: Copy + Eq + Debug> DrawingBackend for SvgBackend<C> {
    type Container = C;

    fn create_surface(&mut self, container: C) -> Option<SurfaceId> {
        if self.refused.contains(&container) {
            return None;
        }
        let id = SurfaceId(to_u32(self.surfaces.len()));
        self.surfaces.push(Some(SurfaceSlot {
            container,
            nodes: Vec::new(),
        }));
        Some(id)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        let Some(slot) = self
            .surfaces
            .get_mut(surface.0 as usize)
            .and_then(Option::take)
        else {
            return;
        };
        for node in slot.nodes {
            if let Some(entry) = self.nodes.get_mut(node.0 as usize) {
                *entry = None;
            }
        }
    }

    fn create_path(&mut self, surface: SurfaceId, desc: &PathDesc) -> NodeId {
        self.push_node(surface, SvgNode::Path(desc.clone()))
    }

    fn update_path(&mut self, node: NodeId, desc: &PathDesc) {
        if let Some(SvgNode::Path(current)) = self.live_data_mut(node) {
            current.clone_from(desc);
        }
    }

    fn create_marker(&mut self, surface: SurfaceId, desc: &MarkerDesc) -> NodeId {
        self.push_node(surface, SvgNode::Marker(desc.clone()))
    }

    fn update_marker(&mut self, node: NodeId, desc: &MarkerDesc) {
        if let Some(SvgNode::Marker(current)) = self.live_data_mut(node) {
            current.clone_from(desc);
        }
    }

    fn create_label(&mut self, surface: SurfaceId, desc: &LabelDesc) -> NodeId {
        self.push_node(surface, SvgNode::Label(desc.clone()))
    }

    fn update_label(&mut self, node: NodeId, desc: &LabelDesc) {
        if let Some(SvgNode::Label(current)) = self.live_data_mut(node) {
            current.clone_from(desc);
        }
    }

    fn destroy_node(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.get_mut(node.0 as usize).and_then(Option::take) else {
            return;
        };
        if let Some(Some(slot)) = self.surfaces.get_mut(removed.surface.0 as usize) {
            slot.nodes.retain(|n| *n != node);
        }
    }
}

fn to_u32(index: usize) -> u32 {
    u32::try_from(index).expect("too many backend objects for a u32 id")
}

/// Element id of a marker definition, referenced by `marker-end`.
#[must_use]
pub fn marker_element_id(id: MarkerId) -> String {
    format!("connector-marker-{}", id.0)
}

fn write_marker(out: &mut String, desc: &MarkerDesc) {
    let size = fmt_f64(desc.size);
    let _ = write!(
        out,
        "<marker id=\"{}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" \
         markerUnits=\"userSpaceOnUse\" markerWidth=\"{size}\" markerHeight=\"{size}\" \
         orient=\"auto\"><path d=\"{MARKER_OUTLINE}\" fill=\"{}\"/></marker>",
        marker_element_id(desc.id),
        escape(&desc.fill),
    );
}

fn write_path(out: &mut String, desc: &PathDesc) {
    let _ = write!(
        out,
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"",
        path_to_svg_d(&desc.path),
        escape(&desc.stroke),
        fmt_f64(desc.stroke_width),
    );
    if let Some(class) = &desc.class_name {
        let _ = write!(out, " class=\"{}\"", escape(class));
    }
    if let Some(marker) = desc.marker_end {
        let _ = write!(out, " marker-end=\"url(#{})\"", marker_element_id(marker));
    }
    if !desc.interactive {
        out.push_str(" pointer-events=\"none\"");
    }
    out.push_str("/>");
}

fn write_label(out: &mut String, desc: &LabelDesc) {
    let _ = write!(out, "<text class=\"{LABEL_BASE_CLASS}");
    if let Some(class) = &desc.class_name {
        let _ = write!(out, " {}", escape(class));
    }
    let _ = write!(
        out,
        "\" x=\"{}\" y=\"{}\" text-anchor=\"middle\">{}</text>",
        fmt_f64(desc.position.x),
        fmt_f64(desc.position.y),
        escape(&desc.text),
    );
}

fn path_to_svg_d(path: &BezPath) -> String {
    let mut d = String::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                let _ = write!(d, "M{} {}", fmt_f64(p.x), fmt_f64(p.y));
            }
            PathEl::LineTo(p) => {
                let _ = write!(d, "L{} {}", fmt_f64(p.x), fmt_f64(p.y));
            }
            PathEl::QuadTo(p1, p) => {
                let _ = write!(
                    d,
                    "Q{} {} {} {}",
                    fmt_f64(p1.x),
                    fmt_f64(p1.y),
                    fmt_f64(p.x),
                    fmt_f64(p.y)
                );
            }
            PathEl::CurveTo(p1, p2, p) => {
                let _ = write!(
                    d,
                    "C{} {} {} {} {} {}",
                    fmt_f64(p1.x),
                    fmt_f64(p1.y),
                    fmt_f64(p2.x),
                    fmt_f64(p2.y),
                    fmt_f64(p.x),
                    fmt_f64(p.y)
                );
            }
            PathEl::ClosePath => d.push('Z'),
        }
    }
    d
}

fn fmt_f64(v: f64) -> String {
    // Integers print bare; everything else with at most three decimals.
    if !v.is_finite() {
        return format!("{v}");
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "best-effort pretty formatting"
    )]
    let i = v as i64;
    let diff = (i as f64) - v;
    if diff > -1e-9 && diff < 1e-9 {
        return format!("{i}");
    }

    let mut s = format!("{v:.3}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
