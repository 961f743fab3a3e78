// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds connectors and their optional parts from a resolved style.
//!
//! These functions keep no state of their own; everything they create lives in
//! the backend, the surface's [`MarkerPool`](crate::MarkerPool) and the returned
//! values.

use core::fmt::Debug;

use crate::backend::{DrawingBackend, SurfaceId};
use crate::config::ResolvedStyle;
use crate::connector::Connector;
use crate::marker::MarkerRef;
use crate::primitives::{Label, Path};
use crate::surface::Surface;

/// Creates the path, marker and label of a new connector on `surface`.
///
/// A marker is acquired only when the style asks for a head. The label kind
/// follows the configured content.
pub fn create_connector<B, C>(
    backend: &mut B,
    surface: &mut Surface<C>,
    style: &ResolvedStyle,
) -> Connector
where
    B: DrawingBackend<Container = C> + ?Sized,
    C: Copy + Eq + Debug,
{
    let marker = style
        .with_head
        .then(|| create_marker(backend, surface, style));
    let path = Path::new(backend, surface.id(), style, marker.map(MarkerRef::id));
    let label = create_label(backend, surface.id(), style);
    Connector::new(surface.id(), path, marker, label)
}

/// Acquires the arrowhead described by `style` from the surface's pool.
pub fn create_marker<B, C>(backend: &mut B, surface: &mut Surface<C>, style: &ResolvedStyle) -> MarkerRef
where
    B: DrawingBackend<Container = C> + ?Sized,
    C: Copy + Eq + Debug,
{
    let id = surface.id();
    surface.markers_mut().acquire(
        backend,
        id,
        style.shared_marker.as_deref(),
        style.head_size,
        &style.head_fill,
    )
}

/// Creates the label described by `style`, if it has one.
pub fn create_label<B>(backend: &mut B, surface: SurfaceId, style: &ResolvedStyle) -> Option<Label>
where
    B: DrawingBackend + ?Sized,
{
    style
        .label
        .as_ref()
        .map(|content| Label::new(backend, surface, content, style.label_class_name.as_ref()))
}
