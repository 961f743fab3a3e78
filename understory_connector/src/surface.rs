// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One drawable root per container, recreated when the container changes.

use core::fmt;

use understory_anchor::ElementSource;

use crate::backend::{DrawingBackend, SurfaceId};
use crate::marker::MarkerPool;

/// Why a surface could not be provided.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// The container is not attached to the document.
    ContainerDetached,
    /// The backend could not mount a surface into the container.
    BackendRefused,
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerDetached => f.write_str("container is not attached to the document"),
            Self::BackendRefused => f.write_str("backend refused to mount a surface"),
        }
    }
}

impl core::error::Error for SurfaceError {}

/// A live drawable root bound to one container.
#[derive(Debug)]
pub struct Surface<C> {
    id: SurfaceId,
    container: C,
    epoch: u64,
    markers: MarkerPool,
}

impl<C: Copy> Surface<C> {
    /// Backend id of the root.
    #[must_use]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// The container this surface is mounted into.
    #[must_use]
    pub fn container(&self) -> C {
        self.container
    }

    /// Creation generation. Strictly increases with every new surface of a host.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Arrowhead definitions of this surface.
    #[must_use]
    pub fn markers(&self) -> &MarkerPool {
        &self.markers
    }

    /// Mutable access to the arrowhead definitions.
    pub fn markers_mut(&mut self) -> &mut MarkerPool {
        &mut self.markers
    }
}

/// Owns at most one [`Surface`] at a time.
///
/// # Example
///
/// ```rust
/// use kurbo::Rect;
/// use understory_connector::{MemoryDocument, SurfaceHost, SvgBackend};
///
/// let mut doc = MemoryDocument::new();
/// let a = doc.insert(Rect::new(0.0, 0.0, 100.0, 100.0));
/// let b = doc.insert(Rect::new(0.0, 0.0, 100.0, 100.0));
/// let mut backend = SvgBackend::new();
/// let mut host = SurfaceHost::new();
///
/// let first = host.ensure(&mut backend, &doc, a).unwrap().id();
/// assert_eq!(host.ensure(&mut backend, &doc, a).unwrap().id(), first);
///
/// let second = host.ensure(&mut backend, &doc, b).unwrap();
/// assert_eq!(second.epoch(), 2);
/// assert!(!backend.is_surface_live(first));
/// ```
#[derive(Debug)]
pub struct SurfaceHost<C> {
    current: Option<Surface<C>>,
    epoch: u64,
}

impl<C> Default for SurfaceHost<C> {
    fn default() -> Self {
        Self {
            current: None,
            epoch: 0,
        }
    }
}

impl<C: Copy + Eq + fmt::Debug> SurfaceHost<C> {
    /// Creates a host without a surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the surface for `container`, creating it if needed.
    ///
    /// A live surface bound to the same container is returned as is. Any other
    /// live surface is torn down first, so at most one exists at a time. A
    /// container that is no longer attached loses its surface.
    pub fn ensure<B, S>(
        &mut self,
        backend: &mut B,
        document: &S,
        container: C,
    ) -> Result<&mut Surface<C>, SurfaceError>
    where
        B: DrawingBackend<Container = C> + ?Sized,
        S: ElementSource<Element = C> + ?Sized,
    {
        if !document.is_attached(container) {
            self.teardown(backend);
            return Err(SurfaceError::ContainerDetached);
        }
        let reuse = matches!(&self.current, Some(surface) if surface.container == container);
        if !reuse {
            self.teardown(backend);
            let id = backend
                .create_surface(container)
                .ok_or(SurfaceError::BackendRefused)?;
            self.epoch += 1;
            log::debug!(
                "surface {id:?} created in {container:?} (epoch {})",
                self.epoch
            );
            self.current = Some(Surface {
                id,
                container,
                epoch: self.epoch,
                markers: MarkerPool::new(),
            });
        }
        self.current.as_mut().ok_or(SurfaceError::BackendRefused)
    }

    /// Destroys the current surface, if any, with every node in it.
    pub fn teardown<B>(&mut self, backend: &mut B)
    where
        B: DrawingBackend<Container = C> + ?Sized,
    {
        if let Some(surface) = self.current.take() {
            backend.destroy_surface(surface.id);
            log::debug!(
                "surface {:?} torn down (epoch {})",
                surface.id,
                surface.epoch
            );
        }
    }

    /// The live surface.
    #[must_use]
    pub fn current(&self) -> Option<&Surface<C>> {
        self.current.as_ref()
    }

    /// Mutable access to the live surface.
    pub fn current_mut(&mut self) -> Option<&mut Surface<C>> {
        self.current.as_mut()
    }

    /// Epoch of the most recently created surface; `0` before the first one.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryDocument, SvgBackend};
    use kurbo::Rect;

    #[test]
    fn same_container_is_created_once() {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Rect::ZERO);
        let mut backend = SvgBackend::new();
        let mut host = SurfaceHost::new();

        let id = host.ensure(&mut backend, &doc, container).unwrap().id();
        for _ in 0..3 {
            let surface = host.ensure(&mut backend, &doc, container).unwrap();
            assert_eq!(surface.id(), id);
            assert_eq!(surface.epoch(), 1);
        }
        assert_eq!(backend.live_surfaces().count(), 1);
    }

    #[test]
    fn detached_container_loses_its_surface() {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Rect::ZERO);
        let mut backend = SvgBackend::new();
        let mut host = SurfaceHost::new();

        let id = host.ensure(&mut backend, &doc, container).unwrap().id();
        doc.detach(container);
        assert_eq!(
            host.ensure(&mut backend, &doc, container).err(),
            Some(SurfaceError::ContainerDetached)
        );
        assert!(host.current().is_none());
        assert!(!backend.is_surface_live(id));

        doc.attach(container);
        let surface = host.ensure(&mut backend, &doc, container).unwrap();
        assert_eq!(surface.epoch(), 2);
    }

    #[test]
    fn refusal_leaves_no_surface_and_no_epoch_bump() {
        let mut doc = MemoryDocument::new();
        let container = doc.insert(Rect::ZERO);
        let mut backend = SvgBackend::new();
        backend.refuse(container);
        let mut host = SurfaceHost::new();

        assert_eq!(
            host.ensure(&mut backend, &doc, container).err(),
            Some(SurfaceError::BackendRefused)
        );
        assert_eq!(host.epoch(), 0);

        backend.accept(container);
        assert_eq!(host.ensure(&mut backend, &doc, container).unwrap().epoch(), 1);
    }
}
