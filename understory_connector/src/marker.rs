// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-surface arrowhead definitions with reference counting.

use alloc::borrow::ToOwned as _;
use alloc::string::{String, ToString};
use core::sync::atomic::{AtomicU32, Ordering};

use hashbrown::HashMap;

use crate::backend::{DrawingBackend, MarkerDesc, MarkerId, NodeId, SurfaceId};

/// A connector's reference to an arrowhead in a [`MarkerPool`].
///
/// Referencing a marker does not own it; the pool destroys the definition once
/// its last reference is released.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerRef {
    id: MarkerId,
    node: NodeId,
}

impl MarkerRef {
    /// Engine-generated marker id.
    #[must_use]
    pub fn id(self) -> MarkerId {
        self.id
    }

    /// Backend node of the definition.
    #[must_use]
    pub fn node(self) -> NodeId {
        self.node
    }
}

#[derive(Clone, Debug)]
struct Entry {
    node: NodeId,
    refs: u32,
    share_key: Option<String>,
    desc: MarkerDesc,
}

/// Source of marker ids for every pool in the process.
///
/// Exported definitions are referenced by document-wide element ids, so ids
/// must not repeat across surfaces or layers rendered into one page.
static NEXT_MARKER_ID: AtomicU32 = AtomicU32::new(0);

fn next_marker_id() -> MarkerId {
    let id = NEXT_MARKER_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
        .expect("marker id space exhausted");
    MarkerId(id)
}

/// Arrowhead definitions of one surface.
///
/// Ids come from a process-wide counter and are never reused, so no two
/// markers share one, on this surface or any other. Markers acquired with the same share key are
/// one definition; everything else gets its own.
#[derive(Clone, Debug, Default)]
pub struct MarkerPool {
    entries: HashMap<MarkerId, Entry>,
    shared: HashMap<String, MarkerId>,
}

impl MarkerPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a reference to an arrowhead, creating the definition if needed.
    ///
    /// With a `share_key` that is already live, the existing definition gains a
    /// reference and takes the requested size and fill (last writer wins).
    pub fn acquire<B>(
        &mut self,
        backend: &mut B,
        surface: SurfaceId,
        share_key: Option<&str>,
        size: f64,
        fill: &str,
    ) -> MarkerRef
    where
        B: DrawingBackend + ?Sized,
    {
        if let Some(key) = share_key
            && let Some(&id) = self.shared.get(key)
            && let Some(entry) = self.entries.get_mut(&id)
        {
            entry.refs += 1;
            restyle_entry(backend, entry, size, fill);
            return MarkerRef {
                id,
                node: entry.node,
            };
        }

        let id = next_marker_id();
        let desc = MarkerDesc {
            id,
            size,
            fill: fill.to_string(),
        };
        let node = backend.create_marker(surface, &desc);
        if let Some(key) = share_key {
            self.shared.insert(key.to_string(), id);
        }
        log::trace!("marker {id:?} created (shared: {share_key:?})");
        self.entries.insert(
            id,
            Entry {
                node,
                refs: 1,
                share_key: share_key.map(ToString::to_string),
                desc,
            },
        );
        MarkerRef { id, node }
    }

    /// Updates size and fill of a live marker. Returns `false` if it is gone.
    pub fn restyle<B>(&mut self, backend: &mut B, marker: MarkerRef, size: f64, fill: &str) -> bool
    where
        B: DrawingBackend + ?Sized,
    {
        match self.entries.get_mut(&marker.id) {
            Some(entry) => {
                restyle_entry(backend, entry, size, fill);
                true
            }
            None => false,
        }
    }

    /// Drops one reference. The definition is destroyed with the last one.
    ///
    /// Returns `true` if the definition was destroyed. Releasing a marker that
    /// is no longer in the pool is a no-op.
    pub fn release<B>(&mut self, backend: &mut B, marker: MarkerRef) -> bool
    where
        B: DrawingBackend + ?Sized,
    {
        let Some(entry) = self.entries.get_mut(&marker.id) else {
            return false;
        };
        entry.refs -= 1;
        if entry.refs > 0 {
            return false;
        }
        if let Some(entry) = self.entries.remove(&marker.id) {
            if let Some(key) = entry.share_key {
                self.shared.remove(&key);
            }
            backend.destroy_node(entry.node);
            log::trace!("marker {:?} destroyed", marker.id);
        }
        true
    }

    /// Number of live references to `id`, zero if it is not live.
    #[must_use]
    pub fn refs(&self, id: MarkerId) -> u32 {
        self.entries.get(&id).map_or(0, |entry| entry.refs)
    }

    /// Current description of a live marker.
    #[must_use]
    pub fn get(&self, id: MarkerId) -> Option<&MarkerDesc> {
        self.entries.get(&id).map(|entry| &entry.desc)
    }

    /// Live marker bound to a share key.
    #[must_use]
    pub fn shared(&self, key: &str) -> Option<MarkerId> {
        self.shared.get(key).copied()
    }

    /// Returns `true` if `id` is live.
    #[must_use]
    pub fn contains(&self, id: MarkerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no definition is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn restyle_entry<B>(backend: &mut B, entry: &mut Entry, size: f64, fill: &str)
where
    B: DrawingBackend + ?Sized,
{
    if entry.desc.size == size && entry.desc.fill == fill {
        return;
    }
    entry.desc.size = size;
    fill.clone_into(&mut entry.desc.fill);
    backend.update_marker(entry.node, &entry.desc);
}
