// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena-indexed subscription table keyed by element identity.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::anchor::{Anchor, ElementSource};

/// Subscribers stored inline per anchor before spilling to the heap.
const INLINE_SUBSCRIBERS: usize = 4;

type Subscribers<H> = SmallVec<[H; INLINE_SUBSCRIBERS]>;

/// Handle of an interned anchor slot.
///
/// A slot index plus a generation counter, in the same spirit as a box-tree
/// node id: once the slot is reclaimed and reused, the generation moves on and
/// stale ids never alias the new occupant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AnchorId(u32, u32);

impl AnchorId {
    /// Returns the slot index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the generation of the slot at the time this id was issued.
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u32 {
        self.1
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct Slot<E, H> {
    element: Option<E>,
    generation: u32,
    subscribers: Subscribers<H>,
}

/// Owned snapshot of the subscribers of one notification.
///
/// The snapshot is taken before the first subscriber runs, so the registry may
/// be mutated freely while iterating: late registrations are not picked up and
/// removals do not cause other subscribers to be skipped.
#[derive(Debug)]
pub struct Notify<H>
where
    H: Copy,
{
    inner: smallvec::IntoIter<[H; INLINE_SUBSCRIBERS]>,
}

impl<H: Copy> Notify<H> {
    fn new(handles: Subscribers<H>) -> Self {
        Self {
            inner: handles.into_iter(),
        }
    }

    fn empty() -> Self {
        Self::new(SmallVec::new())
    }
}

impl<H: Copy> Iterator for Notify<H> {
    type Item = H;

    #[inline]
    fn next(&mut self) -> Option<H> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<H: Copy> ExactSizeIterator for Notify<H> {}

/// Maps anchor elements to the handles that want to hear when they move.
///
/// # Type Parameters
///
/// - `E`: element identity, as produced by an [`ElementSource`].
/// - `H`: subscriber handle. Equality defines "the same callback": a handle is
///   present at most once per element no matter how often it registers.
///
/// Subscribers of one element are notified in registration order. No ordering
/// is defined across elements.
///
/// # Example
///
/// ```rust
/// use understory_anchor::AnchorRegistry;
///
/// let mut registry = AnchorRegistry::<u32, u8>::new();
/// assert!(registry.register_element(1, 10));
/// assert!(!registry.register_element(1, 10));
/// registry.register_element(1, 11);
///
/// // A subscriber may unregister itself mid-notification; the snapshot is unaffected.
/// let mut seen = Vec::new();
/// for handle in registry.notify(1) {
///     registry.unregister_element(1, handle);
///     seen.push(handle);
/// }
/// assert_eq!(seen, [10, 11]);
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct AnchorRegistry<E, H>
where
    E: Copy + Eq + Hash,
    H: Copy + Eq,
{
    slots: Vec<Slot<E, H>>,
    free: Vec<u32>,
    index: HashMap<E, AnchorId>,
}

impl<E, H> Default for AnchorRegistry<E, H>
where
    E: Copy + Eq + Hash,
    H: Copy + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, H> AnchorRegistry<E, H>
where
    E: Copy + Eq + Hash,
    H: Copy + Eq,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of elements that currently have at least one subscriber.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no element has subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns `true` if `element` has at least one subscriber.
    #[must_use]
    pub fn contains(&self, element: E) -> bool {
        self.index.contains_key(&element)
    }

    /// Returns the slot id interned for `element`, if it has subscribers.
    #[must_use]
    pub fn anchor_id(&self, element: E) -> Option<AnchorId> {
        self.index.get(&element).copied()
    }

    /// Returns the element occupying `id`, or `None` if the id is stale.
    #[must_use]
    pub fn element(&self, id: AnchorId) -> Option<E> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation == id.generation() {
            slot.element
        } else {
            None
        }
    }

    /// Subscribers of `element` in registration order.
    #[must_use]
    pub fn subscribers(&self, element: E) -> &[H] {
        match self.index.get(&element) {
            Some(id) => self.slots[id.idx()].subscribers.as_slice(),
            None => &[],
        }
    }

    /// Returns `true` if `handle` is subscribed to `element`.
    #[must_use]
    pub fn is_registered(&self, element: E, handle: H) -> bool {
        self.subscribers(element).contains(&handle)
    }

    /// Resolves `anchor` and subscribes `handle` to the resulting element.
    ///
    /// Unresolvable anchors are ignored. Returns `true` if a new subscription
    /// was added.
    pub fn register<S>(&mut self, source: &S, anchor: &Anchor<E>, handle: H) -> bool
    where
        S: ElementSource<Element = E> + ?Sized,
    {
        match anchor.resolve(source) {
            Some(element) => self.register_element(element, handle),
            None => false,
        }
    }

    /// Subscribes `handle` to `element`.
    ///
    /// Returns `false` if the pair was already registered; the handle keeps its
    /// original position in the notification order.
    pub fn register_element(&mut self, element: E, handle: H) -> bool {
        let id = match self.index.get(&element) {
            Some(&id) => id,
            None => self.intern(element),
        };
        let subscribers = &mut self.slots[id.idx()].subscribers;
        if subscribers.contains(&handle) {
            return false;
        }
        subscribers.push(handle);
        true
    }

    /// Resolves `anchor` and removes `handle` from the resulting element.
    ///
    /// Returns `true` if a subscription was removed.
    pub fn unregister<S>(&mut self, source: &S, anchor: &Anchor<E>, handle: H) -> bool
    where
        S: ElementSource<Element = E> + ?Sized,
    {
        match anchor.resolve(source) {
            Some(element) => self.unregister_element(element, handle),
            None => false,
        }
    }

    /// Removes `handle` from `element`.
    ///
    /// The element's slot is reclaimed once its last subscriber is gone.
    pub fn unregister_element(&mut self, element: E, handle: H) -> bool {
        let Some(&id) = self.index.get(&element) else {
            return false;
        };
        let subscribers = &mut self.slots[id.idx()].subscribers;
        let Some(pos) = subscribers.iter().position(|h| *h == handle) else {
            return false;
        };
        subscribers.remove(pos);
        if subscribers.is_empty() {
            self.reclaim(element, id);
        }
        true
    }

    /// Removes `handle` from every element it is subscribed to.
    ///
    /// Returns the number of subscriptions removed.
    pub fn unregister_handle(&mut self, handle: H) -> usize {
        let mut emptied: Vec<(E, AnchorId)> = Vec::new();
        let mut removed = 0;
        for (&element, &id) in &self.index {
            let subscribers = &mut self.slots[id.idx()].subscribers;
            if let Some(pos) = subscribers.iter().position(|h| *h == handle) {
                subscribers.remove(pos);
                removed += 1;
                if subscribers.is_empty() {
                    emptied.push((element, id));
                }
            }
        }
        for (element, id) in emptied {
            self.reclaim(element, id);
        }
        removed
    }

    /// Snapshot of the subscribers of `element`.
    ///
    /// Elements without subscribers yield an empty snapshot.
    #[must_use = "a notification does nothing unless its handles are dispatched"]
    pub fn notify(&self, element: E) -> Notify<H> {
        match self.index.get(&element) {
            Some(id) => Notify::new(self.slots[id.idx()].subscribers.clone()),
            None => Notify::empty(),
        }
    }

    /// Reclaims slots whose element is no longer attached to `source`.
    ///
    /// This stands in for weak keys: detached elements stop pinning their
    /// subscriptions even if nobody unregistered. Returns the number of
    /// reclaimed slots.
    pub fn sweep<S>(&mut self, source: &S) -> usize
    where
        S: ElementSource<Element = E> + ?Sized,
    {
        let dead: Vec<(E, AnchorId)> = self
            .index
            .iter()
            .filter(|(element, _)| !source.is_attached(**element))
            .map(|(element, id)| (*element, *id))
            .collect();
        let count = dead.len();
        for (element, id) in dead {
            self.reclaim(element, id);
        }
        count
    }

    /// Drops every subscription.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
    }

    fn intern(&mut self, element: E) -> AnchorId {
        let id = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.element = Some(element);
            AnchorId(idx, slot.generation)
        } else {
            let idx = u32::try_from(self.slots.len()).expect("too many anchors for AnchorId (u32)");
            self.slots.push(Slot {
                element: Some(element),
                generation: 1,
                subscribers: SmallVec::new(),
            });
            AnchorId(idx, 1)
        };
        self.index.insert(element, id);
        id
    }

    fn reclaim(&mut self, element: E, id: AnchorId) {
        self.index.remove(&element);
        let slot = &mut self.slots[id.idx()];
        slot.element = None;
        slot.subscribers.clear();
        self.free.push(id.index());
    }
}

impl<E, H> AnchorRegistry<E, H>
where
    E: Copy + Eq + Hash,
    H: Copy + Eq + Hash,
{
    /// Snapshot of every distinct subscribed handle.
    ///
    /// Handles are listed once even when subscribed to several elements, in
    /// slot order. This only covers handles that registered; callers that own
    /// unregistered subscribers must refresh those themselves.
    #[must_use = "a notification does nothing unless its handles are dispatched"]
    pub fn notify_all(&self) -> Notify<H> {
        let mut seen = HashSet::new();
        let mut handles = SmallVec::new();
        for slot in &self.slots {
            if slot.element.is_none() {
                continue;
            }
            for &handle in &slot.subscribers {
                if seen.insert(handle) {
                    handles.push(handle);
                }
            }
        }
        Notify::new(handles)
    }
}
