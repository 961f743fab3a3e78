// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The document anchors and containers live in, and an in-memory implementation.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Rect, Vec2};
use understory_anchor::ElementSource;

/// An [`ElementSource`] that can also measure its elements.
pub trait Document: ElementSource {
    /// Bounding rectangle of an attached element, in document coordinates.
    ///
    /// Returns `None` for detached or unknown elements.
    fn bounding_rect(&self, element: Self::Element) -> Option<Rect>;
}

/// Element handle of a [`MemoryDocument`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

#[derive(Clone, Debug)]
struct Element {
    rect: Rect,
    key: Option<String>,
    attached: bool,
}

/// A flat, in-memory document of rectangles.
///
/// Useful for tests, benchmarks and headless layout. Handles are never reused,
/// so a removed element stays unresolvable forever.
///
/// # Example
///
/// ```rust
/// use kurbo::Rect;
/// use understory_anchor::{Anchor, ElementSource};
/// use understory_connector::{Document, MemoryDocument};
///
/// let mut doc = MemoryDocument::new();
/// let a = doc.insert_keyed("a", Rect::new(0.0, 0.0, 10.0, 10.0));
///
/// assert_eq!(Anchor::key("a").resolve(&doc), Some(a));
/// doc.detach(a);
/// assert_eq!(doc.lookup("a"), None);
/// assert_eq!(doc.bounding_rect(a), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryDocument {
    elements: Vec<Option<Element>>,
    keys: HashMap<String, ElementId>,
}

impl MemoryDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an attached element without a lookup key.
    pub fn insert(&mut self, rect: Rect) -> ElementId {
        self.push(Element {
            rect,
            key: None,
            attached: true,
        })
    }

    /// Inserts an attached element reachable through `key`.
    ///
    /// If another element already carries the key, the key moves to the new one.
    pub fn insert_keyed(&mut self, key: impl Into<String>, rect: Rect) -> ElementId {
        let key = key.into();
        let id = self.push(Element {
            rect,
            key: Some(key.clone()),
            attached: true,
        });
        if let Some(previous) = self.keys.insert(key, id) {
            if let Some(Some(element)) = self.elements.get_mut(previous.0 as usize) {
                element.key = None;
            }
        }
        id
    }

    /// Moves an element to `rect`. Returns `false` for removed elements.
    pub fn set_rect(&mut self, id: ElementId, rect: Rect) -> bool {
        match self.get_mut(id) {
            Some(element) => {
                element.rect = rect;
                true
            }
            None => false,
        }
    }

    /// Translates an element by `delta`. Returns `false` for removed elements.
    pub fn translate(&mut self, id: ElementId, delta: Vec2) -> bool {
        match self.get_mut(id) {
            Some(element) => {
                element.rect = element.rect + delta;
                true
            }
            None => false,
        }
    }

    /// Detaches an element; it keeps its handle and can be re-attached.
    pub fn detach(&mut self, id: ElementId) {
        if let Some(element) = self.get_mut(id) {
            element.attached = false;
        }
    }

    /// Re-attaches a detached element.
    pub fn attach(&mut self, id: ElementId) {
        if let Some(element) = self.get_mut(id) {
            element.attached = true;
        }
    }

    /// Removes an element for good, releasing its lookup key.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let Some(slot) = self.elements.get_mut(id.0 as usize) else {
            return false;
        };
        let Some(element) = slot.take() else {
            return false;
        };
        if let Some(key) = element.key {
            self.keys.remove(&key);
        }
        true
    }

    /// Current rectangle of an element, attached or not.
    #[must_use]
    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.get(id).map(|element| element.rect)
    }

    /// Number of elements that have not been removed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.iter().flatten().count()
    }

    /// Returns `true` if every element has been removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, element: Element) -> ElementId {
        let id = ElementId(
            u32::try_from(self.elements.len()).expect("too many elements for ElementId (u32)"),
        );
        self.elements.push(Some(element));
        id
    }

    fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0 as usize)?.as_ref()
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0 as usize)?.as_mut()
    }
}

impl ElementSource for MemoryDocument {
    type Element = ElementId;

    fn lookup(&self, key: &str) -> Option<ElementId> {
        let id = *self.keys.get(key)?;
        self.is_attached(id).then_some(id)
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.get(element).is_some_and(|element| element.attached)
    }
}

impl Document for MemoryDocument {
    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        self.get(element)
            .filter(|element| element.attached)
            .map(|element| element.rect)
    }
}
