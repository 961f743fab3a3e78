// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Anchor handles and the element source they resolve against.

use alloc::string::String;
use core::fmt::Debug;
use core::hash::Hash;

/// The embedder's view of the document that anchors live in.
///
/// Implementations are expected to be cheap to query; anchors are resolved on
/// every update.
pub trait ElementSource {
    /// Identity of an element. Two equal values must refer to the same element.
    type Element: Copy + Eq + Hash + Debug;

    /// Looks up an attached element by its string key.
    ///
    /// Returns `None` when no attached element carries the key.
    fn lookup(&self, key: &str) -> Option<Self::Element>;

    /// Returns `true` if the element is currently attached to the document.
    fn is_attached(&self, element: Self::Element) -> bool;
}

/// A reference to an element that a connector is drawn from or to.
///
/// Anchors are never owned by the engine, only observed. Failing to resolve an
/// anchor is not an error: the element may simply not be mounted yet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Anchor<E> {
    /// A stable element identity.
    Element(E),
    /// A lookup key resolved against the [`ElementSource`] on every use.
    Key(String),
}

impl<E: Copy> Anchor<E> {
    /// Creates an anchor that resolves `key` on every use.
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Resolves the anchor to a live element.
    ///
    /// An [`Anchor::Element`] whose element has been detached resolves to `None`.
    pub fn resolve<S>(&self, source: &S) -> Option<E>
    where
        S: ElementSource<Element = E> + ?Sized,
    {
        match self {
            Self::Element(element) => source.is_attached(*element).then_some(*element),
            Self::Key(key) => source.lookup(key),
        }
    }
}
