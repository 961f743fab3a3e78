// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_anchor --heading-base-level=0

//! Understory Anchor: anchor handles and a subscription registry for re-layout.
//!
//! Anything drawn *between* elements of a mutable surface (connectors, callouts,
//! tethered popovers) needs to hear about it when one of those elements may have
//! moved. This crate provides the bookkeeping for that, and nothing else:
//!
//! - [`Anchor`]: an opaque handle to an element, either by stable identity or by
//!   a string lookup key that is resolved again on every use.
//! - [`ElementSource`]: the embedder's document. It answers "which element has
//!   this key" and "is this element still attached".
//! - [`AnchorRegistry`]: maps a resolved element to the ordered set of subscriber
//!   handles interested in it, and hands out owned [`Notify`] snapshots so that
//!   subscribers may register or unregister while a notification is in flight.
//!
//! The registry never owns elements. Rather than relying on weak references it
//! interns every element into a generational [`AnchorId`] slot at first
//! registration. A slot is reclaimed as soon as its last subscriber leaves, and
//! [`AnchorRegistry::sweep`] reclaims slots whose element was detached from the
//! document without anyone unregistering.
//!
//! ## Example
//!
//! ```rust
//! use understory_anchor::{Anchor, AnchorRegistry, ElementSource};
//!
//! struct Doc;
//!
//! impl ElementSource for Doc {
//!     type Element = u32;
//!
//!     fn lookup(&self, key: &str) -> Option<u32> {
//!         (key == "target").then_some(7)
//!     }
//!
//!     fn is_attached(&self, element: u32) -> bool {
//!         element < 10
//!     }
//! }
//!
//! let doc = Doc;
//! let mut registry = AnchorRegistry::<u32, &'static str>::new();
//!
//! registry.register(&doc, &Anchor::key("target"), "line-a");
//! registry.register(&doc, &Anchor::Element(7), "line-b");
//! // Duplicate registration is a no-op.
//! registry.register(&doc, &Anchor::Element(7), "line-a");
//! // Unresolvable anchors are ignored.
//! registry.register(&doc, &Anchor::key("missing"), "line-c");
//!
//! let fired: Vec<_> = registry.notify(7).collect();
//! assert_eq!(fired, ["line-a", "line-b"]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod anchor;
mod registry;

pub use anchor::{Anchor, ElementSource};
pub use registry::{AnchorId, AnchorRegistry, Notify};
