//! Structured build-log tree.
//!
//! A build log is a rooted, ordered tree: build → project → target → task →
//! message / property / item. This crate provides the node model shared by
//! every codec in the workspace, plus the traversal engine used by viewers
//! and tools to navigate it.
//!
//! # Key Types
//!
//! - [`Tree`] -- arena that owns every node; children are owned by their
//!   parent slot, the parent link is a plain index
//! - [`NodeRef`] -- copyable read-only handle with the traversal API
//! - [`NodeKind`] -- closed set of kinds plus a placeholder for unknown tags
//! - [`Query`] -- tag-guarded filter used by every typed search
//! - [`TreeBuilder`] -- push/pop construction used by the readers
//!
//! # Design Rules
//!
//! 1. Child order is insertion order and defines document order.
//! 2. A node's kind never changes after construction.
//! 3. A finished tree is `Send + Sync`; concurrent readers need no locking.

pub mod builder;
pub mod error;
pub mod kind;
pub mod node;
pub mod query;
pub mod traverse;
pub mod tree;

#[cfg(any(test, feature = "proptest"))]
pub mod testing;

pub use builder::TreeBuilder;
pub use error::{TreeError, TreeResult};
pub use kind::{NodeKind, UnknownKindName, END_OF_CHILDREN_TAG, KNOWN_KINDS};
pub use node::{Node, NodeId};
pub use query::{KindFilter, Query};
pub use tree::{Children, Descendants, NodeRef, Tree};
