//! Node identifiers and detached node values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kind::NodeKind;

/// Index of a node within its owning [`Tree`](crate::Tree).
///
/// Ids are only meaningful for the tree that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The root of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Position of the node in the tree's arena (creation order).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The persisted payload of a node, detached from any tree.
///
/// A `Node` is what producers hand to [`Tree::add_child`](crate::Tree::add_child)
/// and to the streaming writers. `kind` is fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    kind: NodeKind,
    /// Display name, e.g. a target or property name.
    pub name: Option<String>,
    /// Payload text, e.g. a property value or message body.
    pub value: Option<String>,
}

impl Node {
    /// Create a node of the given kind with no name or value.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            value: None,
        }
    }

    /// Convenience constructor for a named node.
    pub fn named(kind: NodeKind, name: impl Into<String>) -> Self {
        Self::new(kind).with_name(name)
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the value payload.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}
