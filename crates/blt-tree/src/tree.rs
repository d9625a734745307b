//! The arena-backed tree and read-only node handles.
//!
//! [`Tree`] owns every node in a `Vec`. Each slot owns the ordered list of
//! its children's ids; the `parent` field is a plain index used only for
//! upward navigation, so ownership flows strictly root → leaves.
//!
//! # Invariants
//!
//! - Slot 0 is the root and is the only slot without a parent.
//! - A child's id is always greater than its parent's id.
//! - Child order is insertion order and defines document order.

use std::collections::BTreeMap;
use std::iter::FusedIterator;
use std::slice;

use crate::kind::NodeKind;
use crate::node::{Node, NodeId};
use crate::query::Query;

#[derive(Clone, Debug)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A rooted, ordered tree of build-log nodes.
#[derive(Clone, Debug)]
pub struct Tree {
    slots: Vec<Slot>,
}

impl Tree {
    /// Create a tree consisting of a single root node.
    pub fn new(root: Node) -> Self {
        Self {
            slots: vec![Slot {
                node: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Id of the root node.
    pub fn root_id(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Handle to the root node.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: NodeId::ROOT,
        }
    }

    /// Handle to a node, or `None` if the id does not belong to this tree.
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.slots.len()).then_some(NodeRef { tree: self, id })
    }

    /// Total number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// A tree always has a root, so this is always `false`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append `child` as the last child of `parent` and return its id.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not issued by this tree.
    pub fn add_child(&mut self, parent: NodeId, child: Node) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots[parent.index()].children.push(id);
        self.slots.push(Slot {
            node: child,
            parent: Some(parent),
            children: Vec::new(),
        });
        id
    }

    /// Return the first child of `parent` with the given kind and name,
    /// creating and appending it when there is none.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not issued by this tree.
    pub fn get_or_create_child(&mut self, parent: NodeId, kind: NodeKind, name: &str) -> NodeId {
        let existing = self.slots[parent.index()]
            .children
            .iter()
            .copied()
            .find(|&c| {
                let node = &self.slots[c.index()].node;
                node.kind() == kind && node.name.as_deref() == Some(name)
            });
        match existing {
            Some(id) => id,
            None => self.add_child(parent, Node::named(kind, name)),
        }
    }

    /// Set or replace a node's name.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.slots[id.index()].node.name = Some(name.into());
    }

    /// Set or replace a node's value.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this tree.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        self.slots[id.index()].node.value = Some(value.into());
    }

    /// Count nodes per kind. Computed on demand; nothing is cached.
    pub fn kind_counts(&self) -> BTreeMap<NodeKind, usize> {
        let mut counts = BTreeMap::new();
        for slot in &self.slots {
            *counts.entry(slot.node.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Every node in document order.
    pub fn iter(&self) -> Descendants<'_> {
        self.root().descendants()
    }

    /// Find the first node in document order matching `query`.
    pub fn find_first(&self, query: &Query<'_>) -> Option<NodeRef<'_>> {
        self.root().find_first_in_subtree(query)
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.index()]
    }
}

/// Structural equality: same kind, name, value and child order at every
/// depth. Arena layout is irrelevant.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().zip(other.iter()).all(|(a, b)| {
            a.node() == b.node() && a.child_count() == b.child_count()
        })
    }
}

impl Eq for Tree {}

/// A cheap, copyable read-only handle to one node of a [`Tree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    /// The arena id of this node.
    pub fn id(self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to.
    pub fn tree(self) -> &'a Tree {
        self.tree
    }

    /// The detached payload (kind, name, value).
    pub fn node(self) -> &'a Node {
        &self.tree.slot(self.id).node
    }

    /// The node's kind; fixed at construction.
    pub fn kind(self) -> NodeKind {
        self.node().kind()
    }

    /// The name, if one was set.
    pub fn name(self) -> Option<&'a str> {
        self.node().name.as_deref()
    }

    /// The value, if one was set.
    pub fn value(self) -> Option<&'a str> {
        self.node().value.as_deref()
    }

    /// The parent, or `None` for the root.
    pub fn parent(self) -> Option<NodeRef<'a>> {
        self.tree.slot(self.id).parent.map(|id| self.at(id))
    }

    /// Returns `true` for the tree's root.
    pub fn is_root(self) -> bool {
        self.tree.slot(self.id).parent.is_none()
    }

    /// Direct children in insertion order.
    pub fn children(self) -> Children<'a> {
        Children {
            tree: self.tree,
            ids: self.tree.slot(self.id).children.iter(),
        }
    }

    /// Number of direct children.
    pub fn child_count(self) -> usize {
        self.tree.slot(self.id).children.len()
    }

    /// Returns `true` if the node has at least one child.
    pub fn has_children(self) -> bool {
        self.child_count() > 0
    }

    /// The child at `index`, if any.
    pub fn child(self, index: usize) -> Option<NodeRef<'a>> {
        self.tree
            .slot(self.id)
            .children
            .get(index)
            .map(|&id| self.at(id))
    }

    /// Position of `child` among this node's children.
    pub fn index_of(self, child: NodeId) -> Option<usize> {
        self.tree
            .slot(self.id)
            .children
            .iter()
            .position(|&c| c == child)
    }

    /// Ancestors ordered from the root down to the immediate parent.
    pub fn parent_chain(self) -> Vec<NodeRef<'a>> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            chain.push(node);
            current = node.parent();
        }
        chain.reverse();
        chain
    }

    /// Number of ancestors.
    pub fn depth(self) -> usize {
        let mut depth = 0;
        let mut current = self.tree.slot(self.id).parent;
        while let Some(id) = current {
            depth += 1;
            current = self.tree.slot(id).parent;
        }
        depth
    }

    /// Pre-order iterator over this subtree, starting with this node.
    pub fn descendants(self) -> Descendants<'a> {
        Descendants {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Number of nodes in this subtree, including this node.
    pub fn total_items_in_subtree(self) -> usize {
        self.descendants().count()
    }

    pub(crate) fn at(self, id: NodeId) -> NodeRef<'a> {
        NodeRef {
            tree: self.tree,
            id,
        }
    }

    pub(crate) fn child_ids(self) -> &'a [NodeId] {
        &self.tree.slot(self.id).children
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("value", &self.value())
            .finish()
    }
}

/// Iterator over the direct children of a node.
#[derive(Clone)]
pub struct Children<'a> {
    tree: &'a Tree,
    ids: slice::Iter<'a, NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        self.ids.next().map(|&id| NodeRef { tree, id })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        self.ids.next_back().map(|&id| NodeRef { tree, id })
    }
}

impl ExactSizeIterator for Children<'_> {}
impl FusedIterator for Children<'_> {}

/// Pre-order (document order) iterator over a subtree.
#[derive(Clone)]
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.slot(id).children.iter().rev().copied());
        Some(NodeRef {
            tree: self.tree,
            id,
        })
    }
}

impl FusedIterator for Descendants<'_> {}
