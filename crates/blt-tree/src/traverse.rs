//! Typed search over a tree: local (children, siblings), subtree, and global
//! document-order neighbours.
//!
//! All searches are iterative and O(n) in the size of the tree in the worst
//! case. Nothing is cached between calls. Every search returns `None` rather
//! than failing when nothing matches.

use crate::node::NodeId;
use crate::query::Query;
use crate::tree::NodeRef;

impl<'a> NodeRef<'a> {
    /// First direct child matching `query`.
    pub fn find_child(self, query: &Query<'_>) -> Option<NodeRef<'a>> {
        self.children().find(|c| query.matches(*c))
    }

    /// First match in pre-order, starting with this node itself.
    pub fn find_first_in_subtree(self, query: &Query<'_>) -> Option<NodeRef<'a>> {
        self.descendants().find(|n| query.matches(*n))
    }

    /// Last match in document order within this subtree (this node
    /// included, and visited last).
    pub fn find_last_in_subtree(self, query: &Query<'_>) -> Option<NodeRef<'a>> {
        // (id, children already pushed)
        let mut stack = vec![(self.id(), false)];
        while let Some((id, expanded)) = stack.pop() {
            let node = self.at(id);
            if expanded {
                if query.matches(node) {
                    return Some(node);
                }
                continue;
            }
            stack.push((id, true));
            stack.extend(node.child_ids().iter().map(|&c| (c, false)));
        }
        None
    }

    /// Nearest child before `child` matching `query`.
    ///
    /// Returns `None` if `child` is not one of this node's children.
    pub fn find_previous(self, child: NodeId, query: &Query<'_>) -> Option<NodeRef<'a>> {
        let index = self.index_of(child)?;
        self.child_ids()[..index]
            .iter()
            .rev()
            .map(|&id| self.at(id))
            .find(|n| query.matches(*n))
    }

    /// Nearest child after `child` matching `query`.
    ///
    /// Returns `None` if `child` is not one of this node's children.
    pub fn find_next(self, child: NodeId, query: &Query<'_>) -> Option<NodeRef<'a>> {
        let index = self.index_of(child)?;
        self.child_ids()[index + 1..]
            .iter()
            .map(|&id| self.at(id))
            .find(|n| query.matches(*n))
    }

    /// Nearest preceding sibling matching `query`.
    pub fn find_previous_sibling(self, query: &Query<'_>) -> Option<NodeRef<'a>> {
        self.parent()?.find_previous(self.id(), query)
    }

    /// Nearest following sibling matching `query`.
    pub fn find_next_sibling(self, query: &Query<'_>) -> Option<NodeRef<'a>> {
        self.parent()?.find_next(self.id(), query)
    }

    /// The closest match after this node in document order.
    ///
    /// Descendants come first, then each following sibling's subtree, then
    /// the same walk from the parent upwards until the root is reached.
    pub fn find_next_in_traversal_order(self, query: &Query<'_>) -> Option<NodeRef<'a>> {
        if let Some(found) = self.descendants().skip(1).find(|n| query.matches(*n)) {
            return Some(found);
        }

        let mut current = self;
        loop {
            let parent = current.parent()?;
            let index = parent.index_of(current.id())?;
            for &sibling in &parent.child_ids()[index + 1..] {
                if let Some(found) = self.at(sibling).find_first_in_subtree(query) {
                    return Some(found);
                }
            }
            current = parent;
        }
    }

    /// The closest match before this node in document order.
    ///
    /// Each preceding sibling's subtree is searched from its end, then the
    /// parent itself is considered, then the walk repeats from the parent.
    pub fn find_previous_in_traversal_order(self, query: &Query<'_>) -> Option<NodeRef<'a>> {
        let mut current = self;
        loop {
            let parent = current.parent()?;
            let index = parent.index_of(current.id())?;
            for &sibling in parent.child_ids()[..index].iter().rev() {
                if let Some(found) = self.at(sibling).find_last_in_subtree(query) {
                    return Some(found);
                }
            }
            if query.matches(parent) {
                return Some(parent);
            }
            current = parent;
        }
    }

    /// Apply `action` to every node in this subtree matching `query`, in
    /// pre-order, this node included.
    pub fn visit_all<F>(self, query: &Query<'_>, mut action: F)
    where
        F: FnMut(NodeRef<'a>),
    {
        for node in self.descendants() {
            if query.matches(node) {
                action(node);
            }
        }
    }
}
