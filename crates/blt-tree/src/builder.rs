//! Push/pop construction of a tree from a stream of start/end events.
//!
//! Every reader in the workspace (binary, XML, outline) feeds a
//! [`TreeBuilder`]; when the input ends early the builder still holds the
//! nodes seen so far, which is how partial results are recovered.

use tracing::trace;

use crate::error::{TreeError, TreeResult};
use crate::node::{Node, NodeId};
use crate::tree::Tree;

/// Incremental tree construction from nested start/end events.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Option<Tree>,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a node as the last child of the innermost open node. The first
    /// node started becomes the root.
    pub fn start(&mut self, node: Node) -> TreeResult<NodeId> {
        let parent = self.open.last().copied();
        let id = match (&mut self.tree, parent) {
            (None, _) => {
                self.tree = Some(Tree::new(node));
                NodeId::ROOT
            }
            (Some(tree), Some(parent)) => tree.add_child(parent, node),
            (Some(_), None) => return Err(TreeError::RootClosed),
        };
        self.open.push(id);
        trace!(node = %id, depth = self.open.len(), "builder start");
        Ok(id)
    }

    /// Close the innermost open node.
    pub fn end(&mut self) -> TreeResult<NodeId> {
        self.open.pop().ok_or(TreeError::NoOpenNode)
    }

    /// Add a node with no children.
    pub fn leaf(&mut self, node: Node) -> TreeResult<NodeId> {
        let id = self.start(node)?;
        self.end()?;
        Ok(id)
    }

    /// Number of currently open nodes.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// The innermost open node.
    pub fn current(&self) -> Option<NodeId> {
        self.open.last().copied()
    }

    /// Returns `true` once a root was started and every node is closed.
    pub fn is_complete(&self) -> bool {
        self.tree.is_some() && self.open.is_empty()
    }

    /// The tree built so far.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Finish construction. Fails if no root was started or nodes are
    /// still open.
    pub fn finish(self) -> TreeResult<Tree> {
        let tree = self.tree.ok_or(TreeError::Empty)?;
        if !self.open.is_empty() {
            return Err(TreeError::Unclosed {
                open: self.open.len(),
            });
        }
        Ok(tree)
    }

    /// Whatever was built so far, open nodes included.
    pub fn into_partial(self) -> Option<Tree> {
        self.tree
    }
}
