//! `proptest` strategies for generating arbitrary trees.

use proptest::prelude::*;

use crate::kind::{NodeKind, KNOWN_KINDS};
use crate::node::{Node, NodeId};
use crate::tree::Tree;

/// Any kind, including placeholder tags a newer producer might emit.
pub fn arb_kind() -> impl Strategy<Value = NodeKind> {
    prop_oneof![
        4 => proptest::sample::select(KNOWN_KINDS.to_vec()),
        1 => (13u8..=255).prop_map(NodeKind::Unknown),
    ]
}

/// Short strings heavy on characters that need escaping in text formats.
pub fn arb_text() -> impl Strategy<Value = String> {
    r#"[a-zA-Z0-9 _.<>&"'=\\/\t\r\n\-é漢]{0,12}"#
}

pub fn arb_node() -> impl Strategy<Value = Node> {
    (
        arb_kind(),
        proptest::option::of(arb_text()),
        proptest::option::of(arb_text()),
    )
        .prop_map(|(kind, name, value)| {
            let mut node = Node::new(kind);
            node.name = name;
            node.value = value;
            node
        })
}

#[derive(Clone, Debug)]
struct Shape {
    node: Node,
    children: Vec<Shape>,
}

/// Trees up to depth 5 with at most 6 children per node.
pub fn arb_tree() -> impl Strategy<Value = Tree> {
    let leaf = arb_node().prop_map(|node| Shape {
        node,
        children: Vec::new(),
    });
    leaf.prop_recursive(4, 64, 6, |inner| {
        (arb_node(), proptest::collection::vec(inner, 0..6))
            .prop_map(|(node, children)| Shape { node, children })
    })
    .prop_map(|shape| {
        let mut tree = Tree::new(shape.node);
        attach(&mut tree, NodeId::ROOT, shape.children);
        tree
    })
}

fn attach(tree: &mut Tree, parent: NodeId, children: Vec<Shape>) {
    for child in children {
        let id = tree.add_child(parent, child.node);
        attach(tree, id, child.children);
    }
}
