//! Structural equivalence: the oracle for every round-trip check.
//!
//! Two trees are equivalent when, walking both in document order, every
//! pair of nodes agrees on kind, name, value and child count. Formatting of
//! the source documents never matters because only parsed trees are
//! compared.

use std::fmt;
use std::fs;
use std::path::Path;

use blt_text::{read_detected, TextError, TextFormat};
use blt_tree::{NodeKind, NodeRef, Tree};
use tracing::debug;

use crate::error::DiffResult;

/// The first point at which two trees disagree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// Child indices from the root to the differing node; empty for the
    /// root itself.
    pub path: Vec<usize>,
    /// What differs at that node.
    pub reason: MismatchReason,
}

/// What differs at a [`Mismatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MismatchReason {
    Kind { left: NodeKind, right: NodeKind },
    Name { left: Option<String>, right: Option<String> },
    Value { left: Option<String>, right: Option<String> },
    ChildCount { left: usize, right: usize },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for index in &self.path {
            write!(f, "/{index}")?;
        }
        write!(f, ": {}", self.reason)
    }
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind { left, right } => write!(f, "kind {left} != {right}"),
            Self::Name { left, right } => write!(f, "name {left:?} != {right:?}"),
            Self::Value { left, right } => write!(f, "value {left:?} != {right:?}"),
            Self::ChildCount { left, right } => write!(f, "child count {left} != {right}"),
        }
    }
}

/// Find the first structural difference in document order.
pub fn first_mismatch(left: &Tree, right: &Tree) -> Option<Mismatch> {
    let mut stack: Vec<(NodeRef<'_>, NodeRef<'_>, Vec<usize>)> =
        vec![(left.root(), right.root(), Vec::new())];

    while let Some((a, b, path)) = stack.pop() {
        if let Some(reason) = compare_nodes(a, b) {
            return Some(Mismatch { path, reason });
        }
        // Child counts agree here; push in reverse so index 0 is next.
        for (index, (ca, cb)) in a.children().zip(b.children()).enumerate().rev() {
            let mut child_path = path.clone();
            child_path.push(index);
            stack.push((ca, cb, child_path));
        }
    }
    None
}

fn compare_nodes(a: NodeRef<'_>, b: NodeRef<'_>) -> Option<MismatchReason> {
    if a.kind() != b.kind() {
        return Some(MismatchReason::Kind {
            left: a.kind(),
            right: b.kind(),
        });
    }
    if a.name() != b.name() {
        return Some(MismatchReason::Name {
            left: a.name().map(str::to_string),
            right: b.name().map(str::to_string),
        });
    }
    if a.value() != b.value() {
        return Some(MismatchReason::Value {
            left: a.value().map(str::to_string),
            right: b.value().map(str::to_string),
        });
    }
    if a.child_count() != b.child_count() {
        return Some(MismatchReason::ChildCount {
            left: a.child_count(),
            right: b.child_count(),
        });
    }
    None
}

/// Returns `true` if the two trees are not structurally equivalent.
pub fn are_different_trees(left: &Tree, right: &Tree) -> bool {
    first_mismatch(left, right).is_some()
}

/// Parse two text documents (format sniffed per document) and compare.
///
/// Malformed input is an error, never a `true`.
pub fn are_different(document_a: &str, document_b: &str) -> DiffResult<bool> {
    let a = read_detected(document_a)?;
    let b = read_detected(document_b)?;
    Ok(are_different_trees(&a, &b))
}

/// Read two text files and compare them. Formats are chosen by extension,
/// falling back to sniffing the content.
pub fn are_different_files(path_a: &Path, path_b: &Path) -> DiffResult<bool> {
    let a = load(path_a)?;
    let b = load(path_b)?;
    let mismatch = first_mismatch(&a, &b);
    debug!(
        a = %path_a.display(),
        b = %path_b.display(),
        different = mismatch.is_some(),
        "compared documents"
    );
    Ok(mismatch.is_some())
}

fn load(path: &Path) -> DiffResult<Tree> {
    let source = fs::read_to_string(path)?;
    let format = TextFormat::from_path(path)
        .or_else(|| TextFormat::detect(&source))
        .ok_or_else(|| TextError::UnknownFormat(path.display().to_string()))?;
    Ok(format.codec().read(&source)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blt_tree::testing::arb_tree;
    use blt_tree::{Node, NodeId};
    use proptest::prelude::*;

    fn tree_with(value: &str) -> Tree {
        let mut tree = Tree::new(Node::new(NodeKind::Build));
        let p = tree.add_child(NodeId::ROOT, Node::named(NodeKind::Project, "p"));
        tree.add_child(p, Node::named(NodeKind::Target, "a"));
        tree.add_child(p, Node::new(NodeKind::Message).with_value(value));
        tree
    }

    #[test]
    fn identical_trees_are_equivalent() {
        assert!(first_mismatch(&tree_with("x"), &tree_with("x")).is_none());
        assert!(!are_different_trees(&tree_with("x"), &tree_with("x")));
    }

    #[test]
    fn value_difference_reports_path() {
        let m = first_mismatch(&tree_with("x"), &tree_with("y")).unwrap();
        assert_eq!(m.path, vec![0, 1]);
        assert_eq!(
            m.reason,
            MismatchReason::Value {
                left: Some("x".into()),
                right: Some("y".into())
            }
        );
        assert_eq!(m.to_string(), "root/0/1: value Some(\"x\") != Some(\"y\")");
    }

    #[test]
    fn first_mismatch_is_in_document_order() {
        let mut a = tree_with("x");
        let mut b = tree_with("y");
        // Also differ at an earlier node.
        a.set_name(NodeId::ROOT, "left");
        b.set_name(NodeId::ROOT, "right");
        let m = first_mismatch(&a, &b).unwrap();
        assert!(m.path.is_empty());
        assert!(matches!(m.reason, MismatchReason::Name { .. }));
    }

    #[test]
    fn kind_and_child_count_differences() {
        let a = Tree::new(Node::new(NodeKind::Build));
        let b = Tree::new(Node::new(NodeKind::Project));
        assert!(matches!(
            first_mismatch(&a, &b).unwrap().reason,
            MismatchReason::Kind { .. }
        ));

        let mut c = Tree::new(Node::new(NodeKind::Build));
        c.add_child(NodeId::ROOT, Node::new(NodeKind::Target));
        assert_eq!(
            first_mismatch(&a, &c).unwrap().reason,
            MismatchReason::ChildCount { left: 0, right: 1 }
        );
    }

    #[test]
    fn absent_and_empty_name_differ() {
        let a = Tree::new(Node::new(NodeKind::Build));
        let b = Tree::new(Node::named(NodeKind::Build, ""));
        assert!(are_different_trees(&a, &b));
    }

    #[test]
    fn formatting_is_ignored() {
        let compact = "<Build><Target Name=\"a\"/></Build>";
        let spaced = "<?xml version=\"1.0\"?>\n<Build>\n\n   <Target   Name='a' />\n</Build>\n";
        assert!(!are_different(compact, spaced).unwrap());
    }

    #[test]
    fn compares_across_formats() {
        let xml = "<Build><Target Name=\"a\"/></Build>";
        let outline = "Build\n    Target Name=\"a\"\n";
        let json = r#"{"nodes":[{"depth":0,"kind":"Build"},{"depth":1,"kind":"Target","name":"b"}]}"#;
        assert!(!are_different(xml, outline).unwrap());
        assert!(are_different(xml, json).unwrap());
    }

    #[test]
    fn malformed_input_is_an_error() {
        let err = are_different("<Build>", "<Build/>").unwrap_err();
        assert!(matches!(err, crate::DiffError::Text(ref e) if e.is_malformed()));
    }

    #[test]
    fn files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.xml");
        let b = dir.path().join("b.outline");
        let c = dir.path().join("c.log");
        fs::write(&a, "<Build Value=\"v\"/>").unwrap();
        fs::write(&b, "Build Value=\"v\"\n").unwrap();
        fs::write(&c, "Build Value=\"w\"\n").unwrap();
        assert!(!are_different_files(&a, &b).unwrap());
        assert!(are_different_files(&a, &c).unwrap());

        let missing = dir.path().join("missing.xml");
        assert!(matches!(
            are_different_files(&a, &missing).unwrap_err(),
            crate::DiffError::Io(_)
        ));
    }

    proptest! {
        #[test]
        fn tree_is_equivalent_to_itself(tree in arb_tree()) {
            prop_assert!(first_mismatch(&tree, &tree.clone()).is_none());
        }
    }
}
