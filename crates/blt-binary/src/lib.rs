//! Streaming binary codec for build-log trees.
//!
//! The binary log is the capture format: a build producer appends one record
//! per node as events occur, and readers rebuild an identical [`Tree`].
//!
//! # Architecture
//!
//! - **Header** (`BLTB` + major + minor): the major version selects the
//!   framing rules, newer minors are accepted as-is
//! - **BinaryLogWriter**: append-only, end-marker framed, usable from a
//!   producer thread while the build runs
//! - **write_tree**: whole-tree writer for either framing
//! - **BinaryReader**: header validation plus version-dispatched decoding;
//!   unknown kind tags become placeholders, a cut-off stream yields a
//!   flagged partial tree
//!
//! [`Tree`]: blt_tree::Tree

pub mod config;
pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use config::{Framing, SyncMode, WriterConfig};
pub use error::{BinaryError, BinaryResult};
pub use format::{Header, FORMAT_MINOR, MAGIC};
pub use reader::{read_bytes, read_file, read_tree, BinaryReader};
pub use writer::{to_bytes, write_file, write_tree, BinaryLogWriter};

#[cfg(test)]
mod tests {
    use super::*;
    use blt_tree::testing::arb_tree;
    use blt_tree::{Node, NodeId, NodeKind, Tree};
    use proptest::prelude::*;

    fn sample_tree() -> Tree {
        let mut tree = Tree::new(Node::new(NodeKind::Build).with_value("Succeeded"));
        let project = tree.add_child(NodeId::ROOT, Node::named(NodeKind::Project, "build.proj"));
        let props = tree.add_child(project, Node::named(NodeKind::Folder, "Properties"));
        tree.add_child(props, Node::named(NodeKind::Property, "TestProperty").with_value("Test"));
        let target = tree.add_child(project, Node::named(NodeKind::Target, "Target1"));
        tree.add_child(target, Node::new(NodeKind::Message).with_value("MessageOutputText"));
        tree.add_child(target, Node::new(NodeKind::Warning).with_value("multi\nline"));
        tree
    }

    #[test]
    fn roundtrip_end_marker() {
        let tree = sample_tree();
        let bytes = to_bytes(&tree, &WriterConfig::default()).unwrap();
        assert_eq!(read_bytes(&bytes).unwrap(), tree);
    }

    #[test]
    fn roundtrip_child_count() {
        let tree = sample_tree();
        let config = WriterConfig {
            framing: Framing::ChildCount,
            ..WriterConfig::default()
        };
        let bytes = to_bytes(&tree, &config).unwrap();
        assert_eq!(read_bytes(&bytes).unwrap(), tree);
    }

    #[test]
    fn disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nightly/build.bltb");
        let tree = sample_tree();
        write_file(&tree, &path, &WriterConfig::default()).unwrap();
        assert_eq!(read_file(&path).unwrap(), tree);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&dir.path().join("absent.bltb")).unwrap_err();
        assert!(matches!(err, BinaryError::Io(_)));
    }

    #[test]
    fn producer_thread_streams_events() {
        let handle = std::thread::spawn(|| {
            let mut w = BinaryLogWriter::new(Vec::new(), WriterConfig::default()).unwrap();
            w.start_node(&Node::new(NodeKind::Build)).unwrap();
            for i in 0..3 {
                w.start_node(&Node::named(NodeKind::Target, format!("T{i}"))).unwrap();
                w.leaf(&Node::new(NodeKind::Message).with_value(format!("m{i}"))).unwrap();
                w.end_node().unwrap();
            }
            w.finish().unwrap()
        });
        let bytes = handle.join().unwrap();
        let tree = read_bytes(&bytes).unwrap();
        let targets: Vec<_> = tree.root().children().map(|t| t.name().unwrap()).collect();
        assert_eq!(targets, vec!["T0", "T1", "T2"]);
    }

    #[test]
    fn in_progress_file_reads_as_truncated_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.bltb");

        let mut w = BinaryLogWriter::create(&path, WriterConfig::live()).unwrap();
        w.start_node(&Node::new(NodeKind::Build)).unwrap();
        w.start_node(&Node::named(NodeKind::Project, "app")).unwrap();
        w.leaf(&Node::named(NodeKind::Target, "Restore")).unwrap();

        // The writer is still open; a concurrent reader sees a prefix.
        let err = read_file(&path).unwrap_err();
        assert!(err.is_truncated());
        let partial = err.into_partial().unwrap();
        assert_eq!(partial.len(), 3);

        w.leaf(&Node::named(NodeKind::Target, "Build")).unwrap();
        w.finish().unwrap();
        let tree = read_file(&path).unwrap();
        assert_eq!(tree.len(), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig { max_global_rejects: 16384, ..ProptestConfig::default() })]

        #[test]
        fn any_tree_roundtrips(tree in arb_tree()) {
            for framing in [Framing::EndMarker, Framing::ChildCount] {
                let config = WriterConfig { framing, ..WriterConfig::default() };
                let bytes = to_bytes(&tree, &config).unwrap();
                prop_assert_eq!(read_bytes(&bytes).unwrap(), tree.clone());
            }
        }

        #[test]
        fn any_prefix_is_truncated_or_format_error(tree in arb_tree(), cut in 0usize..512) {
            let bytes = to_bytes(&tree, &WriterConfig::default()).unwrap();
            prop_assume!(cut < bytes.len());
            let err = read_bytes(&bytes[..cut]).unwrap_err();
            if cut >= format::HEADER_LEN {
                prop_assert!(err.is_truncated());
            } else {
                prop_assert!(err.is_format_error());
            }
        }
    }
}
