use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use blt_tree::{Node, NodeRef, Tree};
use tracing::{debug, trace};

use crate::config::{Framing, SyncMode, WriterConfig};
use crate::error::{BinaryError, BinaryResult};
use crate::format::{encode_record, encode_varint, Header, END_MARKER};

/// Append-only binary log writer.
///
/// Nodes are emitted as they happen: `start_node` opens a node as a child
/// of the innermost open node, `end_node` closes it. Nothing needs to be
/// known about the rest of the tree in advance, so a producer can drive the
/// writer from its own thread while a build runs. Always uses end-marker
/// framing.
#[derive(Debug)]
pub struct BinaryLogWriter<W: Write> {
    sink: W,
    config: WriterConfig,
    depth: usize,
    root_closed: bool,
    nodes_written: u64,
    scratch: Vec<u8>,
}

impl<W: Write> BinaryLogWriter<W> {
    /// Write the header and return a writer ready for the root node.
    pub fn new(mut sink: W, config: WriterConfig) -> BinaryResult<Self> {
        if config.framing != Framing::EndMarker {
            return Err(BinaryError::Config(
                "streaming writes need end-marker framing; use write_tree for child-count framing"
                    .into(),
            ));
        }
        let header = Header {
            major: Framing::EndMarker.major(),
            minor: config.minor_version,
        };
        sink.write_all(&header.to_bytes())?;
        if config.sync_mode == SyncMode::EveryRecord {
            sink.flush()?;
        }
        debug!(major = header.major, minor = header.minor, "binary log header written");

        Ok(Self {
            sink,
            config,
            depth: 0,
            root_closed: false,
            nodes_written: 0,
            scratch: Vec::new(),
        })
    }

    /// Open a node. The first node opened is the root.
    pub fn start_node(&mut self, node: &Node) -> BinaryResult<()> {
        if self.root_closed {
            return Err(BinaryError::RootClosed);
        }
        self.scratch.clear();
        encode_record(&mut self.scratch, node);
        self.sink.write_all(&self.scratch)?;
        self.depth += 1;
        self.nodes_written += 1;
        trace!(kind = %node.kind(), depth = self.depth, "record written");
        self.maybe_flush()
    }

    /// Close the innermost open node.
    pub fn end_node(&mut self) -> BinaryResult<()> {
        if self.depth == 0 {
            return Err(BinaryError::NoOpenNode);
        }
        self.sink.write_all(&[END_MARKER])?;
        self.depth -= 1;
        if self.depth == 0 {
            self.root_closed = true;
        }
        self.maybe_flush()
    }

    /// Write a node with no children.
    pub fn leaf(&mut self, node: &Node) -> BinaryResult<()> {
        self.start_node(node)?;
        self.end_node()
    }

    /// Number of currently open nodes.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of records written so far.
    pub fn nodes_written(&self) -> u64 {
        self.nodes_written
    }

    pub fn flush(&mut self) -> BinaryResult<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Close every open node, flush, and hand back the sink.
    pub fn finish(mut self) -> BinaryResult<W> {
        while self.depth > 0 {
            self.end_node()?;
        }
        self.sink.flush()?;
        debug!(nodes = self.nodes_written, "binary log finished");
        Ok(self.sink)
    }

    fn maybe_flush(&mut self) -> BinaryResult<()> {
        if self.config.sync_mode == SyncMode::EveryRecord {
            self.sink.flush()?;
        }
        Ok(())
    }
}

impl BinaryLogWriter<BufWriter<File>> {
    /// Create (or truncate) a file and write the header.
    pub fn create(path: &Path, config: WriterConfig) -> BinaryResult<Self> {
        let file = create_file(path)?;
        Self::new(BufWriter::new(file), config)
    }
}

/// Write a complete tree in the configured framing and return the sink.
pub fn write_tree<W: Write>(tree: &Tree, sink: W, config: &WriterConfig) -> BinaryResult<W> {
    match config.framing {
        Framing::EndMarker => write_streamed(tree, sink, config),
        Framing::ChildCount => write_counted(tree, sink, config),
    }
}

/// Encode a complete tree to bytes.
pub fn to_bytes(tree: &Tree, config: &WriterConfig) -> BinaryResult<Vec<u8>> {
    write_tree(tree, Vec::new(), config)
}

/// Write a complete tree to a file, creating missing parent directories.
pub fn write_file(tree: &Tree, path: &Path, config: &WriterConfig) -> BinaryResult<()> {
    let file = create_file(path)?;
    let mut sink = write_tree(tree, BufWriter::new(file), config)?;
    sink.flush()?;
    Ok(())
}

fn create_file(path: &Path) -> BinaryResult<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

fn write_streamed<W: Write>(tree: &Tree, sink: W, config: &WriterConfig) -> BinaryResult<W> {
    let mut writer = BinaryLogWriter::new(sink, config.clone())?;
    // (node, children already emitted)
    let mut stack: Vec<(NodeRef<'_>, bool)> = vec![(tree.root(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            writer.end_node()?;
            continue;
        }
        writer.start_node(node.node())?;
        stack.push((node, true));
        stack.extend(node.children().rev().map(|c| (c, false)));
    }
    writer.finish()
}

fn write_counted<W: Write>(tree: &Tree, mut sink: W, config: &WriterConfig) -> BinaryResult<W> {
    let header = Header {
        major: Framing::ChildCount.major(),
        minor: config.minor_version,
    };
    sink.write_all(&header.to_bytes())?;

    let mut buf = Vec::new();
    for node in tree.iter() {
        buf.clear();
        encode_record(&mut buf, node.node());
        encode_varint(&mut buf, node.child_count() as u64);
        sink.write_all(&buf)?;
    }
    sink.flush()?;
    debug!(nodes = tree.len(), "binary log written with child-count framing");
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FLAG_NAME, HEADER_LEN};
    use blt_tree::NodeKind;

    #[test]
    fn streaming_layout() {
        let mut w = BinaryLogWriter::new(Vec::new(), WriterConfig::default()).unwrap();
        w.start_node(&Node::new(NodeKind::Build)).unwrap();
        w.leaf(&Node::named(NodeKind::Target, "A")).unwrap();
        let bytes = w.finish().unwrap();

        assert_eq!(&bytes[..4], b"BLTB");
        assert_eq!(&bytes[4..6], &2u16.to_be_bytes());
        assert_eq!(
            &bytes[HEADER_LEN..],
            &[1, 0, 3, FLAG_NAME, 1, b'A', END_MARKER, END_MARKER]
        );
    }

    #[test]
    fn counted_layout() {
        let mut tree = Tree::new(Node::new(NodeKind::Build));
        tree.add_child(tree.root_id(), Node::new(NodeKind::Message));
        let config = WriterConfig {
            framing: Framing::ChildCount,
            ..WriterConfig::default()
        };
        let bytes = to_bytes(&tree, &config).unwrap();
        assert_eq!(&bytes[4..6], &1u16.to_be_bytes());
        assert_eq!(&bytes[HEADER_LEN..], &[1, 0, 1, 5, 0, 0]);
    }

    #[test]
    fn second_root_rejected() {
        let mut w = BinaryLogWriter::new(Vec::new(), WriterConfig::default()).unwrap();
        w.leaf(&Node::new(NodeKind::Build)).unwrap();
        let err = w.start_node(&Node::new(NodeKind::Build)).unwrap_err();
        assert!(matches!(err, BinaryError::RootClosed));
    }

    #[test]
    fn end_without_open_node() {
        let mut w = BinaryLogWriter::new(Vec::new(), WriterConfig::default()).unwrap();
        assert!(matches!(w.end_node().unwrap_err(), BinaryError::NoOpenNode));
    }

    #[test]
    fn streaming_rejects_child_count_framing() {
        let config = WriterConfig {
            framing: Framing::ChildCount,
            ..WriterConfig::default()
        };
        let err = BinaryLogWriter::new(Vec::new(), config).unwrap_err();
        assert!(matches!(err, BinaryError::Config(_)));
    }

    #[test]
    fn finish_closes_open_nodes() {
        let mut w = BinaryLogWriter::new(Vec::new(), WriterConfig::default()).unwrap();
        w.start_node(&Node::new(NodeKind::Build)).unwrap();
        w.start_node(&Node::new(NodeKind::Project)).unwrap();
        w.start_node(&Node::new(NodeKind::Target)).unwrap();
        assert_eq!(w.depth(), 3);
        assert_eq!(w.nodes_written(), 3);
        let bytes = w.finish().unwrap();
        assert!(bytes.ends_with(&[END_MARKER, END_MARKER, END_MARKER]));
    }

    #[test]
    fn create_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/out.bltb");
        let mut w = BinaryLogWriter::create(&path, WriterConfig::default()).unwrap();
        w.leaf(&Node::new(NodeKind::Build)).unwrap();
        w.finish().unwrap();
        assert!(path.exists());
    }
}
