use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use blt_tree::{Node, NodeKind, Tree, TreeBuilder};
use tracing::{debug, warn};

use crate::config::Framing;
use crate::error::{BinaryError, BinaryResult};
use crate::format::{Header, FLAG_EXTENSION, FLAG_NAME, FLAG_VALUE, HEADER_LEN, KNOWN_FLAGS};

/// Reads a binary log from any byte source.
///
/// The header is validated on construction; its major version selects the
/// decoding rules used by [`BinaryReader::read_tree`].
#[derive(Debug)]
pub struct BinaryReader<R: Read> {
    source: Source<R>,
    header: Header,
    framing: Framing,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(source: R) -> BinaryResult<Self> {
        let mut source = Source { inner: source, offset: 0 };
        let mut raw = [0u8; HEADER_LEN];
        let filled = source.fill(&mut raw)?;
        if filled < HEADER_LEN {
            if filled < 4 || &raw[..4] != crate::format::MAGIC {
                return Err(BinaryError::InvalidMagic {
                    expected: String::from_utf8_lossy(crate::format::MAGIC).into(),
                    actual: String::from_utf8_lossy(&raw[..filled.min(4)]).into(),
                });
            }
            return Err(BinaryError::InvalidHeader(format!(
                "header needs {HEADER_LEN} bytes, got {filled}"
            )));
        }
        let header = Header::from_bytes(&raw)?;
        let framing = Framing::from_major(header.major).ok_or(BinaryError::UnsupportedVersion {
            major: header.major,
            minor: header.minor,
        })?;
        debug!(major = header.major, minor = header.minor, "binary log header read");
        Ok(Self {
            source,
            header,
            framing,
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Decode every record into a tree.
    ///
    /// If the stream ends early, the error is [`BinaryError::Truncated`]
    /// carrying the nodes decoded so far.
    pub fn read_tree(mut self) -> BinaryResult<Tree> {
        let mut builder = TreeBuilder::new();
        let outcome = match self.framing {
            Framing::EndMarker => decode_end_marked(&mut self.source, &mut builder),
            Framing::ChildCount => decode_counted(&mut self.source, &mut builder),
        };

        match outcome {
            Ok(()) => {}
            Err(BinaryError::Truncated { offset, .. }) => {
                let partial = builder.into_partial();
                warn!(
                    offset,
                    recovered = partial.as_ref().map_or(0, Tree::len),
                    "binary log truncated; returning partial tree"
                );
                return Err(BinaryError::Truncated {
                    offset,
                    partial: partial.map(Box::new),
                });
            }
            Err(e) => return Err(e),
        }

        let end = self.source.offset;
        if !self.source.at_eof()? {
            return Err(BinaryError::CorruptRecord {
                offset: end,
                reason: "trailing data after root node".into(),
            });
        }

        let tree = builder.finish().map_err(|e| BinaryError::CorruptRecord {
            offset: end,
            reason: e.to_string(),
        })?;
        debug!(nodes = tree.len(), "binary log read");
        Ok(tree)
    }
}

/// Read a complete tree from any byte source.
pub fn read_tree<R: Read>(source: R) -> BinaryResult<Tree> {
    BinaryReader::new(source)?.read_tree()
}

/// Read a complete tree from an in-memory buffer.
pub fn read_bytes(bytes: &[u8]) -> BinaryResult<Tree> {
    read_tree(bytes)
}

/// Read a complete tree from a file.
pub fn read_file(path: &Path) -> BinaryResult<Tree> {
    let file = File::open(path)?;
    read_tree(BufReader::new(file))
}

fn decode_end_marked<R: Read>(src: &mut Source<R>, builder: &mut TreeBuilder) -> BinaryResult<()> {
    loop {
        let offset = src.offset;
        match read_record(src)? {
            Some(node) => {
                builder.start(node).map_err(|e| corrupt(offset, e.to_string()))?;
            }
            None => {
                builder
                    .end()
                    .map_err(|_| corrupt(offset, "end marker with no open node"))?;
            }
        }
        if builder.is_complete() {
            return Ok(());
        }
    }
}

fn decode_counted<R: Read>(src: &mut Source<R>, builder: &mut TreeBuilder) -> BinaryResult<()> {
    // Children still expected for each open node.
    let mut remaining: Vec<u64> = Vec::new();
    loop {
        match remaining.last_mut() {
            Some(0) => {
                remaining.pop();
                builder.end().map_err(|e| corrupt(src.offset, e.to_string()))?;
                if remaining.is_empty() {
                    return Ok(());
                }
                continue;
            }
            Some(count) => *count -= 1,
            None => {}
        }

        let offset = src.offset;
        let node = read_record(src)?
            .ok_or_else(|| corrupt(offset, "end marker is not valid with child-count framing"))?;
        let children = src.read_varint()?;
        builder.start(node).map_err(|e| corrupt(offset, e.to_string()))?;
        remaining.push(children);
    }
}

/// Decode one record head. `None` means an end-of-children marker.
fn read_record<R: Read>(src: &mut Source<R>) -> BinaryResult<Option<Node>> {
    let offset = src.offset;
    let tag = src.read_u8()?;
    let Some(kind) = NodeKind::from_tag(tag) else {
        return Ok(None);
    };
    if kind.is_unknown() {
        debug!(tag, offset, "unrecognized node tag; reading as placeholder");
    }

    let flags = src.read_u8()?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(corrupt(offset, format!("unknown record flags {flags:#04x}")));
    }

    let mut node = Node::new(kind);
    if flags & FLAG_NAME != 0 {
        node.name = Some(src.read_string()?);
    }
    if flags & FLAG_VALUE != 0 {
        node.value = Some(src.read_string()?);
    }
    if flags & FLAG_EXTENSION != 0 {
        let skipped = src.skip_blob()?;
        debug!(offset, skipped, "skipped record extension");
    }
    Ok(Some(node))
}

fn corrupt(offset: u64, reason: impl Into<String>) -> BinaryError {
    BinaryError::CorruptRecord {
        offset,
        reason: reason.into(),
    }
}

/// Byte source that tracks its offset and reports a short read as
/// truncation.
#[derive(Debug)]
struct Source<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> Source<R> {
    fn truncated(&self) -> BinaryError {
        BinaryError::Truncated {
            offset: self.offset,
            partial: None,
        }
    }

    /// Read as many bytes as are available, up to `buf.len()`.
    fn fill(&mut self, buf: &mut [u8]) -> BinaryResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    fn read_u8(&mut self) -> BinaryResult<u8> {
        let mut byte = [0u8; 1];
        if self.fill(&mut byte)? == 0 {
            return Err(self.truncated());
        }
        Ok(byte[0])
    }

    fn at_eof(&mut self) -> BinaryResult<bool> {
        let mut byte = [0u8; 1];
        Ok(self.fill(&mut byte)? == 0)
    }

    fn read_varint(&mut self) -> BinaryResult<u64> {
        let start = self.offset;
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            // The tenth byte holds only bit 63.
            if shift == 63 && byte > 1 {
                return Err(corrupt(start, "varint overflow"));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn read_string(&mut self) -> BinaryResult<String> {
        let start = self.offset;
        let len = self.read_varint()?;
        let mut bytes = Vec::new();
        let read = (&mut self.inner).take(len).read_to_end(&mut bytes)?;
        self.offset += read as u64;
        if (read as u64) < len {
            return Err(self.truncated());
        }
        String::from_utf8(bytes).map_err(|_| corrupt(start, "string is not valid UTF-8"))
    }

    fn skip_blob(&mut self) -> BinaryResult<u64> {
        let len = self.read_varint()?;
        let skipped = io::copy(&mut (&mut self.inner).take(len), &mut io::sink())?;
        self.offset += skipped;
        if skipped < len {
            return Err(self.truncated());
        }
        Ok(skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriterConfig;
    use crate::format::END_MARKER;
    use crate::writer::to_bytes;
    use blt_tree::NodeId;

    fn header(major: u16) -> Vec<u8> {
        Header { major, minor: 0 }.to_bytes().to_vec()
    }

    #[test]
    fn bad_magic() {
        let mut data = b"WLLP".to_vec();
        data.extend_from_slice(&[0, 2, 0, 0, 1, 0, 0]);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::InvalidMagic { .. }));
        assert!(err.is_format_error());
    }

    #[test]
    fn too_short_for_magic() {
        let err = read_bytes(&[1, 2]).unwrap_err();
        assert!(matches!(err, BinaryError::InvalidMagic { .. }));
    }

    #[test]
    fn header_cut_after_magic() {
        let err = read_bytes(b"BLTB\x00").unwrap_err();
        assert!(matches!(err, BinaryError::InvalidHeader(_)));
    }

    #[test]
    fn unsupported_major() {
        let mut data = header(99);
        data.extend_from_slice(&[1, 0, END_MARKER]);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::UnsupportedVersion { major: 99, .. }));
    }

    #[test]
    fn newer_minor_is_accepted() {
        let mut data = Header { major: 2, minor: 40 }.to_bytes().to_vec();
        data.extend_from_slice(&[1, 0, END_MARKER]);
        let reader = BinaryReader::new(data.as_slice()).unwrap();
        assert_eq!(reader.header().minor, 40);
        let tree = reader.read_tree().unwrap();
        assert_eq!(tree.root().kind(), NodeKind::Build);
    }

    #[test]
    fn unknown_tag_becomes_placeholder() {
        let mut data = header(2);
        // Build { Unknown(0xC8, name "x") { Message } }
        data.extend_from_slice(&[1, 0]);
        data.extend_from_slice(&[0xC8, FLAG_NAME, 1, b'x']);
        data.extend_from_slice(&[5, 0, END_MARKER]);
        data.extend_from_slice(&[END_MARKER, END_MARKER]);

        let tree = read_bytes(&data).unwrap();
        let placeholder = tree.root().child(0).unwrap();
        assert_eq!(placeholder.kind(), NodeKind::Unknown(0xC8));
        assert_eq!(placeholder.name(), Some("x"));
        assert_eq!(placeholder.child(0).unwrap().kind(), NodeKind::Message);

        // Writing it back preserves the raw tag.
        let rewritten = to_bytes(&tree, &WriterConfig::default()).unwrap();
        assert_eq!(&rewritten[HEADER_LEN..], &data[HEADER_LEN..]);
    }

    #[test]
    fn extension_blob_is_skipped() {
        let mut data = header(2);
        data.extend_from_slice(&[1, FLAG_VALUE | FLAG_EXTENSION, 2, b'o', b'k', 3, 9, 9, 9]);
        data.push(END_MARKER);
        let tree = read_bytes(&data).unwrap();
        assert_eq!(tree.root().value(), Some("ok"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn unknown_flags_are_corrupt() {
        let mut data = header(2);
        data.extend_from_slice(&[1, 0x80, END_MARKER]);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::CorruptRecord { .. }));
    }

    #[test]
    fn leading_end_marker_is_corrupt() {
        let mut data = header(2);
        data.push(END_MARKER);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::CorruptRecord { .. }));
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let mut data = header(2);
        data.extend_from_slice(&[1, 0, END_MARKER, 1]);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::CorruptRecord { .. }));
    }

    #[test]
    fn invalid_utf8_is_corrupt() {
        let mut data = header(2);
        data.extend_from_slice(&[1, FLAG_NAME, 2, 0xFF, 0xFE, END_MARKER]);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::CorruptRecord { .. }));
    }

    #[test]
    fn header_only_is_truncated_without_tree() {
        let err = read_bytes(&header(2)).unwrap_err();
        assert!(err.is_truncated());
        assert!(err.into_partial().is_none());
    }

    #[test]
    fn truncated_mid_record_keeps_partial_tree() {
        let mut tree = Tree::new(Node::new(NodeKind::Build));
        let project = tree.add_child(NodeId::ROOT, Node::named(NodeKind::Project, "a.proj"));
        tree.add_child(project, Node::named(NodeKind::Target, "Compile"));
        tree.add_child(project, Node::named(NodeKind::Target, "Link").with_value("long value here"));

        let bytes = to_bytes(&tree, &WriterConfig::default()).unwrap();
        // Cut inside the last record's value.
        let cut = &bytes[..bytes.len() - 8];
        let err = read_bytes(cut).unwrap_err();
        let BinaryError::Truncated { offset, partial } = err else {
            panic!("expected truncation, got {err:?}");
        };
        assert_eq!(offset, cut.len() as u64);
        let partial = partial.unwrap();
        let names: Vec<_> = partial.iter().filter_map(|n| n.name()).collect();
        assert_eq!(names, vec!["a.proj", "Compile"]);
    }

    #[test]
    fn counted_framing_roundtrip_and_truncation() {
        let mut tree = Tree::new(Node::new(NodeKind::Build));
        let p = tree.add_child(NodeId::ROOT, Node::new(NodeKind::Project));
        tree.add_child(p, Node::new(NodeKind::Target));
        tree.add_child(NodeId::ROOT, Node::new(NodeKind::Project));
        let config = WriterConfig {
            framing: Framing::ChildCount,
            ..WriterConfig::default()
        };
        let bytes = to_bytes(&tree, &config).unwrap();
        assert_eq!(read_bytes(&bytes).unwrap(), tree);

        let err = read_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.into_partial().map(|t| t.len()), Some(3));
    }

    #[test]
    fn counted_framing_rejects_end_marker() {
        let mut data = header(1);
        data.extend_from_slice(&[1, 0, 1, END_MARKER]);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::CorruptRecord { .. }));
    }

    #[test]
    fn varint_overflow_is_corrupt() {
        let mut data = header(2);
        data.extend_from_slice(&[1, FLAG_NAME]);
        data.extend_from_slice(&[0xFF; 10]);
        let err = read_bytes(&data).unwrap_err();
        assert!(matches!(err, BinaryError::CorruptRecord { .. }));
    }

    #[test]
    fn varint_tenth_byte_is_bounded() {
        let read = |bytes: &[u8]| {
            Source {
                inner: bytes,
                offset: 0,
            }
            .read_varint()
        };

        let mut max = Vec::new();
        crate::format::encode_varint(&mut max, u64::MAX);
        assert_eq!(max.len(), 10);
        assert_eq!(read(&max).unwrap(), u64::MAX);

        let mut top_bit = vec![0x80; 9];
        top_bit.push(0x01);
        assert_eq!(read(&top_bit).unwrap(), 1 << 63);

        let mut high_bits = vec![0xFF; 9];
        high_bits.push(0x02);
        assert!(matches!(
            read(&high_bits).unwrap_err(),
            BinaryError::CorruptRecord { offset: 0, .. }
        ));

        let mut too_long = vec![0x80; 9];
        too_long.push(0x81);
        assert!(matches!(read(&too_long).unwrap_err(), BinaryError::CorruptRecord { .. }));
    }

    #[test]
    fn oversized_length_is_truncation_not_allocation() {
        let mut data = header(2);
        data.extend_from_slice(&[1, FLAG_NAME, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, b'a']);
        let err = read_bytes(&data).unwrap_err();
        assert!(err.is_truncated());
    }
}
