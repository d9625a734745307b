//! Wire layout shared by the writer and the reader.
//!
//! ```text
//! header:  "BLTB" | major: u16 BE | minor: u16 BE
//! record:  tag: u8 | flags: u8
//!          [varint len | utf-8 name]       if flags & NAME
//!          [varint len | utf-8 value]      if flags & VALUE
//!          [varint len | opaque bytes]     if flags & EXTENSION (skipped)
//! major 1: record | varint child count | children...
//! major 2: record | children... | 0x00
//! ```
//!
//! Tag 0 never starts a record; in major 2 it closes the innermost open node.

use blt_tree::{Node, END_OF_CHILDREN_TAG};

use crate::error::{BinaryError, BinaryResult};

/// First four bytes of every binary log.
pub const MAGIC: &[u8; 4] = b"BLTB";
/// Magic plus big-endian major and minor.
pub const HEADER_LEN: usize = 8;

/// Minor version written by this implementation.
pub const FORMAT_MINOR: u16 = 1;

pub const FLAG_NAME: u8 = 0b0000_0001;
pub const FLAG_VALUE: u8 = 0b0000_0010;
/// Opaque trailing payload reserved for newer minors; readers skip it.
pub const FLAG_EXTENSION: u8 = 0b0000_0100;
pub const KNOWN_FLAGS: u8 = FLAG_NAME | FLAG_VALUE | FLAG_EXTENSION;

/// Record tag that closes the innermost open node (end-marker framing).
pub const END_MARKER: u8 = END_OF_CHILDREN_TAG;

/// Decoded file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Selects the framing; see [`crate::Framing::from_major`].
    pub major: u16,
    /// Additive revisions; any value is readable.
    pub minor: u16,
}

impl Header {
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(MAGIC);
        out[4..6].copy_from_slice(&self.major.to_be_bytes());
        out[6..8].copy_from_slice(&self.minor.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> BinaryResult<Self> {
        if &bytes[0..4] != MAGIC {
            return Err(BinaryError::InvalidMagic {
                expected: String::from_utf8_lossy(MAGIC).into(),
                actual: String::from_utf8_lossy(&bytes[0..4]).into(),
            });
        }
        Ok(Self {
            major: u16::from_be_bytes([bytes[4], bytes[5]]),
            minor: u16::from_be_bytes([bytes[6], bytes[7]]),
        })
    }
}

/// Append one record (tag, flags, strings) to `buf`. Framing is the
/// caller's job.
pub(crate) fn encode_record(buf: &mut Vec<u8>, node: &Node) {
    let mut flags = 0u8;
    if node.name.is_some() {
        flags |= FLAG_NAME;
    }
    if node.value.is_some() {
        flags |= FLAG_VALUE;
    }
    buf.push(node.kind().tag());
    buf.push(flags);
    if let Some(name) = &node.name {
        encode_str(buf, name);
    }
    if let Some(value) = &node.value {
        encode_str(buf, value);
    }
}

fn encode_str(buf: &mut Vec<u8>, s: &str) {
    encode_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a u64 as a LEB128 variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}
