use std::io;

use blt_tree::Tree;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("invalid binary log magic: expected {expected}, got {actual}")]
    InvalidMagic { expected: String, actual: String },

    #[error("invalid binary log header: {0}")]
    InvalidHeader(String),

    #[error("unsupported binary log version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    /// The stream ended inside a record or before the root closed.
    ///
    /// `partial` holds every node decoded before the cut, or `None` when
    /// the stream ended before the first record.
    #[error("binary log truncated at offset {offset}")]
    Truncated {
        offset: u64,
        partial: Option<Box<Tree>>,
    },

    #[error("no open node to close")]
    NoOpenNode,

    #[error("root node already closed; a log has exactly one root")]
    RootClosed,

    #[error("invalid writer configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BinaryError {
    /// Returns `true` for fatal header or record-layout errors.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic { .. }
                | Self::InvalidHeader(_)
                | Self::UnsupportedVersion { .. }
                | Self::CorruptRecord { .. }
        )
    }

    /// Returns `true` if the input was cut short.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }

    /// Take the best-effort tree out of a truncation error.
    pub fn into_partial(self) -> Option<Tree> {
        match self {
            Self::Truncated { partial, .. } => partial.map(|tree| *tree),
            _ => None,
        }
    }
}

pub type BinaryResult<T> = Result<T, BinaryError>;
