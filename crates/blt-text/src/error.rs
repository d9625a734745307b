use std::io;

use thiserror::Error;

use crate::format::TextFormat;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("malformed {format} document: {reason}")]
    Malformed { format: TextFormat, reason: String },

    #[error("cannot determine text format of {0}")]
    UnknownFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TextError {
    pub(crate) fn malformed(format: TextFormat, reason: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            reason: reason.into(),
        }
    }

    /// Returns `true` when the document itself was rejected.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

pub type TextResult<T> = Result<T, TextError>;
