//! Error types for the diff crate.

/// Errors that can occur while loading documents to compare.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A document could not be parsed.
    #[error(transparent)]
    Text(#[from] blt_text::TextError),

    /// Reading a document failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
