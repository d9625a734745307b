use thiserror::Error;

/// Errors produced while assembling a tree incrementally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("no open node to close")]
    NoOpenNode,

    #[error("root node already closed; a tree has exactly one root")]
    RootClosed,

    #[error("tree is incomplete: {open} node(s) still open")]
    Unclosed { open: usize },

    #[error("tree has no root node")]
    Empty,
}

/// Convenience alias for tree results.
pub type TreeResult<T> = Result<T, TreeError>;
