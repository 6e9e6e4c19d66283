//! Error types for the operation algebra.

use thiserror::Error;

/// Errors raised while building or applying operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtError {
    /// A single operation is malformed (zero count or empty insert).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An operation list runs past the end of the text it is applied to.
    #[error(
        "Malformed operation list: {kind} of {len} at offset {offset} exceeds source length {source_len}"
    )]
    MalformedOperationList {
        kind: &'static str,
        offset: usize,
        len: usize,
        source_len: usize,
    },
}

pub type Result<T> = std::result::Result<T, OtError>;
