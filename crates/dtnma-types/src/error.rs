//! Error types for constructing ARI values.

use crate::ari_type::LitType;
use thiserror::Error;

/// Errors raised when building a value that would violate a model invariant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AriError {
    /// A typed primitive was given a value its type cannot hold.
    #[error("Value does not fit literal type {ty}")]
    TypeMismatch {
        /// The declared literal type.
        ty: LitType,
    },

    /// Containers and times have their own literal variants.
    #[error("Literal type {0} cannot wrap a primitive value")]
    NotPrimitive(LitType),

    /// A table row had the wrong number of columns.
    #[error("Table row has {got} columns, expected {expected}")]
    RowWidth {
        /// Columns declared by the table.
        expected: usize,
        /// Columns in the offending row.
        got: usize,
    },

    /// A table's item count is not a whole number of rows.
    #[error("Table with {ncols} columns cannot hold {items} items")]
    TableShape {
        /// Declared column count.
        ncols: usize,
        /// Total item count.
        items: usize,
    },

    /// A nonce must be null, an unsigned integer, or a byte string.
    #[error("Invalid nonce value")]
    InvalidNonce,
}

/// Alias for Result with AriError.
pub type AriResult<T> = Result<T, AriError>;
