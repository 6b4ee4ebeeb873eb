//! Error types for parsing historian domain values.

use thiserror::Error;

/// Errors that can occur when parsing historian domain values from text.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The named aggregation function is not one of the computable set.
    #[error("Invalid aggregation function: {0}")]
    UnknownFunction(String),

    /// The query ordering is not one of the two supported orders.
    #[error("Invalid query order: {0} (expected FIRST_TO_LAST or LAST_TO_FIRST)")]
    UnknownOrder(String),
}

/// Result type alias for parse operations.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
