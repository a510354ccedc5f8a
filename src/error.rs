//! Error model shared by both maps.

use thiserror::Error;

/// Result type returned by every fallible map and cursor operation.
pub type MapResult<T> = Result<T, MapError>;

/// Failures surfaced by the maps. Every variant is a contract violation by
/// the caller, there is nothing to retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A lookup-only access named a key that is not present.
    #[error("key not found")]
    NotFound,

    /// A cursor was moved or used for removal outside of its valid range,
    /// belongs to another container, or refers to an entry that is gone.
    #[error("invalid cursor operation: {0}")]
    InvalidOperation(&'static str),

    /// A cursor that denotes no entry was read through.
    #[error("cannot dereference cursor: {0}")]
    InvalidDereference(&'static str),
}
