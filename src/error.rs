//! Error type for the strict entry points of [`AvlTree`](crate::AvlTree).
//!
//! The map-style operations report absence through `Option`; only
//! [`try_insert`](crate::AvlTree::try_insert), [`try_remove`](crate::AvlTree::try_remove)
//! and [`get`](crate::AvlTree::get) surface these errors.

use thiserror::Error;

/// Result type for the strict tree operations.
pub type Result<T> = std::result::Result<T, AvlError>;

/// Errors reported by the strict tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AvlError {
    /// The key is not present in the tree.
    #[error("key not found")]
    NotFound,

    /// The key is already present and the operation refuses to overwrite it.
    #[error("key already exists")]
    KeyExists,
}
