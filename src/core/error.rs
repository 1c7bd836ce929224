//! Error types for tree construction.

use thiserror::Error;

use crate::core::common::Float;

/// Errors reported before construction of an [`AABBTree`] begins.
///
/// Construction itself cannot fail partially: once the inputs are
/// accepted the build either completes or aborts on an internal
/// invariant violation.
///
/// [`AABBTree`]: crate::accelerators::bvh::AABBTree
#[derive(Error, Debug)]
pub enum BvhError {
    /// The supplied triangle list is empty; a zero-triangle tree has
    /// no valid root range.
    #[error("triangle list is empty")]
    EmptyTriangleList,

    /// The bounding box expansion margin must be non-negative and
    /// finite.
    #[error("invalid bounding box expansion: {0}")]
    InvalidExpansion(Float),
}

/// Result type for tree construction.
pub type Result<T> = std::result::Result<T, BvhError>;
