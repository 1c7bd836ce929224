//! Foundational pieces shared by the rest of the crate: the
//! floating-point type alias and constants, the geometric classes, and
//! the error types.

pub mod common;
pub mod error;
pub mod geometry;
