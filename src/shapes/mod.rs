//! The tree accelerates queries against exactly one kind of geometric
//! primitive: the triangle. Consumers of the crate (mesh loaders,
//! procedural generators) are expected to deliver their surfaces as a
//! flat triangle list.

pub mod triangle;
