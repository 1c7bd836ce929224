//! Acceleration structures are one of the components at the heart of
//! any ray tracer. Without algorithms to reduce the number of
//! unnecessary ray intersection tests, tracing a single ray through a
//! scene would take time linear in the number of primitives, since the
//! ray would need to be tested against each one in turn to find the
//! closest intersection.
//!
//! - AABBTree

pub mod bvh;
