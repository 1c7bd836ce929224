//! # rs_bvh
//!
//! [Rust][rust] crate building an axis-aligned bounding box tree (a
//! bounding-volume hierarchy) over a flat list of triangles and
//! answering nearest-hit ray-intersection queries against it.
//!
//! The tree takes ownership of the triangle list and reorders it in
//! place during construction, so that every node of the hierarchy
//! covers one contiguous sub-range of the shared storage. Queries walk
//! the flattened node array with a small explicit stack, prune
//! subtrees whose bounding box cannot improve on the current best hit,
//! and resolve leaves with a determinant-based ray-triangle test.
//!
//! Mesh loading, shading and presentation are left to the consumers of
//! this crate: they supply the triangles and interpret the returned
//! hit distance, point and normal.
//!
//! ```rust
//! use rs_bvh::accelerators::bvh::AABBTree;
//! use rs_bvh::core::geometry::{Point3f, Vector3f};
//! use rs_bvh::shapes::triangle::Triangle;
//!
//!     let tris = vec![Triangle::new(
//!         Point3f { x: 0.0, y: 0.0, z: 0.0 },
//!         Point3f { x: 1.0, y: 0.0, z: 0.0 },
//!         Point3f { x: 0.0, y: 1.0, z: 0.0 },
//!     )];
//!     let tree = AABBTree::new(tris, 0.001).unwrap();
//!     let hit = tree
//!         .intersect(
//!             Point3f { x: 0.25, y: 0.25, z: 2.0 },
//!             Vector3f { x: 0.0, y: 0.0, z: -1.0 },
//!         )
//!         .unwrap();
//!     assert!((hit.t - 2.0).abs() < 1e-5);
//! ```
//!
//! [rust]: https://www.rust-lang.org

#[macro_use]
extern crate impl_ops;

pub mod accelerators;
pub mod core;
pub mod shapes;
