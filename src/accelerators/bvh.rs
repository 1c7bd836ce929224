//! An axis-aligned bounding box tree over a flat list of triangles.
//!
//! Construction reorders the triangle storage in place so that every
//! node of the hierarchy covers one contiguous sub-range of it: the
//! tree owns a *partitioning* of the storage, not copies of the
//! triangles. Build nodes live in an arena for the duration of the
//! build and are then flattened into a compact depth-first array that
//! the queries traverse iteratively with a small explicit stack.
//!
//! The split policy is a spatial median: each node is cut at the
//! midpoint of the longest axis of its bounding box, triangles sorted
//! to either side by centroid. When every centroid falls on one side
//! (coincident or collinear triangles) the range is cut at its index
//! midpoint instead, which guarantees progress. Subdivision stops at
//! single-triangle leaves, so a tree over `n` triangles needs exactly
//! `2 * n - 1` nodes; the `2 * n` arena bound can only be exceeded by
//! a defect in the split policy and is enforced with an assertion.

// others
use typed_arena::Arena;
// crate
use crate::core::common::Float;
use crate::core::error::{BvhError, Result};
use crate::core::geometry::{
    bnd3_expand, bnd3_union_bnd3f, bnd3_union_pnt3f, Bounds3f, Point3f, Ray, Vector3f, XYZEnum,
};
use crate::shapes::triangle::{Triangle, TriangleHit};

#[derive(Debug)]
pub struct BVHBuildNode<'a> {
    pub bounds: Bounds3f,
    pub child1: Option<&'a mut BVHBuildNode<'a>>,
    pub child2: Option<&'a mut BVHBuildNode<'a>>,
    pub split_axis: XYZEnum,
    pub first_prim_offset: usize,
    pub n_primitives: usize,
}

impl<'a> Default for BVHBuildNode<'a> {
    fn default() -> Self {
        BVHBuildNode {
            bounds: Bounds3f::default(),
            child1: None,
            child2: None,
            split_axis: XYZEnum::X,
            first_prim_offset: 0_usize,
            n_primitives: 0_usize,
        }
    }
}

impl<'a> BVHBuildNode<'a> {
    pub fn init_leaf(&mut self, first: usize, n: usize, b: &Bounds3f) {
        self.first_prim_offset = first;
        self.n_primitives = n;
        self.bounds = *b;
        self.child1 = None;
        self.child2 = None;
    }
    pub fn init_interior(
        &mut self,
        axis: XYZEnum,
        c0: &'a mut BVHBuildNode<'a>,
        c1: &'a mut BVHBuildNode<'a>,
    ) {
        self.n_primitives = 0;
        self.bounds = bnd3_union_bnd3f(&c0.bounds, &c1.bounds);
        self.child1 = Some(c0);
        self.child2 = Some(c1);
        self.split_axis = axis;
    }
    pub fn is_leaf(&self) -> bool {
        self.child1.is_none() && self.child2.is_none()
    }
}

/// A node of the flattened tree, laid out in depth-first order.
///
/// For a leaf `offset` is the index of the node's first triangle in
/// the shared storage and `n_primitives` the length of its range. For
/// an interior node the first child is the next array entry, `offset`
/// is the index of the second child and `n_primitives` is zero.
#[derive(Debug, Copy, Clone)]
pub struct LinearBVHNode {
    pub bounds: Bounds3f,
    pub offset: usize,
    pub n_primitives: usize,
    pub axis: XYZEnum,
}

impl Default for LinearBVHNode {
    fn default() -> Self {
        LinearBVHNode {
            bounds: Bounds3f::default(),
            offset: 0_usize,
            n_primitives: 0_usize,
            axis: XYZEnum::X,
        }
    }
}

/// The bounding-volume hierarchy.
///
/// Owns the (reordered) triangle storage and the flattened node array;
/// both are written only during construction and read-only afterwards,
/// so a built tree can be queried concurrently from several threads
/// without locking as long as each query uses its own ray state (which
/// [`intersect`](AABBTree::intersect) always does).
pub struct AABBTree {
    expansion: Float,
    pub triangles: Vec<Triangle>,
    pub nodes: Vec<LinearBVHNode>,
}

impl AABBTree {
    /// Build the hierarchy over the given triangles.
    ///
    /// Takes ownership of the list and permutes it; callers that need
    /// the original order must keep their own copy. `expansion` pads
    /// every node box by a fixed margin along each axis to guard
    /// against edge-case misses on exactly axis-aligned geometry.
    ///
    /// Construction is synchronous and happens exactly once; the tree
    /// is immutable afterwards.
    pub fn new(triangles: Vec<Triangle>, expansion: Float) -> Result<AABBTree> {
        if triangles.is_empty() {
            return Err(BvhError::EmptyTriangleList);
        }
        if !expansion.is_finite() || expansion < 0.0 {
            return Err(BvhError::InvalidExpansion(expansion));
        }
        let mut tris = triangles;
        let num_prims: usize = tris.len();
        let max_nodes: usize = 2 * num_prims;
        let arena: Arena<BVHBuildNode> = Arena::with_capacity(max_nodes);
        let mut total_nodes: usize = 0;
        let root = AABBTree::recursive_build(
            &arena,
            &mut tris,
            0,
            num_prims,
            expansion,
            max_nodes,
            &mut total_nodes,
        );
        let mut nodes = vec![LinearBVHNode::default(); total_nodes];
        let mut offset: usize = 0;
        AABBTree::flatten_bvh_tree(root, &mut nodes, &mut offset);
        assert!(nodes.len() == total_nodes);
        let tree = AABBTree {
            expansion,
            triangles: tris,
            nodes,
        };
        assert_eq!(
            tree.count_leaf_triangles(),
            num_prims,
            "leaf ranges do not cover the triangle storage"
        );
        Ok(tree)
    }
    fn recursive_build<'a>(
        arena: &'a Arena<BVHBuildNode<'a>>,
        tris: &mut [Triangle],
        start: usize,
        end: usize,
        expansion: Float,
        max_nodes: usize,
        total_nodes: &mut usize,
    ) -> &'a mut BVHBuildNode<'a> {
        assert_ne!(start, end);
        assert!(
            *total_nodes < max_nodes,
            "BVH node arena exhausted ({} nodes for {} max): split policy defect",
            *total_nodes + 1,
            max_nodes
        );
        let node: &mut BVHBuildNode<'a> = arena.alloc(BVHBuildNode::default());
        *total_nodes += 1_usize;
        // bounds of the node: expanded union of all vertices in range
        let mut bounds: Bounds3f = Bounds3f::default();
        for tri in tris[start..end].iter() {
            for p in tri.p.iter() {
                bounds = bnd3_union_pnt3f(&bounds, p);
            }
        }
        bounds = bnd3_expand(&bounds, expansion);
        let n_primitives: usize = end - start;
        if n_primitives == 1 {
            node.init_leaf(start, n_primitives, &bounds);
            return node;
        }
        // spatial-median split on the axis of largest extent
        let dim: XYZEnum = bounds.maximum_extent();
        let pivot: Float = (bounds.p_min[dim] + bounds.p_max[dim]) * 0.5;
        let mut mid: usize = AABBTree::partition_triangles(tris, start, end, dim, pivot);
        if mid == start || mid == end {
            // all centroids on one side of the pivot: cut at the index
            // midpoint so that both halves are non-empty
            mid = (start + end) / 2_usize;
        }
        let c0 = AABBTree::recursive_build(
            arena,
            tris,
            start,
            mid,
            expansion,
            max_nodes,
            total_nodes,
        );
        let c1 =
            AABBTree::recursive_build(arena, tris, mid, end, expansion, max_nodes, total_nodes);
        node.init_interior(dim, c0, c1);
        node
    }
    /// Reorder `tris[start..end]` in place so that triangles whose
    /// centroid lies below `pivot` on `axis` come first; returns the
    /// index of the first triangle of the upper group.
    fn partition_triangles(
        tris: &mut [Triangle],
        start: usize,
        end: usize,
        axis: XYZEnum,
        pivot: Float,
    ) -> usize {
        let mut left: usize = start;
        let mut right: usize = end;
        while left < right {
            if tris[left].centroid()[axis] < pivot {
                left += 1;
            } else {
                right -= 1;
                tris.swap(left, right);
            }
        }
        left
    }
    fn flatten_bvh_tree<'a>(
        node: &mut BVHBuildNode<'a>,
        nodes: &mut Vec<LinearBVHNode>,
        offset: &mut usize,
    ) -> usize {
        let my_offset: usize = *offset;
        *offset += 1;
        if node.n_primitives > 0 {
            // leaf
            nodes[my_offset] = LinearBVHNode {
                bounds: node.bounds,
                offset: node.first_prim_offset,
                n_primitives: node.n_primitives,
                axis: XYZEnum::X,
            };
        } else {
            // interior: first child follows immediately, offset points
            // at the second child
            if let Some(ref mut child1) = node.child1 {
                AABBTree::flatten_bvh_tree(child1, nodes, offset);
            }
            if let Some(ref mut child2) = node.child2 {
                let second = AABBTree::flatten_bvh_tree(child2, nodes, offset);
                nodes[my_offset] = LinearBVHNode {
                    bounds: node.bounds,
                    offset: second,
                    n_primitives: 0_usize,
                    axis: node.split_axis,
                };
            }
        }
        my_offset
    }
    /// Find the nearest intersection of a ray with the triangle set.
    ///
    /// `direction` should be normalized by the caller; it is not
    /// re-normalized here, so with an unnormalized direction the
    /// returned `t` is in units of its length. Zero-length or
    /// non-finite inputs report no hit. The traversal is read-only and
    /// deterministic: repeating a query yields bit-identical results.
    pub fn intersect(&self, origin: Point3f, direction: Vector3f) -> Option<TriangleHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let len_sq: Float = direction.length_squared();
        if origin.has_nans() || direction.has_nans() || !len_sq.is_finite() || len_sq == 0.0 {
            return None;
        }
        let ray = Ray::new(origin, direction);
        let inv_dir: Vector3f = Vector3f {
            x: 1.0 / ray.d.x,
            y: 1.0 / ray.d.y,
            z: 1.0 / ray.d.z,
        };
        let dir_is_neg: [u8; 3] = [
            (inv_dir.x < 0.0) as u8,
            (inv_dir.y < 0.0) as u8,
            (inv_dir.z < 0.0) as u8,
        ];
        // follow the ray through the nodes to find triangle
        // intersections; single-triangle leaves admit trees deeper
        // than any fixed stack, so the to-visit stack grows on demand
        let mut current_node_index: u32 = 0;
        let mut nodes_to_visit: Vec<u32> = Vec::with_capacity(64);
        let mut best: Option<TriangleHit> = None;
        loop {
            let node: LinearBVHNode = self.nodes[current_node_index as usize];
            let intersects: bool = node.bounds.intersect_p(&ray, &inv_dir, &dir_is_neg);
            if intersects {
                if node.n_primitives > 0 {
                    // test every triangle in the leaf; only a strictly
                    // closer hit replaces the current best
                    for i in 0..node.n_primitives {
                        if let Some(hit) = self.triangles[node.offset + i].intersect(&ray) {
                            ray.t_max.set(hit.t);
                            best = Some(hit);
                        }
                    }
                    match nodes_to_visit.pop() {
                        Some(next) => current_node_index = next,
                        None => break,
                    }
                } else {
                    // put the far child on the stack, advance to the
                    // near one
                    if dir_is_neg[node.axis as usize] == 1_u8 {
                        nodes_to_visit.push(current_node_index + 1_u32);
                        current_node_index = node.offset as u32;
                    } else {
                        nodes_to_visit.push(node.offset as u32);
                        current_node_index += 1_u32;
                    }
                }
            } else {
                match nodes_to_visit.pop() {
                    Some(next) => current_node_index = next,
                    None => break,
                }
            }
        }
        best
    }
    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }
    pub fn n_leaf_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.n_primitives > 0).count()
    }
    /// The expansion margin the tree was built with.
    pub fn expansion(&self) -> Float {
        self.expansion
    }
    /// The triangle storage in tree order (not the input order).
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles[..]
    }
    pub fn world_bound(&self) -> Bounds3f {
        if !self.nodes.is_empty() {
            self.nodes[0].bounds
        } else {
            Bounds3f::default()
        }
    }
    /// Write triangle and leaf counts to stdout.
    pub fn print_stats(&self) {
        println!("Num. BVH triangles = {}", self.n_triangles());
        println!("Num. BVH leaf nodes = {}", self.n_leaf_nodes());
    }
    fn count_leaf_triangles(&self) -> usize {
        self.nodes.iter().map(|n| n.n_primitives).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{pnt3_inside_bnd3, vec3_dot_nrmf};

    fn pnt(x: Float, y: Float, z: Float) -> Point3f {
        Point3f { x, y, z }
    }

    fn vec(x: Float, y: Float, z: Float) -> Vector3f {
        Vector3f { x, y, z }
    }

    /// Two triangles forming the unit square in the z=0 plane.
    fn unit_square() -> Vec<Triangle> {
        vec![
            Triangle::new(pnt(0.0, 0.0, 0.0), pnt(1.0, 0.0, 0.0), pnt(0.0, 1.0, 0.0)),
            Triangle::new(pnt(1.0, 1.0, 0.0), pnt(1.0, 0.0, 0.0), pnt(0.0, 1.0, 0.0)),
        ]
    }

    /// A deterministic scattering of small triangles (LCG jitter, no
    /// RNG dependency needed).
    fn scattered_triangles(n: usize) -> Vec<Triangle> {
        let mut tris = Vec::with_capacity(n);
        let mut state: u32 = 0x2545_f491;
        let mut next = move || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as Float / (1_u32 << 24) as Float
        };
        for _ in 0..n {
            let base = pnt(
                next() * 20.0 - 10.0,
                next() * 20.0 - 10.0,
                next() * 20.0 - 10.0,
            );
            tris.push(Triangle::new(
                base,
                base + vec(next() * 0.5 + 0.1, 0.0, next() * 0.2),
                base + vec(0.0, next() * 0.5 + 0.1, next() * 0.2),
            ));
        }
        tris
    }

    fn centroid_keys(tris: &[Triangle]) -> Vec<(u32, u32, u32)> {
        let mut keys: Vec<(u32, u32, u32)> = tris
            .iter()
            .map(|t| {
                let c = t.centroid();
                (c.x.to_bits(), c.y.to_bits(), c.z.to_bits())
            })
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn empty_input_is_rejected() {
        match AABBTree::new(Vec::new(), 0.001) {
            Err(BvhError::EmptyTriangleList) => {}
            _ => panic!("empty triangle list must be rejected"),
        }
    }

    #[test]
    fn invalid_expansion_is_rejected() {
        let tris = unit_square();
        assert!(AABBTree::new(tris.clone(), -0.5).is_err());
        assert!(AABBTree::new(tris, std::f32::NAN).is_err());
    }

    #[test]
    fn leaves_cover_the_input_exactly() {
        let tris = scattered_triangles(100);
        let before = centroid_keys(&tris);
        let tree = AABBTree::new(tris, 0.001).unwrap();
        // no triangle created, duplicated or dropped
        assert_eq!(centroid_keys(tree.triangles()), before);
        let leaf_total: usize = tree
            .nodes
            .iter()
            .filter(|n| n.n_primitives > 0)
            .map(|n| n.n_primitives)
            .sum();
        assert_eq!(leaf_total, 100);
        // single-triangle leaf policy
        assert_eq!(tree.n_leaf_nodes(), 100);
    }

    #[test]
    fn leaf_bounds_contain_their_triangles() {
        let tree = AABBTree::new(scattered_triangles(64), 0.001).unwrap();
        for node in tree.nodes.iter().filter(|n| n.n_primitives > 0) {
            for tri in &tree.triangles()[node.offset..node.offset + node.n_primitives] {
                for p in tri.p.iter() {
                    assert!(pnt3_inside_bnd3(p, &node.bounds));
                }
            }
        }
    }

    #[test]
    fn interior_bounds_are_union_of_children() {
        let tree = AABBTree::new(scattered_triangles(64), 0.001).unwrap();
        for (i, node) in tree.nodes.iter().enumerate() {
            if node.n_primitives == 0 {
                let c1 = &tree.nodes[i + 1];
                let c2 = &tree.nodes[node.offset];
                assert_eq!(node.bounds, bnd3_union_bnd3f(&c1.bounds, &c2.bounds));
            }
        }
    }

    #[test]
    fn single_triangle_hit_along_inward_normal() {
        // a tilted triangle, normal (0, -1, 0)
        let tri = Triangle::new(pnt(0.0, 0.0, 0.0), pnt(1.0, 0.0, 0.0), pnt(0.0, 0.0, 1.0));
        let n = tri.geometric_normal();
        let c = tri.centroid();
        let tree = AABBTree::new(vec![tri], 0.001).unwrap();
        let origin = pnt(c.x + n.x * 5.0, c.y + n.y * 5.0, c.z + n.z * 5.0);
        let inward = vec(-n.x, -n.y, -n.z);
        let hit = tree.intersect(origin, inward).unwrap();
        assert!(hit.t > 0.0);
        assert!((hit.t - 5.0).abs() < 1e-4);
        // reported normal matches the geometric normal up to sign and
        // faces the ray origin
        assert!((vec3_dot_nrmf(&inward, &hit.n_hit) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn ray_outside_all_boxes_misses() {
        let tree = AABBTree::new(unit_square(), 0.001).unwrap();
        assert!(tree
            .intersect(pnt(50.0, 50.0, 50.0), vec(0.0, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn closest_of_two_overlapping_triangles_wins() {
        // same footprint at z=0 and z=-1; the farther one is stored
        // first so traversal order alone cannot produce the answer
        let far = Triangle::new(
            pnt(0.0, 0.0, -1.0),
            pnt(2.0, 0.0, -1.0),
            pnt(0.0, 2.0, -1.0),
        );
        let near = Triangle::new(pnt(0.0, 0.0, 0.0), pnt(2.0, 0.0, 0.0), pnt(0.0, 2.0, 0.0));
        let tree = AABBTree::new(vec![far, near], 0.001).unwrap();
        let hit = tree.intersect(pnt(0.5, 0.5, 5.0), vec(0.0, 0.0, -1.0)).unwrap();
        assert!((hit.t - 5.0).abs() < 1e-4);
        assert!(hit.p_hit.z.abs() < 1e-4);
    }

    #[test]
    fn queries_are_idempotent() {
        let tree = AABBTree::new(scattered_triangles(32), 0.001).unwrap();
        let origin = pnt(0.0, 0.0, 30.0);
        let dir = vec(0.01, 0.002, -1.0).normalize();
        let first = tree.intersect(origin, dir);
        let second = tree.intersect(origin, dir);
        match (first, second) {
            (None, None) => {}
            (Some(a), Some(b)) => {
                assert_eq!(a.t.to_bits(), b.t.to_bits());
                assert_eq!(a.p_hit.x.to_bits(), b.p_hit.x.to_bits());
                assert_eq!(a.p_hit.y.to_bits(), b.p_hit.y.to_bits());
                assert_eq!(a.p_hit.z.to_bits(), b.p_hit.z.to_bits());
                assert_eq!(a.n_hit.x.to_bits(), b.n_hit.x.to_bits());
                assert_eq!(a.n_hit.y.to_bits(), b.n_hit.y.to_bits());
                assert_eq!(a.n_hit.z.to_bits(), b.n_hit.z.to_bits());
            }
            _ => panic!("repeated query changed its outcome"),
        }
    }

    #[test]
    fn unit_square_scenario() {
        let tree = AABBTree::new(unit_square(), 0.001).unwrap();
        let hit = tree.intersect(pnt(0.3, 0.3, 5.0), vec(0.0, 0.0, -1.0)).unwrap();
        assert!((hit.t - 5.0).abs() < 1e-4);
        assert!((hit.p_hit.x - 0.3).abs() < 1e-4);
        assert!((hit.p_hit.y - 0.3).abs() < 1e-4);
        assert!(hit.p_hit.z.abs() < 1e-4);
        assert!((hit.n_hit.z.abs() - 1.0).abs() < 1e-4);
        assert!(tree
            .intersect(pnt(5.0, 5.0, 5.0), vec(0.0, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn coincident_centroids_still_build() {
        // identical triangles: every centroid lands on the same side
        // of any split plane, exercising the even-split fallback
        let tri = Triangle::new(pnt(0.0, 0.0, 0.0), pnt(1.0, 0.0, 0.0), pnt(0.0, 1.0, 0.0));
        let tree = AABBTree::new(vec![tri; 16], 0.001).unwrap();
        assert_eq!(tree.n_leaf_nodes(), 16);
        assert!(tree
            .intersect(pnt(0.25, 0.25, 4.0), vec(0.0, 0.0, -1.0))
            .is_some());
    }

    #[test]
    fn deep_trees_traverse_without_overflow() {
        // geometrically spaced degenerate triangles make the spatial
        // median peel off one triangle per level, so the tree is a
        // spine far deeper than any fixed traversal stack
        let tris: Vec<Triangle> = (0..140)
            .map(|i| {
                let p = pnt(0.5_f32.powi(i), 0.0, 0.0);
                Triangle::new(p, p, p)
            })
            .collect();
        let tree = AABBTree::new(tris, 0.0).unwrap();
        assert_eq!(tree.n_leaf_nodes(), 140);
        // a +x ray keeps the deep side as the near child all the way
        // down; degenerate triangles report no hit, but the walk must
        // visit every level without overflowing
        let hit = tree.intersect(pnt(-1.0, 0.0, 0.0), vec(1.0, 0.0, 0.0));
        assert!(hit.is_none());
    }

    #[test]
    fn malformed_directions_report_no_hit() {
        let tree = AABBTree::new(unit_square(), 0.001).unwrap();
        assert!(tree.intersect(pnt(0.3, 0.3, 5.0), vec(0.0, 0.0, 0.0)).is_none());
        assert!(tree
            .intersect(pnt(0.3, 0.3, 5.0), vec(std::f32::NAN, 0.0, -1.0))
            .is_none());
        assert!(tree
            .intersect(pnt(0.3, 0.3, 5.0), vec(std::f32::INFINITY, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn concurrent_queries_agree() {
        let tree = AABBTree::new(scattered_triangles(128), 0.001).unwrap();
        let origin = pnt(0.0, 0.0, 30.0);
        let dir = vec(0.1, -0.05, -1.0).normalize();
        let reference = tree.intersect(origin, dir);
        crossbeam::thread::scope(|s| {
            let mut handles = Vec::new();
            for _ in 0..4 {
                let tree = &tree;
                handles.push(s.spawn(move |_| tree.intersect(origin, dir)));
            }
            for h in handles {
                let result = h.join().unwrap();
                match (&reference, &result) {
                    (None, None) => {}
                    (Some(a), Some(b)) => assert_eq!(a.t.to_bits(), b.t.to_bits()),
                    _ => panic!("concurrent query diverged"),
                }
            }
        })
        .unwrap();
    }

    #[test]
    fn stats_readback() {
        let tree = AABBTree::new(scattered_triangles(50), 0.001).unwrap();
        assert_eq!(tree.n_triangles(), 50);
        assert_eq!(tree.n_leaf_nodes(), 50);
        assert_eq!(tree.expansion(), 0.001);
        let wb = tree.world_bound();
        for tri in tree.triangles() {
            for p in tri.p.iter() {
                assert!(pnt3_inside_bnd3(p, &wb));
            }
        }
    }
}
