//! Triangles and the ray-triangle intersection test resolved at the
//! leaves of the tree.

// crate
use crate::core::common::Float;
use crate::core::geometry::{
    bnd3_union_pnt3f, nrm_faceforward_vec3, vec3_cross_vec3, vec3_dot_vec3f, Bounds3f, Normal3f,
    Point3f, Ray, Vector3f,
};

/// Determinants with a smaller magnitude are treated as parallel to
/// the ray (no intersection).
const DET_EPSILON: Float = 1e-8;

/// A single triangle given by its three vertex positions.
///
/// Triangles are immutable once created; the tree only moves them
/// around inside the shared storage while it builds its partition.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Triangle {
    pub p: [Point3f; 3],
}

/// The result of a successful ray-triangle (or ray-tree) query.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TriangleHit {
    /// parametric distance along the ray, strictly positive
    pub t: Float,
    /// world-space hit point
    pub p_hit: Point3f,
    /// unit geometric normal, oriented to face the ray origin
    pub n_hit: Normal3f,
}

impl Triangle {
    pub fn new(p0: Point3f, p1: Point3f, p2: Point3f) -> Self {
        Triangle { p: [p0, p1, p2] }
    }
    /// Arithmetic mean of the three vertices, used only as the
    /// construction-time split key.
    pub fn centroid(&self) -> Point3f {
        (self.p[0] + self.p[1] + self.p[2]) / 3.0
    }
    pub fn world_bound(&self) -> Bounds3f {
        bnd3_union_pnt3f(&Bounds3f::new(self.p[0], self.p[1]), &self.p[2])
    }
    /// Unit normal following the input winding (right-handed around
    /// the vertex order).
    pub fn geometric_normal(&self) -> Normal3f {
        let c: Vector3f = vec3_cross_vec3(&(self.p[1] - self.p[0]), &(self.p[2] - self.p[0]));
        let n: Vector3f = c.normalize();
        Normal3f {
            x: n.x,
            y: n.y,
            z: n.z,
        }
    }
    /// Intersect a ray with the triangle using the determinant
    /// (Möller-Trumbore) test.
    ///
    /// The test is two-sided: both front- and back-facing triangles
    /// intersect, and the reported normal is the winding normal
    /// flipped toward the ray origin. An intersection is accepted only
    /// when its distance is strictly positive and strictly below the
    /// ray's current `t_max`; the caller is responsible for tightening
    /// `t_max` afterwards.
    pub fn intersect(&self, ray: &Ray) -> Option<TriangleHit> {
        let edge1: Vector3f = self.p[1] - self.p[0];
        let edge2: Vector3f = self.p[2] - self.p[0];
        let pvec: Vector3f = vec3_cross_vec3(&ray.d, &edge2);
        let det: Float = vec3_dot_vec3f(&edge1, &pvec);
        if det.abs() < DET_EPSILON {
            return None;
        }
        let inv_det: Float = 1.0 / det;
        let tvec: Vector3f = ray.o - self.p[0];
        let u: Float = vec3_dot_vec3f(&tvec, &pvec) * inv_det;
        if u < 0.0 || u > 1.0 {
            return None;
        }
        let qvec: Vector3f = vec3_cross_vec3(&tvec, &edge1);
        let v: Float = vec3_dot_vec3f(&ray.d, &qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t: Float = vec3_dot_vec3f(&edge2, &qvec) * inv_det;
        if t <= 0.0 || t >= ray.t_max.get() {
            return None;
        }
        let n_hit: Normal3f = nrm_faceforward_vec3(&self.geometric_normal(), &-ray.d);
        Some(TriangleHit {
            t,
            p_hit: ray.position(t),
            n_hit,
        })
    }
}
