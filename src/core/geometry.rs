//! Geometric classes the tree is built from: points, vectors, normals,
//! axis-aligned bounding boxes and rays.
//!
//! # Points and vectors
//!
//! A **point** is a zero-dimensional location in 3D space, a **vector**
//! a direction; both use x, y, z coordinates but are distinct types
//! because they behave differently under arithmetic (a point minus a
//! point is a vector, a point plus a vector is a point).
//!
//! ```rust
//! use rs_bvh::core::geometry::{Point3f, Vector3f};
//!
//!     let origin = Point3f { x: 0.0, y: 0.0, z: 0.0 };
//!     let up = Vector3f { x: 0.0, y: 0.0, z: 1.0 };
//!     println!("{:?}", origin + up);
//! ```
//!
//! # Bounding boxes
//!
//! **Bounds3f** represents an axis-aligned region of space by its two
//! extreme corners. The default value is *inverted* (min above max) so
//! that taking the union with the first point initializes it; the
//! `p_min[i] <= p_max[i]` invariant holds as soon as any geometry has
//! been folded in.
//!
//! # Rays
//!
//! A **ray** is a semi-infinite line given by origin and direction. The
//! `t_max` field carries the parametric distance of the best hit found
//! so far during one traversal and is monotonically tightened; it lives
//! in a `Cell` so a ray can be threaded through the traversal by shared
//! reference.

// std
use std::cell::Cell;
use std::ops;
use std::ops::{Index, Neg};
// others
use strum_macros::EnumIter;
// crate
use crate::core::common::{gamma, Float};

#[derive(EnumIter, Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum XYZEnum {
    X = 0,
    Y = 1,
    Z = 2,
}

#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum MinMaxEnum {
    Min = 0,
    Max = 1,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub fn has_nans(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    /// Compute a new vector pointing in the same direction but with
    /// unit length.
    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }
}

impl Index<XYZEnum> for Vector3f {
    type Output = Float;
    fn index(&self, i: XYZEnum) -> &Float {
        match i {
            XYZEnum::X => &self.x,
            XYZEnum::Y => &self.y,
            XYZEnum::Z => &self.z,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Point3f {
    pub fn has_nans(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }
}

impl Index<XYZEnum> for Point3f {
    type Output = Float;
    fn index(&self, i: XYZEnum) -> &Float {
        match i {
            XYZEnum::X => &self.x,
            XYZEnum::Y => &self.y,
            XYZEnum::Z => &self.z,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Normal3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl_op_ex!(+|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl Neg for Vector3f {
    type Output = Vector3f;
    fn neg(self) -> Vector3f {
        Vector3f {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl_op_ex!(*|a: &Vector3f, b: Float| -> Vector3f {
    Vector3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(/|a: &Vector3f, b: Float| -> Vector3f {
    Vector3f {
        x: a.x / b,
        y: a.y / b,
        z: a.z / b,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Point3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Point3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(/|a: &Point3f, b: Float| -> Point3f {
    Point3f {
        x: a.x / b,
        y: a.y / b,
        z: a.z / b,
    }
});

impl Neg for Normal3f {
    type Output = Normal3f;
    fn neg(self) -> Normal3f {
        Normal3f {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Product of the Euclidean magnitudes of two vectors and the cosine
/// of the angle between them. A return value of zero means both
/// vectors are orthogonal, a value of one that they are codirectional.
pub fn vec3_dot_vec3f(v1: &Vector3f, v2: &Vector3f) -> Float {
    v1.x * v2.x + v1.y * v2.y + v1.z * v2.z
}

/// Dot product of a vector and a normal.
pub fn vec3_dot_nrmf(v1: &Vector3f, n2: &Normal3f) -> Float {
    v1.x * n2.x + v1.y * n2.y + v1.z * n2.z
}

/// The cross product of two vectors.
pub fn vec3_cross_vec3(v1: &Vector3f, v2: &Vector3f) -> Vector3f {
    let v1x: f64 = v1.x as f64;
    let v1y: f64 = v1.y as f64;
    let v1z: f64 = v1.z as f64;
    let v2x: f64 = v2.x as f64;
    let v2y: f64 = v2.y as f64;
    let v2z: f64 = v2.z as f64;
    Vector3f {
        x: ((v1y * v2z) - (v1z * v2y)) as Float,
        y: ((v1z * v2x) - (v1x * v2z)) as Float,
        z: ((v1x * v2y) - (v1y * v2x)) as Float,
    }
}

/// Flip a surface normal so that it lies in the same hemisphere as a
/// given vector.
pub fn nrm_faceforward_vec3(n: &Normal3f, v: &Vector3f) -> Normal3f {
    if vec3_dot_nrmf(v, n) < 0.0 as Float {
        -(*n)
    } else {
        *n
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    fn default() -> Bounds3f {
        let min_num: Float = std::f32::MIN;
        let max_num: Float = std::f32::MAX;
        // inverted, so that the union with the first point wins
        Bounds3f {
            p_min: Point3f {
                x: max_num,
                y: max_num,
                z: max_num,
            },
            p_max: Point3f {
                x: min_num,
                y: min_num,
                z: min_num,
            },
        }
    }
}

impl Bounds3f {
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        let p_min: Point3f = Point3f {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            z: p1.z.min(p2.z),
        };
        let p_max: Point3f = Point3f {
            x: p1.x.max(p2.x),
            y: p1.y.max(p2.y),
            z: p1.z.max(p2.z),
        };
        Bounds3f { p_min, p_max }
    }
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }
    /// The axis along which the box has its largest extent, used to
    /// pick the split dimension during construction.
    pub fn maximum_extent(&self) -> XYZEnum {
        let d: Vector3f = self.diagonal();
        if d.x > d.y && d.x > d.z {
            XYZEnum::X
        } else if d.y > d.z {
            XYZEnum::Y
        } else {
            XYZEnum::Z
        }
    }
    /// Ray-box slab test against precomputed reciprocal direction and
    /// direction signs.
    ///
    /// The exit distances are scaled by `1 + 2 * gamma(3)` so that
    /// rounding error can never make the interval test miss a box the
    /// ray actually passes through. A box is rejected when the slab
    /// interval is empty, lies entirely behind the origin, or starts
    /// beyond the current best hit distance `ray.t_max`.
    pub fn intersect_p(&self, ray: &Ray, inv_dir: &Vector3f, dir_is_neg: &[u8; 3]) -> bool {
        let near = |neg: u8| -> MinMaxEnum {
            if neg == 0 {
                MinMaxEnum::Min
            } else {
                MinMaxEnum::Max
            }
        };
        let far = |neg: u8| -> MinMaxEnum {
            if neg == 0 {
                MinMaxEnum::Max
            } else {
                MinMaxEnum::Min
            }
        };
        // check for ray intersection against x and y slabs
        let mut t_min: Float = (self[near(dir_is_neg[0])].x - ray.o.x) * inv_dir.x;
        let mut t_max: Float = (self[far(dir_is_neg[0])].x - ray.o.x) * inv_dir.x;
        let ty_min: Float = (self[near(dir_is_neg[1])].y - ray.o.y) * inv_dir.y;
        let mut ty_max: Float = (self[far(dir_is_neg[1])].y - ray.o.y) * inv_dir.y;
        t_max *= 1.0 + 2.0 * gamma(3_i32);
        ty_max *= 1.0 + 2.0 * gamma(3_i32);
        if t_min > ty_max || ty_min > t_max {
            return false;
        }
        if ty_min > t_min {
            t_min = ty_min;
        }
        if ty_max < t_max {
            t_max = ty_max;
        }
        // check for ray intersection against z slab
        let tz_min: Float = (self[near(dir_is_neg[2])].z - ray.o.z) * inv_dir.z;
        let mut tz_max: Float = (self[far(dir_is_neg[2])].z - ray.o.z) * inv_dir.z;
        tz_max *= 1.0 + 2.0 * gamma(3_i32);
        if t_min > tz_max || tz_min > t_max {
            return false;
        }
        if tz_min > t_min {
            t_min = tz_min;
        }
        if tz_max < t_max {
            t_max = tz_max;
        }
        (t_min < ray.t_max.get()) && (t_max > 0.0)
    }
}

impl Index<MinMaxEnum> for Bounds3f {
    type Output = Point3f;
    fn index(&self, i: MinMaxEnum) -> &Point3f {
        match i {
            MinMaxEnum::Min => &self.p_min,
            _ => &self.p_max,
        }
    }
}

/// Given a bounding box and a point, the **bnd3_union_pnt3f()**
/// function returns a new bounding box that encompasses that point as
/// well as the original box.
pub fn bnd3_union_pnt3f(b: &Bounds3f, p: &Point3f) -> Bounds3f {
    let p_min: Point3f = Point3f {
        x: b.p_min.x.min(p.x),
        y: b.p_min.y.min(p.y),
        z: b.p_min.z.min(p.z),
    };
    let p_max: Point3f = Point3f {
        x: b.p_max.x.max(p.x),
        y: b.p_max.y.max(p.y),
        z: b.p_max.z.max(p.z),
    };
    Bounds3f { p_min, p_max }
}

/// Construct a new box that bounds the space encompassed by two other
/// bounding boxes.
pub fn bnd3_union_bnd3f(b1: &Bounds3f, b2: &Bounds3f) -> Bounds3f {
    let p_min: Point3f = Point3f {
        x: b1.p_min.x.min(b2.p_min.x),
        y: b1.p_min.y.min(b2.p_min.y),
        z: b1.p_min.z.min(b2.p_min.z),
    };
    let p_max: Point3f = Point3f {
        x: b1.p_max.x.max(b2.p_max.x),
        y: b1.p_max.y.max(b2.p_max.y),
        z: b1.p_max.z.max(b2.p_max.z),
    };
    Bounds3f { p_min, p_max }
}

/// Determine if a given point is inside the bounding box.
pub fn pnt3_inside_bnd3(p: &Point3f, b: &Bounds3f) -> bool {
    p.x >= b.p_min.x
        && p.x <= b.p_max.x
        && p.y >= b.p_min.y
        && p.y <= b.p_max.y
        && p.z >= b.p_min.z
        && p.z <= b.p_max.z
}

/// Pads the bounding box by a constant margin in all dimensions.
///
/// Construction expands every node box this way so that rays grazing
/// an exactly axis-aligned face are not lost to floating-point error.
pub fn bnd3_expand(b: &Bounds3f, delta: Float) -> Bounds3f {
    Bounds3f::new(
        b.p_min
            - Vector3f {
                x: delta,
                y: delta,
                z: delta,
            },
        b.p_max
            + Vector3f {
                x: delta,
                y: delta,
                z: delta,
            },
    )
}

/// A semi-infinite line with a running best-hit bound.
///
/// `t_max` starts at infinity ("no hit") and is tightened by the
/// traversal whenever a strictly closer intersection is found. A ray
/// is query-scoped: each query constructs a fresh one.
#[derive(Debug, Default, Clone)]
pub struct Ray {
    /// origin
    pub o: Point3f,
    /// direction
    pub d: Vector3f,
    /// limits the ray to a segment along its infinite extent
    pub t_max: Cell<Float>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f) -> Self {
        Ray {
            o,
            d,
            t_max: Cell::new(std::f32::INFINITY),
        }
    }
    pub fn position(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}
