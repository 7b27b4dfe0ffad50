//! 3-D Axis Aligned Bounding Boxes.

use super::{max, min, Axis, Float, Point3f, Ray, Union, Vector3f, INFINITY};
use std::ops::Index;

/// 3-D Axis Aligned Bounding Box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3f {
    /// Minimum bounds.
    pub p_min: Point3f,

    /// Maximum bounds.
    pub p_max: Point3f,
}

impl Bounds3f {
    /// A box that contains nothing. Unions with it return the other operand.
    pub const EMPTY: Self = Self {
        p_min: Point3f::new(INFINITY, INFINITY, INFINITY),
        p_max: Point3f::new(-INFINITY, -INFINITY, -INFINITY),
    };

    /// Creates a new bounding box from 2 points. The minimum and maximum
    /// bounds are used for each coordinate axis.
    ///
    /// * `p1` - First point.
    /// * `p2` - Second point.
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Self {
            p_min: p1.min(&p2),
            p_max: p1.max(&p2),
        }
    }

    /// Returns true if the box contains nothing.
    pub fn is_empty(&self) -> bool {
        self.p_max.x < self.p_min.x || self.p_max.y < self.p_min.y || self.p_max.z < self.p_min.z
    }

    /// Returns the vector along the box diagonal from the minimum point to
    /// the maximum point.
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }

    /// Returns the surface area of the bounding box.
    pub fn surface_area(&self) -> Float {
        if self.is_empty() {
            0.0
        } else {
            let d = self.diagonal();
            2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
        }
    }

    /// Returns the index of which of the axes is longest.
    pub fn maximum_extent(&self) -> Axis {
        self.diagonal().max_dimension()
    }

    /// Returns the continuous position of a point relative to the corners of the
    /// box, where a point at the minimum corner has offset `(0, 0, 0)` and a
    /// point at the maximum corner has offset is `(1, 1, 1)`.
    ///
    /// * `p` - The point.
    pub fn offset(&self, p: &Point3f) -> Vector3f {
        let mut o = *p - self.p_min;
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            if self.p_max[axis] > self.p_min[axis] {
                o[axis] /= self.p_max[axis] - self.p_min[axis];
            }
        }
        o
    }

    /// Returns true if a point is inside the bounding box.
    ///
    /// * `p` - The point.
    pub fn contains(&self, p: &Point3f) -> bool {
        (p.x >= self.p_min.x && p.x <= self.p_max.x)
            && (p.y >= self.p_min.y && p.y <= self.p_max.y)
            && (p.z >= self.p_min.z && p.z <= self.p_max.z)
    }

    /// Return the center and radius of a sphere bounded on the corners of the
    /// bounding box.
    pub fn bounding_sphere(&self) -> (Point3f, Float) {
        if self.is_empty() {
            return (Point3f::zero(), 0.0);
        }
        let center = (self.p_min + self.p_max) * 0.5;
        (center, center.distance(&self.p_max))
    }

    /// Pad the bounding box by a constant factor in all dimensions.
    ///
    /// * `delta` - Padding amount.
    pub fn expand(&self, delta: Float) -> Self {
        let d = Vector3f::new(delta, delta, delta);
        Self {
            p_min: self.p_min - d,
            p_max: self.p_max + d,
        }
    }

    /// Returns the squared distance from a point to the box, zero inside.
    ///
    /// * `p` - The point.
    pub fn distance_squared(&self, p: &Point3f) -> Float {
        let dx = max(0.0, max(self.p_min.x - p.x, p.x - self.p_max.x));
        let dy = max(0.0, max(self.p_min.y - p.y, p.y - self.p_max.y));
        let dz = max(0.0, max(self.p_min.z - p.z, p.z - self.p_max.z));
        dx * dx + dy * dy + dz * dz
    }

    /// Returns the parametric range `[t0, t1]` where a ray overlaps the box,
    /// clipped to `[0, ray.t_max]`.
    ///
    /// * `ray` - The ray.
    pub fn intersect_p(&self, ray: &Ray) -> Option<(Float, Float)> {
        let mut t0: Float = 0.0;
        let mut t1 = ray.t_max;
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let inv_dir = 1.0 / ray.d[axis];
            let mut t_near = (self.p_min[axis] - ray.o[axis]) * inv_dir;
            let mut t_far = (self.p_max[axis] - ray.o[axis]) * inv_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            // NaN from 0 * inf keeps the previous bound.
            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Slab test using precomputed reciprocal direction, as used by BVH
    /// traversal.
    ///
    /// * `ray`        - The ray.
    /// * `inv_dir`    - Reciprocal of the ray direction.
    /// * `dir_is_neg` - Whether each direction component is negative.
    pub fn intersect_p_inv(&self, ray: &Ray, inv_dir: &Vector3f, dir_is_neg: [usize; 3]) -> bool {
        let mut t_min = (self[dir_is_neg[0]].x - ray.o.x) * inv_dir.x;
        let mut t_max = (self[1 - dir_is_neg[0]].x - ray.o.x) * inv_dir.x;
        let ty_min = (self[dir_is_neg[1]].y - ray.o.y) * inv_dir.y;
        let ty_max = (self[1 - dir_is_neg[1]].y - ray.o.y) * inv_dir.y;
        if t_min > ty_max || ty_min > t_max {
            return false;
        }
        t_min = max(t_min, ty_min);
        t_max = min(t_max, ty_max);

        let tz_min = (self[dir_is_neg[2]].z - ray.o.z) * inv_dir.z;
        let tz_max = (self[1 - dir_is_neg[2]].z - ray.o.z) * inv_dir.z;
        if t_min > tz_max || tz_min > t_max {
            return false;
        }
        t_min = max(t_min, tz_min);
        t_max = min(t_max, tz_max);

        t_min < ray.t_max && t_max > 0.0
    }
}

impl Default for Bounds3f {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<Point3f> for Bounds3f {
    /// Use a 3-D point as minimum and maximum 3-D bounds.
    ///
    /// * `p` - 3-D point.
    fn from(p: Point3f) -> Self {
        Self { p_min: p, p_max: p }
    }
}

impl Index<usize> for Bounds3f {
    type Output = Point3f;

    /// Index the minimum and maximum bounds.
    ///
    /// * `i` - 0 for minimum and 1 for maximum.
    fn index(&self, i: usize) -> &Self::Output {
        match i {
            0 => &self.p_min,
            _ => &self.p_max,
        }
    }
}

impl Union<Point3f> for Bounds3f {
    /// Return a bounding box containing the itself and a point.
    ///
    /// * `other` - The point.
    fn union(&self, other: &Point3f) -> Self {
        Self {
            p_min: self.p_min.min(other),
            p_max: self.p_max.max(other),
        }
    }
}

impl Union<Bounds3f> for Bounds3f {
    /// Return a bounding box containing both bounding boxes.
    ///
    /// * `other` - The other bounding box.
    fn union(&self, other: &Bounds3f) -> Self {
        Self {
            p_min: self.p_min.min(&other.p_min),
            p_max: self.p_max.max(&other.p_max),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Bounds3f {
        Bounds3f::new(Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn empty_union_is_identity() {
        let b = unit_box();
        assert_eq!(Bounds3f::EMPTY.union(&b), b);
        assert!(Bounds3f::EMPTY.is_empty());
        assert_eq!(Bounds3f::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn ray_overlap_range() {
        let r = Ray::unbounded(Point3f::new(-1.0, 0.5, 0.5), Vector3f::new(1.0, 0.0, 0.0));
        let (t0, t1) = unit_box().intersect_p(&r).unwrap();
        assert_eq!((t0, t1), (1.0, 2.0));

        let inside = Ray::unbounded(Point3f::new(0.5, 0.5, 0.5), Vector3f::new(0.0, 0.0, 1.0));
        assert_eq!(unit_box().intersect_p(&inside), Some((0.0, 0.5)));

        let miss = Ray::unbounded(Point3f::new(-1.0, 2.0, 0.5), Vector3f::new(1.0, 0.0, 0.0));
        assert!(unit_box().intersect_p(&miss).is_none());
    }

    #[test]
    fn slab_test_agrees_with_overlap() {
        let r = Ray::unbounded(Point3f::new(-1.0, 0.5, 0.5), Vector3f::new(1.0, 0.1, 0.0).normalize());
        let inv_dir = Vector3f::new(1.0 / r.d.x, 1.0 / r.d.y, 1.0 / r.d.z);
        let neg = [(inv_dir.x < 0.0) as usize, (inv_dir.y < 0.0) as usize, (inv_dir.z < 0.0) as usize];
        assert_eq!(unit_box().intersect_p_inv(&r, &inv_dir, neg), unit_box().intersect_p(&r).is_some());
    }

    #[test]
    fn point_distance() {
        let b = unit_box();
        assert_eq!(b.distance_squared(&Point3f::new(0.5, 0.5, 0.5)), 0.0);
        assert_eq!(b.distance_squared(&Point3f::new(3.0, 0.5, 0.5)), 4.0);
        assert!(b.contains(&Point3f::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn bounding_sphere_covers_corners() {
        let (c, r) = unit_box().bounding_sphere();
        assert_eq!(c, Point3f::new(0.5, 0.5, 0.5));
        assert!((r - (0.75 as Float).sqrt()).abs() < 1e-6);
    }
}
