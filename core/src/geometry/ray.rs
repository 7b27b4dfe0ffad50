//! Rays

use super::{Dot, Float, Point3f, Vector3f, INFINITY, SHADOW_EPSILON};

/// A Ray
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    /// Origin.
    pub o: Point3f,

    /// Direction.
    pub d: Vector3f,

    /// Maximum extent of the ray.
    pub t_max: Float,
}

impl Ray {
    /// Returns a ray.
    ///
    /// * `o`     - Origin.
    /// * `d`     - Direction.
    /// * `t_max` - Maximum extent of the ray.
    pub fn new(o: Point3f, d: Vector3f, t_max: Float) -> Self {
        Self { o, d, t_max }
    }

    /// Returns an unbounded ray.
    ///
    /// * `o` - Origin.
    /// * `d` - Direction.
    pub fn unbounded(o: Point3f, d: Vector3f) -> Self {
        Self::new(o, d, INFINITY)
    }

    /// Returns a ray leaving a surface point. The origin is pushed off the
    /// surface on the side the direction points to.
    ///
    /// * `p` - Surface point.
    /// * `n` - Geometric normal.
    /// * `d` - Direction.
    pub fn spawn(p: &Point3f, n: &Vector3f, d: &Vector3f) -> Self {
        Self::unbounded(offset_origin(p, n, d), *d)
    }

    /// Returns a shadow ray between two points, shortened on both ends so
    /// that surfaces at the end points are not reported.
    ///
    /// * `p0` - Start point.
    /// * `p1` - End point.
    pub fn segment(p0: &Point3f, p1: &Point3f) -> Option<Self> {
        let d = *p1 - *p0;
        let dist = d.length();
        if dist <= 2.0 * SHADOW_EPSILON {
            return None;
        }
        let d = d / dist;
        Some(Self::new(*p0 + d * SHADOW_EPSILON, d, dist - 2.0 * SHADOW_EPSILON))
    }

    /// Returns the point at a given distance along the ray.
    ///
    /// * `t` - The parameter.
    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}

/// Offsets a point along the normal towards the side of `d`.
///
/// * `p` - The point.
/// * `n` - The normal.
/// * `d` - Direction used to pick the side.
pub fn offset_origin(p: &Point3f, n: &Vector3f, d: &Vector3f) -> Point3f {
    if d.dot(n) >= 0.0 {
        *p + *n * SHADOW_EPSILON
    } else {
        *p - *n * SHADOW_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_is_shortened() {
        let r = Ray::segment(&Point3f::new(0.0, 0.0, 0.0), &Point3f::new(0.0, 0.0, 2.0)).unwrap();
        assert!(r.t_max < 2.0 && r.t_max > 1.99);
        assert!(r.o.z > 0.0);
        assert!(Ray::segment(&Point3f::zero(), &Point3f::zero()).is_none());
    }

    #[test]
    fn spawn_offsets_towards_direction() {
        let n = Vector3f::new(0.0, 1.0, 0.0);
        let up = Ray::spawn(&Point3f::zero(), &n, &n);
        let down = Ray::spawn(&Point3f::zero(), &n, &-n);
        assert!(up.o.y > 0.0);
        assert!(down.o.y < 0.0);
        assert_eq!(up.at(1.0).y, up.o.y + 1.0);
    }
}
