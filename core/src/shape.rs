//! Shapes

use crate::base::*;
use crate::geometry::*;
use crate::sampling::*;

/// Geometric primitives supported by `SimpleScene`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    /// Parallelogram `origin + a edge0 + b edge1` with `a, b` in [0, 1].
    Quad {
        origin: Point3f,
        edge0: Vector3f,
        edge1: Vector3f,
        normal: Normal3f,
    },

    /// Sphere.
    Sphere { center: Point3f, radius: Float },
}

impl Shape {
    /// Returns a quad. The normal is `normalize(edge0 x edge1)`.
    ///
    /// * `origin` - Corner.
    /// * `edge0`  - First edge.
    /// * `edge1`  - Second edge.
    pub fn quad(origin: Point3f, edge0: Vector3f, edge1: Vector3f) -> Self {
        Self::Quad {
            origin,
            edge0,
            edge1,
            normal: edge0.cross(&edge1).normalize(),
        }
    }

    /// Returns a sphere.
    ///
    /// * `center` - Center.
    /// * `radius` - Radius.
    pub fn sphere(center: Point3f, radius: Float) -> Self {
        Self::Sphere { center, radius }
    }

    /// Returns the world space bounds.
    pub fn bounds(&self) -> Bounds3f {
        match self {
            Self::Quad { origin, edge0, edge1, .. } => Bounds3f::from(*origin)
                .union(&(*origin + *edge0))
                .union(&(*origin + *edge1))
                .union(&(*origin + *edge0 + *edge1)),
            Self::Sphere { center, radius } => Bounds3f::from(*center).expand(*radius),
        }
    }

    /// Returns the surface area.
    pub fn area(&self) -> Float {
        match self {
            Self::Quad { edge0, edge1, .. } => edge0.cross(edge1).length(),
            Self::Sphere { radius, .. } => FOUR_PI * radius * radius,
        }
    }

    /// Returns the closest hit in `(0, ray.t_max)` with its geometric normal.
    ///
    /// * `ray` - The ray.
    pub fn intersect(&self, ray: &Ray) -> Option<(Float, Normal3f)> {
        match self {
            Self::Quad {
                origin,
                edge0,
                edge1,
                normal,
            } => intersect_parallelogram(ray, origin, edge0, edge1)
                .filter(|(t, _, _)| *t < ray.t_max)
                .map(|(t, _, _)| (t, *normal)),
            Self::Sphere { center, radius } => {
                let oc = ray.o - *center;
                let a = ray.d.length_squared();
                let b = oc.dot(&ray.d);
                let c = oc.length_squared() - radius * radius;
                let disc = b * b - a * c;
                if disc < 0.0 {
                    return None;
                }
                let root = disc.sqrt();
                let near = (-b - root) / a;
                let far = (-b + root) / a;
                let t = if near > 0.0 { near } else { far };
                if t <= 0.0 || t >= ray.t_max {
                    return None;
                }
                Some((t, (ray.at(t) - *center).normalize()))
            }
        }
    }

    /// Samples a point uniformly over the surface area.
    ///
    /// * `u` - Sample value in [0, 1)^2.
    pub fn sample(&self, u: &Point2f) -> (Point3f, Normal3f) {
        match self {
            Self::Quad {
                origin,
                edge0,
                edge1,
                normal,
            } => (*origin + *edge0 * u.x + *edge1 * u.y, *normal),
            Self::Sphere { center, radius } => {
                let n = uniform_sample_sphere(u);
                (*center + n * *radius, n)
            }
        }
    }
}

/// Intersects a ray with the parallelogram `p0 + a e0 + b e1`, `a, b` in
/// [0, 1]. Returns `(t, a, b)` for hits with `t > 0`.
///
/// * `ray` - The ray.
/// * `p0`  - Corner.
/// * `e0`  - First edge.
/// * `e1`  - Second edge.
pub fn intersect_parallelogram(ray: &Ray, p0: &Point3f, e0: &Vector3f, e1: &Vector3f) -> Option<(Float, Float, Float)> {
    let pvec = ray.d.cross(e1);
    let det = e0.dot(&pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.o - *p0;
    let a = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&a) {
        return None;
    }
    let qvec = tvec.cross(e0);
    let b = ray.d.dot(&qvec) * inv_det;
    if !(0.0..=1.0).contains(&b) {
        return None;
    }
    let t = e1.dot(&qvec) * inv_det;
    if t <= 0.0 {
        return None;
    }
    Some((t, a, b))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
