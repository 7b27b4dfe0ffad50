//! Interactions

use crate::base::*;
use crate::geometry::*;
use crate::reflection::*;
use crate::spectrum::*;

/// Geometry and material at a ray/surface intersection.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceInteraction {
    /// Hit point.
    pub p: Point3f,

    /// Geometric normal as defined by the shape.
    pub n: Normal3f,

    /// Ray parameter of the hit.
    pub t: Float,

    /// Index of the scene object that was hit.
    pub object: usize,

    /// Reflection model.
    pub bsdf: BSDF,

    /// Radiance emitted on the side of `n` if the object is an area emitter.
    pub emission: Option<Spectrum>,
}

impl SurfaceInteraction {
    /// Returns the normal flipped to the side of a direction.
    ///
    /// * `w` - The direction.
    pub fn facing_normal(&self, w: &Vector3f) -> Normal3f {
        if self.n.dot(w) < 0.0 {
            -self.n
        } else {
            self.n
        }
    }

    /// Returns the radiance emitted towards a direction leaving the surface.
    ///
    /// * `w` - The direction.
    pub fn le(&self, w: &Vector3f) -> Spectrum {
        match self.emission {
            Some(l) if self.n.dot(w) > 0.0 => l,
            _ => Spectrum::ZERO,
        }
    }

    /// Returns a ray leaving the surface.
    ///
    /// * `d` - Direction.
    pub fn spawn_ray(&self, d: &Vector3f) -> Ray {
        Ray::spawn(&self.p, &self.n, d)
    }
}
