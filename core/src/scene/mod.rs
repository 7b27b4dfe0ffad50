//! Scene

use crate::base::*;
use crate::camera::*;
use crate::geometry::*;
use crate::interaction::*;
use crate::light::*;
use crate::medium::*;
use crate::sampling::*;
use crate::spectrum::*;

mod demo;
mod simple;

// Re-export
pub use demo::*;
pub use simple::*;

/// Scene queries used by the integrators.
pub trait Scene: Send + Sync {
    /// Traces the ray into the scene and returns the closest surface hit.
    ///
    /// * `ray` - The ray to trace.
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction>;

    /// Returns true if the ray hits any surface before `ray.t_max`.
    ///
    /// * `ray` - The ray to trace.
    fn intersect_p(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }

    /// Returns all emitters.
    fn lights(&self) -> &[Light];

    /// Returns the emitter selection distribution, proportional to power.
    fn light_distribution(&self) -> &Distribution1D;

    /// Returns the participating medium, if any.
    fn medium(&self) -> Option<&dyn Medium>;

    /// Returns the sensor.
    fn sensor(&self) -> &dyn Sensor;

    /// Returns the bounds of the scene geometry, media and sensor.
    fn bounds(&self) -> Bounds3f;

    /// Returns true if two points see each other. Media do not occlude.
    ///
    /// * `p0` - First point.
    /// * `p1` - Second point.
    fn visible(&self, p0: &Point3f, p1: &Point3f) -> bool {
        match Ray::segment(p0, p1) {
            Some(ray) => !self.intersect_p(&ray),
            None => true,
        }
    }

    /// Returns the medium transmittance between two points.
    ///
    /// * `p0` - First point.
    /// * `p1` - Second point.
    fn transmittance(&self, p0: &Point3f, p1: &Point3f) -> Spectrum {
        match self.medium() {
            Some(medium) => {
                let d = *p1 - *p0;
                let dist = d.length();
                if dist == 0.0 {
                    return Spectrum::ONE;
                }
                medium.ray_transmittance(&Ray::new(*p0, d / dist, dist))
            }
            None => Spectrum::ONE,
        }
    }

    /// Samples an emitter proportionally to power and a particle leaving it.
    /// The flux is divided by the emitter selection probability.
    ///
    /// * `u_light` - Sample for the emitter choice.
    /// * `u_pos`   - Sample for the position.
    /// * `u_dir`   - Sample for the direction.
    fn sample_emitter_ray(&self, u_light: Float, u_pos: &Point2f, u_dir: &Point2f) -> Option<(usize, EmitterRay)> {
        if self.lights().is_empty() {
            return None;
        }
        let (index, pdf, _) = self.light_distribution().sample_discrete(u_light);
        if pdf == 0.0 {
            return None;
        }
        let mut er = self.lights()[index].sample_ray(u_pos, u_dir);
        er.flux /= pdf;
        Some((index, er))
    }

    /// Samples an emitter point for direct lighting at a receiver. The weight
    /// is divided by the emitter selection probability. Visibility is not
    /// tested.
    ///
    /// * `reference` - Receiving point.
    /// * `u_light`   - Sample for the emitter choice.
    /// * `u`         - Sample for the position.
    fn sample_emitter_position(&self, reference: &Point3f, u_light: Float, u: &Point2f) -> Option<(usize, EmitterSample)> {
        if self.lights().is_empty() {
            return None;
        }
        let (index, pdf, _) = self.light_distribution().sample_discrete(u_light);
        if pdf == 0.0 {
            return None;
        }
        let mut s = self.lights()[index].sample_li(reference, u)?;
        s.weight /= pdf;
        Some((index, s))
    }
}
