//! Participating media

use crate::base::*;
use crate::geometry::*;
use crate::spectrum::*;

mod homogeneous;
mod phase_function;

// Re-exports
pub use homogeneous::*;
pub use phase_function::*;

/// Result of sampling a free-flight distance along a ray.
#[derive(Copy, Clone, Debug)]
pub struct MediumSample {
    /// Ray parameter of the sampled event. `ray.t_max` when the ray passed
    /// through the medium.
    pub t: Float,

    /// True when a scattering event was sampled inside the medium.
    pub scattered: bool,

    /// Throughput weight: `sigma_s * Tr / pdf` when scattered, `Tr / pdf`
    /// otherwise.
    pub weight: Spectrum,

    /// Density of the sampled event.
    pub pdf: Float,

    /// Distance travelled inside the medium up to the event.
    pub in_medium: Float,
}

/// Medium trait to handle volumetric scattering properties.
pub trait Medium: Send + Sync {
    /// Returns the region filled by the medium.
    fn bounds(&self) -> Bounds3f;

    /// Returns the scattering coefficient.
    fn sigma_s(&self) -> Spectrum;

    /// Returns the extinction coefficient.
    fn sigma_t(&self) -> Spectrum;

    /// Returns the phase function.
    fn phase(&self) -> &PhaseFunction;

    /// Returns the parametric range of a ray inside the medium.
    ///
    /// * `ray` - The ray.
    fn overlap(&self, ray: &Ray) -> Option<(Float, Float)>;

    /// Returns the transmittance over a distance inside the medium.
    ///
    /// * `distance` - Distance travelled inside the medium.
    fn transmittance(&self, distance: Float) -> Spectrum;

    /// Returns the beam transmittance along a ray up to `ray.t_max`.
    ///
    /// * `ray` - The ray.
    fn ray_transmittance(&self, ray: &Ray) -> Spectrum {
        match self.overlap(ray) {
            Some((t0, t1)) => self.transmittance((t1 - t0) * ray.d.length()),
            None => Spectrum::ONE,
        }
    }

    /// Samples a free-flight distance along a ray with a unit direction.
    ///
    /// * `ray` - The ray.
    /// * `u`   - Sample value in [0, 1).
    fn sample_distance(&self, ray: &Ray, u: Float) -> MediumSample;

    /// Returns the density of `sample_distance` for a given distance inside
    /// the medium.
    ///
    /// * `distance`  - Distance travelled inside the medium.
    /// * `scattered` - Whether the event is a scattering event or a pass through.
    fn pdf_distance(&self, distance: Float, scattered: bool) -> Float;

    /// Samples a distance in `[0, length]` proportionally to the
    /// transmittance. Returns the distance and its density.
    ///
    /// * `length` - Segment length.
    /// * `u`      - Sample value in [0, 1).
    fn sample_truncated(&self, length: Float, u: Float) -> (Float, Float);
}

