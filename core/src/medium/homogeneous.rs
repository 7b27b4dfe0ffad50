//! Homogeneous Medium

use super::*;

/// A medium with constant coefficients filling an axis aligned box. The box
/// is not a surface; rays enter and leave it without scattering.
#[derive(Clone, Debug)]
pub struct HomogeneousMedium {
    /// Absorption coefficient.
    pub sigma_a: Spectrum,

    /// Scattering coefficient.
    pub sigma_s: Spectrum,

    /// Extinction coefficient.
    pub sigma_t: Spectrum,

    /// Phase function.
    pub phase: PhaseFunction,

    /// Region filled by the medium.
    pub bounds: Bounds3f,
}

impl HomogeneousMedium {
    /// Returns a new `HomogeneousMedium`.
    ///
    /// * `sigma_a` - Absorption coefficient.
    /// * `sigma_s` - Scattering coefficient.
    /// * `phase`   - Phase function.
    /// * `bounds`  - Region filled by the medium.
    pub fn new(sigma_a: Spectrum, sigma_s: Spectrum, phase: PhaseFunction, bounds: Bounds3f) -> Self {
        Self {
            sigma_a,
            sigma_s,
            sigma_t: sigma_a + sigma_s,
            phase,
            bounds,
        }
    }

    /// Channel averaged extinction used for distance sampling.
    fn sigma_sample(&self) -> Float {
        self.sigma_t.average()
    }
}

impl Medium for HomogeneousMedium {
    fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    fn sigma_s(&self) -> Spectrum {
        self.sigma_s
    }

    fn sigma_t(&self) -> Spectrum {
        self.sigma_t
    }

    fn phase(&self) -> &PhaseFunction {
        &self.phase
    }

    fn overlap(&self, ray: &Ray) -> Option<(Float, Float)> {
        self.bounds.intersect_p(ray).filter(|(t0, t1)| t1 > t0)
    }

    fn transmittance(&self, distance: Float) -> Spectrum {
        (-self.sigma_t * max(0.0, distance)).exp()
    }

    fn sample_distance(&self, ray: &Ray, u: Float) -> MediumSample {
        let (t0, t1) = match self.overlap(ray) {
            Some(range) => range,
            None => {
                return MediumSample {
                    t: ray.t_max,
                    scattered: false,
                    weight: Spectrum::ONE,
                    pdf: 1.0,
                    in_medium: 0.0,
                }
            }
        };

        let sigma = self.sigma_sample();
        let span = t1 - t0;
        let d = if sigma > 0.0 {
            -(1.0 - u).ln() / sigma
        } else {
            INFINITY
        };

        if d < span {
            let pdf = self.pdf_distance(d, true);
            let weight = self.sigma_s * self.transmittance(d) / pdf;
            MediumSample {
                t: t0 + d,
                scattered: true,
                weight,
                pdf,
                in_medium: d,
            }
        } else {
            let pdf = self.pdf_distance(span, false);
            MediumSample {
                t: ray.t_max,
                scattered: false,
                weight: self.transmittance(span) / pdf,
                pdf,
                in_medium: span,
            }
        }
    }

    fn pdf_distance(&self, distance: Float, scattered: bool) -> Float {
        let sigma = self.sigma_sample();
        let survive = (-sigma * distance).exp();
        if scattered {
            sigma * survive
        } else {
            survive
        }
    }

    fn sample_truncated(&self, length: Float, u: Float) -> (Float, Float) {
        let sigma = self.sigma_sample();
        if sigma <= 0.0 || length <= 0.0 {
            return (u * length, if length > 0.0 { 1.0 / length } else { 0.0 });
        }
        let norm = 1.0 - (-sigma * length).exp();
        let t = min(-(1.0 - u * norm).ln() / sigma, length);
        (t, sigma * (-sigma * t).exp() / norm)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
