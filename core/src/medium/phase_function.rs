//! Phase Function

use crate::base::*;
use crate::geometry::*;
use std::fmt;

/// Models scattering properties in volumetric media. Directions follow the
/// usual convention: `wo` points back along the incoming path and `wi` is the
/// scattered direction, both leaving the scattering point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PhaseFunction {
    /// Uniform scattering over the sphere.
    Isotropic,

    /// Henyey-Greenstein lobe with asymmetry parameter `g`.
    HenyeyGreenstein { g: Float },
}

impl PhaseFunction {
    /// Returns the value of the phase function for the given pair of directions.
    ///
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    pub fn p(&self, wo: &Vector3f, wi: &Vector3f) -> Float {
        match self {
            Self::Isotropic => INV_FOUR_PI,
            Self::HenyeyGreenstein { g } => phase_hg(wo.dot(wi), *g),
        }
    }

    /// Returns the phase function value and sampled incident direction given
    /// the outgoing direction and a sample value in [0, 1)^2. The value is
    /// also the sampling density.
    ///
    /// * `wo` - Outgoing direction.
    /// * `u`  - Sample value in [0, 1)^2.
    pub fn sample_p(&self, wo: &Vector3f, u: &Point2f) -> (Float, Vector3f) {
        let g = match self {
            Self::Isotropic => 0.0,
            Self::HenyeyGreenstein { g } => *g,
        };

        // Cosine with the propagation direction -wo.
        let cos_theta = if abs(g) < 1e-3 {
            1.0 - 2.0 * u.x
        } else {
            let sqr_term = (1.0 - g * g) / (1.0 - g + 2.0 * g * u.x);
            (1.0 + g * g - sqr_term * sqr_term) / (2.0 * g)
        };
        let cos_theta = clamp(cos_theta, -1.0, 1.0);
        let sin_theta = safe_sqrt(1.0 - cos_theta * cos_theta);
        let phi = TWO_PI * u.y;

        let frame = Frame::new(&-*wo);
        let wi = frame.to_world(&Vector3f::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta));
        (self.p(wo, &wi), wi)
    }
}

impl Default for PhaseFunction {
    fn default() -> Self {
        Self::Isotropic
    }
}

impl fmt::Display for PhaseFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isotropic => write!(f, "[PhaseFunction isotropic]"),
            Self::HenyeyGreenstein { g } => write!(f, "[PhaseFunction hg g: {}]", g),
        }
    }
}

/// Computes the Henyey-Greenstein phase function.
///
/// * `cos_theta` - Cosine between `wo` and `wi`.
/// * `g`         - Asymmetry parameter.
#[inline]
pub fn phase_hg(cos_theta: Float, g: Float) -> Float {
    let denom = 1.0 + g * g + 2.0 * g * cos_theta;
    INV_FOUR_PI * (1.0 - g * g) / (denom * safe_sqrt(denom))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
