//! BSDF

use super::*;

/// Result of sampling a BSDF.
#[derive(Copy, Clone, Debug)]
pub struct BSDFSample {
    /// Sampled direction leaving the surface.
    pub wi: Vector3f,

    /// BSDF value for the pair of directions. For delta lobes this already
    /// includes the reciprocal cosine so that `f |cos| / pdf` is the lobe albedo.
    pub f: Spectrum,

    /// Sampling density. 1 for delta lobes.
    pub pdf: Float,

    /// Type of the lobe that was sampled.
    pub sampled_type: BxDFType,
}

impl BSDFSample {
    /// Returns the throughput weight `f |cos| / pdf`.
    ///
    /// * `n` - Shading normal.
    pub fn weight(&self, n: &Normal3f) -> Spectrum {
        if self.pdf > 0.0 {
            self.f * self.wi.abs_dot(n) / self.pdf
        } else {
            Spectrum::ZERO
        }
    }
}

/// Reflection models supported by surfaces. Every model is one-sided in the
/// sense that both directions must lie in the hemisphere of `n`; callers pass
/// the normal facing `wo`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BSDF {
    /// Ideal diffuse reflection.
    Lambertian { reflectance: Spectrum },

    /// Perfect specular reflection.
    Mirror { reflectance: Spectrum },

    /// Energy normalised modified Phong lobe around the mirror direction.
    Glossy { reflectance: Spectrum, exponent: Float },
}

impl BSDF {
    /// Returns the lobe type.
    pub fn bxdf_type(&self) -> BxDFType {
        match self {
            Self::Lambertian { .. } => BxDFType::BSDF_REFLECTION | BxDFType::BSDF_DIFFUSE,
            Self::Mirror { .. } => BxDFType::BSDF_REFLECTION | BxDFType::BSDF_SPECULAR,
            Self::Glossy { .. } => BxDFType::BSDF_REFLECTION | BxDFType::BSDF_GLOSSY,
        }
    }

    /// Returns true for perfectly specular lobes.
    pub fn is_delta(&self) -> bool {
        matches!(self, Self::Mirror { .. })
    }

    /// Returns the roughness of the lobe: 0 for mirrors, 1 for diffuse and
    /// `sqrt(2 / (n + 2))` for Phong lobes.
    pub fn roughness(&self) -> Float {
        match self {
            Self::Lambertian { .. } => 1.0,
            Self::Mirror { .. } => 0.0,
            Self::Glossy { exponent, .. } => (2.0 / (exponent + 2.0)).sqrt(),
        }
    }

    /// Returns the reflectance.
    pub fn reflectance(&self) -> Spectrum {
        match self {
            Self::Lambertian { reflectance } | Self::Mirror { reflectance } | Self::Glossy { reflectance, .. } => {
                *reflectance
            }
        }
    }

    /// Returns the BSDF value for a pair of directions. Delta lobes return zero.
    ///
    /// * `n`  - Shading normal.
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    pub fn f(&self, n: &Normal3f, wo: &Vector3f, wi: &Vector3f) -> Spectrum {
        if wo.dot(n) <= 0.0 || wi.dot(n) <= 0.0 {
            return Spectrum::ZERO;
        }
        match self {
            Self::Lambertian { reflectance } => *reflectance * INV_PI,
            Self::Mirror { .. } => Spectrum::ZERO,
            Self::Glossy { reflectance, exponent } => {
                let cos_alpha = reflect(wo, n).dot(wi);
                if cos_alpha <= 0.0 {
                    Spectrum::ZERO
                } else {
                    *reflectance * ((exponent + 2.0) * INV_TWO_PI * cos_alpha.powf(*exponent))
                }
            }
        }
    }

    /// Returns the density of sampling `wi` given `wo`. Delta lobes return zero.
    ///
    /// * `n`  - Shading normal.
    /// * `wo` - Outgoing direction.
    /// * `wi` - Incident direction.
    pub fn pdf(&self, n: &Normal3f, wo: &Vector3f, wi: &Vector3f) -> Float {
        if wo.dot(n) <= 0.0 || wi.dot(n) <= 0.0 {
            return 0.0;
        }
        match self {
            Self::Lambertian { .. } => cosine_hemisphere_pdf(wi.dot(n)),
            Self::Mirror { .. } => 0.0,
            Self::Glossy { exponent, .. } => {
                let cos_alpha = reflect(wo, n).dot(wi);
                if cos_alpha <= 0.0 {
                    0.0
                } else {
                    (exponent + 1.0) * INV_TWO_PI * cos_alpha.powf(*exponent)
                }
            }
        }
    }

    /// Samples an incident direction. Returns `None` when the sample leaves
    /// the hemisphere of `n`.
    ///
    /// * `n`  - Shading normal.
    /// * `wo` - Outgoing direction.
    /// * `u`  - Sample value in [0, 1)^2.
    pub fn sample_f(&self, n: &Normal3f, wo: &Vector3f, u: &Point2f) -> Option<BSDFSample> {
        let cos_o = wo.dot(n);
        if cos_o <= 0.0 {
            return None;
        }
        match self {
            Self::Lambertian { .. } => {
                let wi = Frame::new(n).to_world(&cosine_sample_hemisphere(u));
                let pdf = self.pdf(n, wo, &wi);
                if pdf <= 0.0 {
                    return None;
                }
                Some(BSDFSample {
                    wi,
                    f: self.f(n, wo, &wi),
                    pdf,
                    sampled_type: self.bxdf_type(),
                })
            }
            Self::Mirror { reflectance } => {
                let wi = reflect(wo, n);
                Some(BSDFSample {
                    wi,
                    f: *reflectance / cos_o,
                    pdf: 1.0,
                    sampled_type: self.bxdf_type(),
                })
            }
            Self::Glossy { exponent, .. } => {
                let cos_alpha = u.x.powf(1.0 / (exponent + 1.0));
                let sin_alpha = safe_sqrt(1.0 - cos_alpha * cos_alpha);
                let phi = TWO_PI * u.y;
                let lobe = Frame::new(&reflect(wo, n));
                let wi = lobe.to_world(&Vector3f::new(sin_alpha * phi.cos(), sin_alpha * phi.sin(), cos_alpha));
                let pdf = self.pdf(n, wo, &wi);
                if pdf <= 0.0 {
                    return None;
                }
                Some(BSDFSample {
                    wi,
                    f: self.f(n, wo, &wi),
                    pdf,
                    sampled_type: self.bxdf_type(),
                })
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
