//! Emitters

use crate::base::*;
use crate::geometry::*;
use crate::sampling::*;
use crate::shape::*;
use crate::spectrum::*;

mod light_type;

// Re-export
pub use light_type::*;

/// A ray leaving an emitter together with the flux it carries.
#[derive(Copy, Clone, Debug)]
pub struct EmitterRay {
    /// Ray leaving the emitter.
    pub ray: Ray,

    /// Point on the emitter.
    pub position: Point3f,

    /// Emitter surface normal. `None` for point emitters.
    pub normal: Option<Normal3f>,

    /// Flux carried by the particle, divided by the sampling densities.
    pub flux: Spectrum,
}

/// A sampled emitter point as seen from a receiving point.
#[derive(Copy, Clone, Debug)]
pub struct EmitterSample {
    /// Point on the emitter.
    pub position: Point3f,

    /// Normal at the point. `None` for point emitters.
    pub normal: Option<Normal3f>,

    /// Unit direction from the receiver towards the emitter.
    pub wi: Vector3f,

    /// Incident radiance (or intensity over squared distance for point
    /// emitters) divided by the solid angle density.
    pub weight: Spectrum,
}

/// Emitters supported by `SimpleScene`.
#[derive(Copy, Clone, Debug)]
pub enum Light {
    /// Diffuse area emitter bound to a scene object, emitting on the side of
    /// the shape normal.
    Area { object: usize, shape: Shape, radiance: Spectrum },

    /// Isotropic point emitter.
    Point { position: Point3f, intensity: Spectrum },
}

impl Light {
    /// Returns the emitter type flags.
    pub fn light_type(&self) -> LightType {
        match self {
            Self::Area { .. } => LightType::AREA_LIGHT,
            Self::Point { .. } => LightType::DELTA_POSITION_LIGHT,
        }
    }

    /// Returns the total emitted power.
    pub fn power(&self) -> Spectrum {
        match self {
            Self::Area { shape, radiance, .. } => *radiance * (shape.area() * PI),
            Self::Point { intensity, .. } => *intensity * FOUR_PI,
        }
    }

    /// Samples a particle leaving the emitter.
    ///
    /// * `u_pos` - Sample for the position.
    /// * `u_dir` - Sample for the direction.
    pub fn sample_ray(&self, u_pos: &Point2f, u_dir: &Point2f) -> EmitterRay {
        match self {
            Self::Area { shape, radiance, .. } => {
                let (p, n) = shape.sample(u_pos);
                let d = Frame::new(&n).to_world(&cosine_sample_hemisphere(u_dir));
                EmitterRay {
                    ray: Ray::spawn(&p, &n, &d),
                    position: p,
                    normal: Some(n),
                    flux: *radiance * (shape.area() * PI),
                }
            }
            Self::Point { position, intensity } => {
                let d = uniform_sample_sphere(u_dir);
                EmitterRay {
                    ray: Ray::unbounded(*position, d),
                    position: *position,
                    normal: None,
                    flux: *intensity / uniform_sphere_pdf(),
                }
            }
        }
    }

    /// Samples a point on the emitter for direct lighting at a receiver.
    /// Returns `None` when the sampled point does not face the receiver.
    ///
    /// * `reference` - Receiving point.
    /// * `u`         - Sample value in [0, 1)^2.
    pub fn sample_li(&self, reference: &Point3f, u: &Point2f) -> Option<EmitterSample> {
        match self {
            Self::Area { shape, radiance, .. } => {
                let (p, n) = shape.sample(u);
                let d = p - *reference;
                let dist2 = d.length_squared();
                if dist2 == 0.0 {
                    return None;
                }
                let wi = d / dist2.sqrt();
                let cos_l = -wi.dot(&n);
                if cos_l <= 0.0 {
                    return None;
                }
                Some(EmitterSample {
                    position: p,
                    normal: Some(n),
                    wi,
                    weight: *radiance * (cos_l * shape.area() / dist2),
                })
            }
            Self::Point { position, intensity } => {
                let d = *position - *reference;
                let dist2 = d.length_squared();
                if dist2 == 0.0 {
                    return None;
                }
                Some(EmitterSample {
                    position: *position,
                    normal: None,
                    wi: d / dist2.sqrt(),
                    weight: *intensity / dist2,
                })
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ceiling_light() -> Light {
        Light::Area {
            object: 0,
            shape: Shape::quad(
                Point3f::new(-0.5, 1.0, -0.5),
                Vector3f::new(1.0, 0.0, 0.0),
                Vector3f::new(0.0, 0.0, 1.0),
            ),
            radiance: Spectrum::new(2.0),
        }
    }

    #[test]
    fn area_power_is_radiance_times_pi_area() {
        assert!((ceiling_light().power()[0] - 2.0 * PI).abs() < 1e-5);
        assert!(ceiling_light().light_type().matches(LightType::AREA_LIGHT));
    }

    #[test]
    fn emitted_rays_leave_front_side() {
        let light = ceiling_light();
        let er = light.sample_ray(&Point2f::new(0.3, 0.7), &Point2f::new(0.2, 0.9));
        assert!(er.ray.d.dot(&er.normal.unwrap()) > 0.0);
        assert!(er.ray.d.y < 0.0);
    }

    #[test]
    fn receiver_behind_emitter_gets_nothing() {
        let light = ceiling_light();
        assert!(light.sample_li(&Point3f::new(0.0, 2.0, 0.0), &Point2f::new(0.5, 0.5)).is_none());
        let s = light.sample_li(&Point3f::new(0.0, 0.0, 0.0), &Point2f::new(0.5, 0.5)).unwrap();
        assert!((s.weight[0] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn point_light_falls_off() {
        let light = Light::Point {
            position: Point3f::new(0.0, 2.0, 0.0),
            intensity: Spectrum::new(4.0),
        };
        let s = light.sample_li(&Point3f::zero(), &Point2f::new(0.0, 0.0)).unwrap();
        assert_eq!(s.weight, Spectrum::new(1.0));
        assert!(light.light_type().is_delta_light());
    }
}
