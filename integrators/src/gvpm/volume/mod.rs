//! Volume density estimation

use super::camera_path::*;
use super::config::*;
use super::gather_point::*;
use super::photon::*;
use super::radius::*;
use super::shift::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;
use gvpm_core::medium::*;
use gvpm_core::sampler::*;
use gvpm_core::scene::*;
use gvpm_core::spectrum::*;

mod beam;
mod bre;
mod distance;
mod plane;

/// Kernel of the beam radiance estimate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreKernel {
    /// Disc kernel at the closest approach.
    Disc,

    /// Chord of a sphere kernel.
    Sphere,
}

/// Kernel of the beam-beam estimate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BeamKernel {
    /// 1D kernel.
    Segment,

    /// 3D kernel.
    Cylinder,
}

/// Volume estimator selected from the technique once per render.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VolumeEstimator {
    /// Point photons looked up at sampled distances.
    Distance,

    /// Camera rays against photon spheres.
    Bre { kernel: BreKernel },

    /// Camera rays against photon beams.
    Beam { kernel: BeamKernel, accelerated: bool },

    /// Camera rays against photon planes.
    Plane,
}

impl VolumeEstimator {
    /// Returns the estimator of a technique, `None` when volumes are not
    /// rendered.
    ///
    /// * `technique` - Volume technique.
    pub fn from_technique(technique: VolTechnique) -> Option<Self> {
        match technique {
            VolTechnique::None => None,
            VolTechnique::Distance => Some(Self::Distance),
            VolTechnique::Bre => Some(Self::Bre { kernel: BreKernel::Disc }),
            VolTechnique::Bre3D => Some(Self::Bre {
                kernel: BreKernel::Sphere,
            }),
            VolTechnique::Beam1D => Some(Self::Beam {
                kernel: BeamKernel::Segment,
                accelerated: true,
            }),
            VolTechnique::Beam3D => Some(Self::Beam {
                kernel: BeamKernel::Cylinder,
                accelerated: false,
            }),
            VolTechnique::Beam3DAcc => Some(Self::Beam {
                kernel: BeamKernel::Cylinder,
                accelerated: true,
            }),
            VolTechnique::Plane0D => Some(Self::Plane),
        }
    }

    /// Returns true if the estimator keeps a running mean over passes.
    pub fn is_apa(&self) -> bool {
        !matches!(self, Self::Distance)
    }
}

/// Read-only state shared by every gather point of a volume gathering phase.
pub struct VolumeContext<'a> {
    /// The scene.
    pub scene: &'a dyn Scene,

    /// Integrator settings.
    pub config: &'a GVPMConfig,

    /// The scene medium.
    pub medium: &'a dyn Medium,

    /// Volume photons, beams or planes of the pass.
    pub map: &'a VolumePhotonMap,

    /// Global kernel radius of the pass.
    pub radius: VolumeRadius,

    /// Estimator.
    pub estimator: VolumeEstimator,

    /// 1-based pass number.
    pub pass: usize,

    /// Volume particles traced this pass.
    pub shot_volume: usize,
}

/// Segment of a camera edge inside the medium.
#[derive(Copy, Clone, Debug)]
pub struct EdgeQuery<'a> {
    /// Index of the edge in the camera path.
    pub index: usize,

    /// The edge.
    pub edge: &'a CameraEdge,

    /// Entry distance.
    pub t0: Float,

    /// Exit distance.
    pub t1: Float,
}

impl<'a> EdgeQuery<'a> {
    /// Returns the number of camera segments up to a point on this edge.
    #[inline]
    pub fn camera_depth(&self) -> Int {
        self.index as Int + 1
    }

    /// Returns the camera weight of a point at distance `t`: throughput up
    /// to the edge times the transmittance to `t`.
    ///
    /// * `medium` - The medium.
    /// * `t`      - Distance along the edge.
    pub fn weight(&self, medium: &dyn Medium, t: Float) -> Spectrum {
        self.edge.throughput * self.edge.transmittance_to(medium, t)
    }

    /// Returns the camera ray restricted to the medium range.
    pub fn ray(&self) -> Ray {
        Ray::new(self.edge.origin, self.edge.d, self.t1)
    }
}

/// Returns the shifted camera edge that holds a point at the same distance
/// along it, or `None` if the shifted point is outside the medium.
///
/// * `sgp`   - Shifted gather point.
/// * `index` - Edge index.
/// * `t`     - Distance along the edge.
pub fn shifted_edge(sgp: &ShiftGatherPoint, index: usize, t: Float) -> Option<&CameraEdge> {
    sgp.edge(index).filter(|e| e.in_medium(t) && t < e.length)
}

/// Returns a photon standing for a point on a beam or plane, so the light
/// side shift can reconnect it to the vertex it leaves from.
///
/// * `position` - Point on the primitive.
/// * `wi`       - Direction towards the vertex.
/// * `flux`     - Flux.
/// * `depth`    - Number of light segments.
/// * `parent`   - Vertex the primitive leaves from.
pub fn light_point(position: Point3f, wi: Vector3f, flux: Spectrum, depth: Int, parent: LightVertex) -> Photon {
    Photon {
        position,
        normal: None,
        wi,
        flux,
        depth,
        parent,
        grandparent: None,
    }
}

/// Gathers the medium contributions along the camera path of a gather point
/// and accumulates them.
///
/// * `ctx`     - Phase context.
/// * `gp`      - The gather point.
/// * `shifts`  - Shifted gather points of the pass.
/// * `stats`   - Shift counters.
/// * `sampler` - Sampler of the tile.
pub fn gather_volume(
    ctx: &VolumeContext,
    gp: &mut GatherPoint,
    shifts: &ShiftSet,
    stats: &mut ShiftStats,
    sampler: &mut dyn Sampler,
) {
    let mut rec = GradientRecord::default();
    let scale_vol = gp.scale_vol;
    if !ctx.map.is_empty() {
        for (index, edge) in gp.path.edges.iter().enumerate() {
            let (t0, t1) = match edge.medium {
                Some(range) => range,
                None => continue,
            };
            if edge.throughput.is_black() {
                continue;
            }
            let query = EdgeQuery { index, edge, t0, t1 };
            match ctx.estimator {
                VolumeEstimator::Distance => {
                    distance::gather(ctx, &query, scale_vol, shifts, stats, sampler, &mut rec)
                }
                VolumeEstimator::Bre { kernel } => bre::gather(ctx, &query, kernel, shifts, stats, &mut rec),
                VolumeEstimator::Beam { kernel, accelerated } => {
                    beam::gather(ctx, &query, kernel, accelerated, shifts, stats, &mut rec)
                }
                VolumeEstimator::Plane => plane::gather(ctx, &query, shifts, stats, &mut rec),
            }
        }
    }
    accumulate(ctx, gp, &rec);
}

/// Adds the contributions of a pass to a gather point.
///
/// * `ctx` - Phase context.
/// * `gp`  - The gather point.
/// * `rec` - Contributions of the pass.
fn accumulate(ctx: &VolumeContext, gp: &mut GatherPoint, rec: &GradientRecord) {
    if ctx.estimator.is_apa() {
        if ctx.shot_volume == 0 {
            return;
        }
        let it = max(ctx.pass, 1) as Float;
        let rec = rec.scaled(1.0 / ctx.shot_volume as Float);
        let mean = |acc: Spectrum, v: Spectrum| (acc * (it - 1.0) + v) / it;
        gp.medium_flux = mean(gp.medium_flux, rec.base);
        for k in 0..4 {
            gp.shifted_medium_flux[k] = mean(gp.shifted_medium_flux[k], rec.shifted[k]);
            gp.weighted_medium_flux[k] = mean(gp.weighted_medium_flux[k], rec.weighted[k]);
        }
    } else {
        gp.medium_flux += rec.base;
        for k in 0..4 {
            gp.shifted_medium_flux[k] += rec.shifted[k];
            gp.weighted_medium_flux[k] += rec.weighted[k];
        }
        update_volume_scale(&mut gp.n_vol, &mut gp.scale_vol, rec.m, ctx.config.alpha);
    }
}

/// Returns the `(u, v, sin theta, distance)` closest approach of two unit
/// direction lines, or `None` when they are parallel.
///
/// * `o0` - Origin of the first line.
/// * `d0` - Direction of the first line.
/// * `o1` - Origin of the second line.
/// * `d1` - Direction of the second line.
pub fn closest_approach(o0: &Point3f, d0: &Vector3f, o1: &Point3f, d1: &Vector3f) -> Option<(Float, Float, Float, Float)> {
    let w0 = *o0 - *o1;
    let b = d0.dot(d1);
    let denom = 1.0 - b * b;
    if denom < 1e-7 {
        return None;
    }
    let d = d0.dot(&w0);
    let e = d1.dot(&w0);
    let u = (b * e - d) / denom;
    let v = (e - b * d) / denom;
    let distance = ((*o0 + *d0 * u) - (*o1 + *d1 * v)).length();
    Some((u, v, denom.sqrt(), distance))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gvpm::shooting::*;
    use float_cmp::approx_eq;
    use gvpm_core::parallel::LocalScheduler;
    use shared_arena::SharedArena;
    use std::sync::atomic::AtomicBool;

    fn smoke_config(technique: VolTechnique) -> GVPMConfig {
        GVPMConfig {
            vol_technique: technique,
            photon_count: 0,
            volume_photon_count: 2000,
            surface_rendering: false,
            ..Default::default()
        }
    }

    /// Runs one pass of volume gathering on the centre pixel of the smoke
    /// box and returns the gather point.
    fn gather_centre(technique: VolTechnique) -> (GatherPoint, ShiftStats) {
        let scene = cornell_box(Point2i::new(8, 8), DemoScene::Smoke);
        let config = smoke_config(technique);
        let medium = scene.medium().unwrap();
        let radius = VolumeRadius::new(&medium.bounds(), 1.0);
        let result = shoot(&scene, &config, &LocalScheduler::new(2), 1, Some(radius), &AtomicBool::new(false));
        let ctx = VolumeContext {
            scene: &scene,
            config: &config,
            medium,
            map: &result.volume_map,
            radius,
            estimator: VolumeEstimator::from_technique(technique).unwrap(),
            pass: 1,
            shot_volume: result.shot_volume,
        };

        let mut gp = GatherPoint::new(Point2i::new(4, 4), 1.0);
        let mut sampler = IndependentSampler::new(17);
        gp.regenerate(&scene, &config, &mut sampler);
        let arena = SharedArena::new();
        let mut stats = ShiftStats::default();
        let shifts = create_shifts(&scene, &config, &gp.path, &gp.pixel, &arena, &mut stats);
        gather_volume(&ctx, &mut gp, &shifts, &mut stats, &mut sampler);
        (gp, stats)
    }

    #[test]
    fn estimators_follow_techniques() {
        assert_eq!(VolumeEstimator::from_technique(VolTechnique::None), None);
        assert!(!VolumeEstimator::from_technique(VolTechnique::Distance).unwrap().is_apa());
        for t in [
            VolTechnique::Bre,
            VolTechnique::Bre3D,
            VolTechnique::Beam1D,
            VolTechnique::Beam3D,
            VolTechnique::Beam3DAcc,
            VolTechnique::Plane0D,
        ] {
            assert!(VolumeEstimator::from_technique(t).unwrap().is_apa());
        }
    }

    #[test]
    fn closest_approach_of_skew_lines() {
        let (u, v, sin_theta, dist) = closest_approach(
            &Point3f::new(0.0, 0.0, -1.0),
            &Vector3f::new(0.0, 0.0, 1.0),
            &Point3f::new(-1.0, 0.5, 0.0),
            &Vector3f::new(1.0, 0.0, 0.0),
        )
        .unwrap();
        assert!(approx_eq!(f32, u, 1.0, epsilon = 1e-6));
        assert!(approx_eq!(f32, v, 1.0, epsilon = 1e-6));
        assert!(approx_eq!(f32, sin_theta, 1.0, epsilon = 1e-6));
        assert!(approx_eq!(f32, dist, 0.5, epsilon = 1e-6));

        let d = Vector3f::new(1.0, 0.0, 0.0);
        assert!(closest_approach(&Point3f::zero(), &d, &Point3f::new(0.0, 1.0, 0.0), &d).is_none());
    }

    #[test]
    fn apa_mean_is_skipped_without_volume_particles() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Smoke);
        let config = smoke_config(VolTechnique::Beam3D);
        let map = VolumePhotonMap::Empty;
        let ctx = VolumeContext {
            scene: &scene,
            config: &config,
            medium: scene.medium().unwrap(),
            map: &map,
            radius: VolumeRadius { base: 0.1, scale: 1.0 },
            estimator: VolumeEstimator::from_technique(VolTechnique::Beam3D).unwrap(),
            pass: 2,
            shot_volume: 0,
        };
        let mut gp = GatherPoint::new(Point2i::new(1, 1), 1.0);
        gp.medium_flux = Spectrum::new(2.0);
        accumulate(&ctx, &mut gp, &GradientRecord::default());
        assert_eq!(gp.medium_flux, Spectrum::new(2.0));

        let ctx = VolumeContext { shot_volume: 10, ..ctx };
        let rec = GradientRecord {
            base: Spectrum::new(10.0),
            ..Default::default()
        };
        accumulate(&ctx, &mut gp, &rec);
        // (2 * 1 + 10 / 10) / 2
        assert!(approx_eq!(f32, gp.medium_flux.y(), 1.5, epsilon = 1e-5));
    }

    #[test]
    fn distance_accumulates_and_shrinks_scale() {
        let (gp, _) = gather_centre(VolTechnique::Distance);
        assert!(gp.have_smoke);
        assert!(gp.medium_flux.is_finite());
        if gp.n_vol > 0.0 {
            assert!(gp.medium_flux.y() > 0.0);
            assert!(gp.scale_vol < 1.0);
        } else {
            assert_eq!(gp.scale_vol, 1.0);
        }
    }

    #[test]
    fn every_technique_gives_finite_gradients() {
        for t in [
            VolTechnique::Bre,
            VolTechnique::Bre3D,
            VolTechnique::Beam1D,
            VolTechnique::Beam3D,
            VolTechnique::Beam3DAcc,
            VolTechnique::Plane0D,
        ] {
            let (gp, _) = gather_centre(t);
            assert!(gp.medium_flux.is_finite(), "{}", t);
            assert!(gp.medium_flux.y() >= 0.0, "{}", t);
            for k in 0..4 {
                assert!(gp.shifted_medium_flux[k].is_finite(), "{}", t);
                assert!(gp.weighted_medium_flux[k].is_finite(), "{}", t);
            }
            assert_eq!(gp.n_vol, 0.0);
        }
    }

    #[test]
    fn beams_see_the_smoke() {
        let (gp, stats) = gather_centre(VolTechnique::Beam3DAcc);
        assert!(gp.medium_flux.y() > 0.0);
        assert!(stats.reconnections > 0);
    }
}
