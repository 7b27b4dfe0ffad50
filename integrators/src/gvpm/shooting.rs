//! Photon and beam shooting

use super::config::*;
use super::photon::*;
use super::radius::*;
use accelerators::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;
use gvpm_core::parallel::*;
use gvpm_core::rng::*;
use gvpm_core::sampler::*;
use gvpm_core::scene::*;
use gvpm_core::spectrum::*;
use std::sync::atomic::AtomicBool;

/// Largest automatic work unit.
const MAX_AUTO_GRANULARITY: usize = 50_000;

/// Which particles a shooting round records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShootingRound {
    /// Surface photons.
    Surface,

    /// Medium photons, beams or planes.
    Volume,
}

impl ShootingRound {
    fn index(&self) -> u64 {
        match self {
            Self::Surface => 0,
            Self::Volume => 1,
        }
    }
}

/// Particles recorded by one work unit.
#[derive(Default)]
pub struct ShootingUnit {
    /// Surface or medium photons.
    pub photons: Vec<Photon>,

    /// Beams.
    pub beams: Vec<PhotonBeam>,

    /// Planes.
    pub planes: Vec<PhotonPlane>,

    /// Particles traced.
    pub shot: usize,
}

/// Splits a particle count into work units.
///
/// * `count`         - Requested particles.
/// * `granularity`   - Requested particles per unit. 0 picks a value.
/// * `workers`       - Number of workers.
/// * `deterministic` - Give every worker the same share.
///
/// Returns `(count, granularity)` where `count` may have been adjusted.
pub fn work_split(count: usize, granularity: usize, workers: usize, deterministic: bool) -> (usize, usize) {
    let workers = max(workers, 1);
    if deterministic {
        let g = count / workers;
        let adjusted = g * workers;
        if adjusted != count {
            warn!("Particle count adjusted from {} to {} for {} workers", count, adjusted, workers);
        }
        (adjusted, g)
    } else if granularity > 0 {
        (count, granularity)
    } else {
        let g = (count + 4 * workers - 1) / (4 * workers);
        (count, clamp(g, 1, MAX_AUTO_GRANULARITY))
    }
}

/// One shooting round split into work units.
pub struct ShootingProcess<'a> {
    scene: &'a dyn Scene,
    config: &'a GVPMConfig,
    pass: usize,
    round: ShootingRound,
    count: usize,
    granularity: usize,
}

impl<'a> ShootingProcess<'a> {
    /// Returns a new `ShootingProcess`.
    ///
    /// * `scene`       - The scene.
    /// * `config`      - Integrator settings.
    /// * `pass`        - 1-based pass number.
    /// * `round`       - What to record.
    /// * `count`       - Particles to trace.
    /// * `granularity` - Particles per unit.
    pub fn new(
        scene: &'a dyn Scene,
        config: &'a GVPMConfig,
        pass: usize,
        round: ShootingRound,
        count: usize,
        granularity: usize,
    ) -> Self {
        Self {
            scene,
            config,
            pass,
            round,
            count,
            granularity: max(granularity, 1),
        }
    }

    /// Applies Russian roulette to a throughput update. Returns false when
    /// the particle is terminated.
    fn russian_roulette(&self, depth: Int, flux: &mut Spectrum, updated: Spectrum, u: Float) -> bool {
        if depth >= self.config.rr_depth && flux.y() > 0.0 {
            let q = max(0.0, 1.0 - updated.y() / flux.y());
            if u < q {
                return false;
            }
            *flux = updated / (1.0 - q);
        } else {
            *flux = updated;
        }
        !flux.is_black()
    }

    /// Traces one particle from an emitter.
    fn trace_particle(&self, sampler: &mut dyn Sampler, out: &mut ShootingUnit) {
        let u_light = sampler.get_1d();
        let u_pos = sampler.get_2d();
        let u_dir = sampler.get_2d();
        let (_, er) = match self.scene.sample_emitter_ray(u_light, &u_pos, &u_dir) {
            Some(s) => s,
            None => return,
        };
        let mut flux = er.flux;
        if flux.is_black() {
            return;
        }

        let technique = self.config.vol_technique;
        let volume = self.round == ShootingRound::Volume;
        let record_points = volume && technique.needs_points();
        let record_beams = volume && technique.needs_beams();
        let record_surface = self.round == ShootingRound::Surface;

        let medium = self.scene.medium();
        let mut ray = er.ray;
        let mut parent = LightVertex::emitter(er.position, er.normal);
        let mut grandparent: Option<LightVertex> = None;
        let mut depth: Int = 1;
        loop {
            let its = self.scene.intersect(&ray);
            ray.t_max = its.as_ref().map_or(INFINITY, |si| si.t);

            if let Some(m) = medium {
                if record_beams {
                    if let Some((t0, t1)) = m.overlap(&ray).filter(|(_, t1)| t1.is_finite()) {
                        let beam = PhotonBeam {
                            origin: ray.at(t0),
                            direction: ray.d,
                            length: t1 - t0,
                            flux,
                            depth,
                            parent,
                            radius: 0.0,
                        };
                        if technique == VolTechnique::Plane0D {
                            if let Some(plane) = self.extrude(&beam, sampler) {
                                out.planes.push(plane);
                            }
                        } else {
                            out.beams.push(beam);
                        }
                    }
                }

                let ms = m.sample_distance(&ray, sampler.get_1d());
                if ms.scattered {
                    let updated = flux * ms.weight;
                    let p = ray.at(ms.t);
                    let wo = -ray.d;
                    if record_points {
                        out.photons.push(Photon {
                            position: p,
                            normal: None,
                            wi: wo,
                            flux: updated,
                            depth,
                            parent,
                            grandparent,
                        });
                    }
                    if !self.config.can_extend(depth) {
                        break;
                    }
                    let u_rr = sampler.get_1d();
                    if !self.russian_roulette(depth, &mut flux, updated, u_rr) {
                        break;
                    }
                    let (_, wi) = m.phase().sample_p(&wo, &sampler.get_2d());
                    grandparent = Some(parent);
                    parent = LightVertex::medium(p, wo, *m.phase());
                    ray = Ray::unbounded(p, wi);
                    depth += 1;
                    continue;
                }
                flux *= ms.weight;
                if flux.is_black() {
                    break;
                }
            }

            let si = match its {
                Some(si) => si,
                None => break,
            };
            let wo = -ray.d;
            let n = si.facing_normal(&wo);
            if record_surface && !si.bsdf.is_delta() {
                out.photons.push(Photon {
                    position: si.p,
                    normal: Some(n),
                    wi: wo,
                    flux,
                    depth,
                    parent,
                    grandparent,
                });
            }
            if !self.config.can_extend(depth) {
                break;
            }
            let bs = match si.bsdf.sample_f(&n, &wo, &sampler.get_2d()) {
                Some(bs) => bs,
                None => break,
            };
            let updated = flux * bs.weight(&n);
            let u_rr = sampler.get_1d();
            if !self.russian_roulette(depth, &mut flux, updated, u_rr) {
                break;
            }
            grandparent = Some(parent);
            parent = LightVertex::surface(si.p, n, wo, si.bsdf);
            ray = si.spawn_ray(&bs.wi);
            depth += 1;
        }
    }

    /// Extrudes a beam into a plane along a phase sampled direction with a
    /// free-flight sampled length.
    fn extrude(&self, beam: &PhotonBeam, sampler: &mut dyn Sampler) -> Option<PhotonPlane> {
        let m = self.scene.medium()?;
        let (_, d1) = m.phase().sample_p(&-beam.direction, &sampler.get_2d());
        let mut ray = Ray::unbounded(beam.origin, d1);
        if let Some(si) = self.scene.intersect(&ray) {
            ray.t_max = si.t;
        }
        let (_, t1) = m.overlap(&ray)?;
        let ms = m.sample_distance(&ray, sampler.get_1d());
        let length1 = if ms.scattered { ms.t } else { t1 };
        if !length1.is_finite() || length1 <= 0.0 {
            return None;
        }
        Some(PhotonPlane {
            origin: beam.origin,
            d0: beam.direction,
            d1,
            length0: beam.length,
            length1,
            flux: beam.flux,
            depth: beam.depth + 1,
            parent: beam.parent,
        })
    }
}

impl<'a> ParallelProcess for ShootingProcess<'a> {
    type Output = ShootingUnit;

    fn work_units(&self) -> usize {
        (self.count + self.granularity - 1) / self.granularity
    }

    fn process(&self, unit: usize, _worker: usize) -> ShootingUnit {
        let seed = mix_seed(self.pass as u64 * 2 + self.round.index(), unit as u64);
        let mut sampler = IndependentSampler::new(seed);
        let start = unit * self.granularity;
        let n = min(self.granularity, self.count - start);

        let mut out = ShootingUnit::default();
        for _ in 0..n {
            self.trace_particle(&mut sampler, &mut out);
        }
        out.shot = n;
        out
    }
}

/// Photon maps of a pass.
pub struct ShootingResult {
    /// Surface photons.
    pub surface_map: SurfacePhotonMap,

    /// Volume photons, beams or planes.
    pub volume_map: VolumePhotonMap,

    /// Surface particles traced.
    pub shot_surface: usize,

    /// Volume particles traced.
    pub shot_volume: usize,
}

/// Runs one shooting round and merges the unit outputs in unit order.
fn run_round(
    scene: &dyn Scene,
    config: &GVPMConfig,
    scheduler: &LocalScheduler,
    pass: usize,
    round: ShootingRound,
    count: Int,
    cancel: &AtomicBool,
) -> ShootingUnit {
    let count = max(count, 0) as usize;
    // Only the volume count is rounded to a per worker share.
    let (count, granularity) = work_split(
        count,
        max(config.granularity, 0) as usize,
        scheduler.worker_count(),
        config.deterministic && round == ShootingRound::Volume,
    );
    let mut merged = ShootingUnit::default();
    if count == 0 || granularity == 0 {
        return merged;
    }

    let process = ShootingProcess::new(scene, config, pass, round, count, granularity);
    for unit in scheduler.execute(&process, cancel).into_iter().flatten() {
        merged.photons.extend(unit.photons);
        merged.beams.extend(unit.beams);
        merged.planes.extend(unit.planes);
        merged.shot += unit.shot;
    }
    merged
}

/// Traces the surface and volume particles of a pass and builds the photon
/// maps.
///
/// * `scene`     - The scene.
/// * `config`    - Integrator settings.
/// * `scheduler` - Work unit scheduler.
/// * `pass`      - 1-based pass number.
/// * `radius`    - Global volume kernel radius of the pass.
/// * `cancel`    - Cancellation flag.
pub fn shoot(
    scene: &dyn Scene,
    config: &GVPMConfig,
    scheduler: &LocalScheduler,
    pass: usize,
    radius: Option<VolumeRadius>,
    cancel: &AtomicBool,
) -> ShootingResult {
    let surface = if config.needs_surface_rendering() {
        run_round(scene, config, scheduler, pass, ShootingRound::Surface, config.photon_count, cancel)
    } else {
        ShootingUnit::default()
    };
    let volume = if config.needs_volume_rendering() && scene.medium().is_some() {
        run_round(scene, config, scheduler, pass, ShootingRound::Volume, config.volume_photon_count, cancel)
    } else {
        ShootingUnit::default()
    };

    let r = radius.map_or(0.0, |vr| vr.radius());
    let surface_map = BVHAccel::new(surface.photons, 4, SplitMethod::SAH);
    let volume_map = VolumePhotonMap::build(config.vol_technique, volume.photons, volume.beams, volume.planes, r);
    debug!(
        "Pass {}: {} surface photons from {} paths, {} volume primitives from {} paths",
        pass,
        surface_map.len(),
        surface.shot,
        volume_map.len(),
        volume.shot
    );

    ShootingResult {
        surface_map,
        volume_map,
        shot_surface: surface.shot,
        shot_volume: volume.shot,
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn config(technique: VolTechnique) -> GVPMConfig {
        GVPMConfig {
            vol_technique: technique,
            photon_count: 400,
            volume_photon_count: 400,
            ..Default::default()
        }
    }

    #[test]
    fn deterministic_split_drops_remainder() {
        assert_eq!(work_split(1000, 0, 7, true), (994, 142));
        assert_eq!(work_split(1000, 10, 7, false), (1000, 10));
        let (count, g) = work_split(1000, 0, 4, false);
        assert_eq!(count, 1000);
        assert!(g >= 1);
        assert_eq!(work_split(5, 0, 7, true), (0, 0));
    }

    #[test]
    fn deterministic_mode_keeps_the_surface_count() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Cornell);
        let config = GVPMConfig {
            deterministic: true,
            photon_count: 1000,
            ..config(VolTechnique::None)
        };
        let result = shoot(&scene, &config, &LocalScheduler::new(7), 1, None, &AtomicBool::new(false));
        assert_eq!(result.shot_surface, 1000);
        assert_eq!(result.shot_volume, 0);
        assert!(!result.surface_map.is_empty());
        assert!(result.volume_map.is_empty());
    }

    #[test]
    fn deterministic_mode_rounds_the_volume_count() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Smoke);
        let config = GVPMConfig {
            deterministic: true,
            photon_count: 1000,
            volume_photon_count: 1000,
            ..config(VolTechnique::Distance)
        };
        let radius = VolumeRadius { base: 0.2, scale: 1.0 };
        let result = shoot(&scene, &config, &LocalScheduler::new(7), 1, Some(radius), &AtomicBool::new(false));
        assert_eq!(result.shot_surface, 1000);
        assert_eq!(result.shot_volume, 994);
    }

    #[test]
    fn maps_do_not_depend_on_worker_count() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Cornell);
        let config = GVPMConfig {
            granularity: 50,
            ..config(VolTechnique::None)
        };
        let cancel = AtomicBool::new(false);
        let a = shoot(&scene, &config, &LocalScheduler::new(1), 3, None, &cancel);
        let b = shoot(&scene, &config, &LocalScheduler::new(4), 3, None, &cancel);
        assert_eq!(a.surface_map.len(), b.surface_map.len());
        let pa: Vec<Point3f> = a.surface_map.primitives().iter().map(|p| p.position).collect();
        let pb: Vec<Point3f> = b.surface_map.primitives().iter().map(|p| p.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn surface_photons_respect_depth_and_kind() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Mirror);
        let config = GVPMConfig {
            max_depth: 3,
            ..config(VolTechnique::None)
        };
        let result = shoot(&scene, &config, &LocalScheduler::new(2), 1, None, &AtomicBool::new(false));
        for p in result.surface_map.primitives() {
            assert!(p.depth >= 1 && p.depth <= 3);
            assert!(p.normal.is_some());
            assert!(p.flux.is_finite());
            match p.grandparent {
                Some(_) => assert!(p.depth >= 2),
                None => assert_eq!(p.depth, 1),
            }
        }
    }

    #[test]
    fn volume_rounds_record_the_technique_primitives() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Smoke);
        let radius = VolumeRadius { base: 0.2, scale: 1.0 };
        let cancel = AtomicBool::new(false);
        let scheduler = LocalScheduler::new(2);

        let points = shoot(&scene, &config(VolTechnique::Distance), &scheduler, 1, Some(radius), &cancel);
        assert!(matches!(points.volume_map, VolumePhotonMap::Points(_)));
        assert!(!points.volume_map.is_empty());
        assert_eq!(points.shot_volume, 400);

        let beams = shoot(&scene, &config(VolTechnique::Beam3D), &scheduler, 1, Some(radius), &cancel);
        match &beams.volume_map {
            VolumePhotonMap::Beams(m) => {
                assert!(!m.is_empty());
                for b in m.primitives() {
                    assert!(b.length > 0.0);
                    assert_eq!(b.radius, 0.2);
                }
            }
            _ => panic!("expected beams"),
        }

        let planes = shoot(&scene, &config(VolTechnique::Plane0D), &scheduler, 1, Some(radius), &cancel);
        match &planes.volume_map {
            VolumePhotonMap::Planes(m) => {
                assert!(!m.is_empty());
                assert!(m.primitives().iter().all(|p| p.depth >= 2 && p.length1 > 0.0));
            }
            _ => panic!("expected planes"),
        }
    }

    #[test]
    fn cancelled_rounds_shoot_nothing() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Cornell);
        let cancel = AtomicBool::new(false);
        cancel.store(true, Ordering::Release);
        let result = shoot(&scene, &config(VolTechnique::None), &LocalScheduler::new(2), 1, None, &cancel);
        assert_eq!(result.shot_surface, 0);
        assert!(result.surface_map.is_empty());
    }
}
