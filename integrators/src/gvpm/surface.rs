//! Surface photon gathering

use super::config::*;
use super::gather_point::*;
use super::photon::*;
use super::radius::*;
use super::shift::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;
use gvpm_core::scene::*;
use gvpm_core::spectrum::*;

/// Shifted photon position on the shifted gather surface: the offset of the
/// base photon from its gather point projected on the shifted tangent plane.
///
/// * `photon`         - Base photon position.
/// * `base`           - Base gather point.
/// * `shifted`        - Shifted gather point.
/// * `shifted_normal` - Normal at the shifted gather point.
fn shifted_position(photon: &Point3f, base: &Point3f, shifted: &Point3f, shifted_normal: &Normal3f) -> Point3f {
    let offset = *photon - *base;
    *shifted + (offset - *shifted_normal * offset.dot(shifted_normal))
}

/// Gathers the surface photons around a gather point and accumulates the
/// primal and shifted contributions, then shrinks the radius.
///
/// * `scene`  - The scene.
/// * `config` - Integrator settings.
/// * `map`    - Surface photons of the pass.
/// * `gp`     - The gather point.
/// * `shifts` - Shifted gather points of the pass.
/// * `stats`  - Shift counters.
pub fn gather_surface(
    scene: &dyn Scene,
    config: &GVPMConfig,
    map: &SurfacePhotonMap,
    gp: &mut GatherPoint,
    shifts: &ShiftSet,
    stats: &mut ShiftStats,
) {
    let g = match gp.gather() {
        Some(g) => *g,
        None => return,
    };
    let radius = gp.radius;
    if radius <= 0.0 || map.is_empty() {
        return;
    }
    let r2 = radius * radius;

    let mut rec = GradientRecord::default();
    map.query_sphere(&g.p, radius, |photon| {
        if photon.position.distance_squared(&g.p) > r2 {
            return;
        }
        if !photon.normal.map_or(false, |pn| pn.dot(&g.n) > 0.0) {
            return;
        }
        if !config.accepts_length(g.depth + photon.depth) || (config.direct_tracing && photon.depth == 1) {
            return;
        }
        let c = g.throughput * g.bsdf.f(&g.n, &g.wo, &photon.wi) * photon.flux;
        if c.is_black() {
            return;
        }
        rec.m += 1.0;
        rec.base += c;

        for sgp in shifts.iter() {
            let shifted = sgp.gather().and_then(|sg| {
                let pos = shifted_position(&photon.position, &g.p, &sg.p, &sg.n);
                let ls = shift_photon(scene, config, photon, &pos, Some(sg.n), stats)?;
                let f = sg.bsdf.f(&sg.n, &sg.wo, &ls.wi);
                let jacobian = sgp.jacobian * ls.jacobian;
                let c_shift = sg.throughput * f * photon.flux * ls.flux_ratio * jacobian;
                Some((c_shift, sgp.pdf_ratio * ls.pdf_ratio * jacobian))
            });
            rec.add_shift(sgp.direction.index(), c, shifted, config.use_mis);
        }
    });

    if rec.m > 0.0 {
        let rec = rec.scaled(1.0 / (PI * r2));
        gp.base_flux += rec.base;
        for k in 0..4 {
            gp.shifted_flux[k] += rec.shifted[k];
            gp.weighted_base_flux[k] += rec.weighted[k];
        }
    }
    update_surface_radius(&mut gp.n, &mut gp.radius, rec.m, config.alpha);
}

/// Accumulates the gradients of the emission reached by the camera paths.
///
/// * `gp`      - The gather point.
/// * `shifts`  - Shifted gather points of the pass.
/// * `use_mis` - Weight shifts by their density ratio.
pub fn accumulate_emitter_shifts(gp: &mut GatherPoint, shifts: &ShiftSet, use_mis: bool) {
    let base = gp.path.emission;
    if base.is_black() && shifts.iter().all(|s| s.path.emission.is_black()) {
        return;
    }
    let mut rec = GradientRecord::default();
    for sgp in shifts.iter() {
        let shifted = if sgp.valid {
            Some((sgp.path.emission * sgp.jacobian, sgp.pdf_ratio * sgp.jacobian))
        } else {
            None
        };
        rec.add_shift(sgp.direction.index(), base, shifted, use_mis);
    }
    for k in 0..4 {
        gp.shifted_emitter_flux[k] += rec.shifted[k];
        gp.weighted_emitter_flux[k] += rec.weighted[k];
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use accelerators::{BVHAccel, SplitMethod};
    use gvpm_core::reflection::BSDF;
    use gvpm_core::sampler::*;
    use shared_arena::SharedArena;

    fn config() -> GVPMConfig {
        GVPMConfig {
            vol_technique: VolTechnique::None,
            initial_radius: 0.1,
            ..Default::default()
        }
    }

    fn floor_photon(x: Float, z: Float, depth: Int) -> Photon {
        let up = Vector3f::new(0.0, 1.0, 0.0);
        let light = LightVertex::emitter(Point3f::new(0.0, 0.99, 0.0), Some(Vector3f::new(0.0, -1.0, 0.0)));
        let p = Point3f::new(x, -1.0, z);
        Photon {
            position: p,
            normal: Some(up),
            wi: (light.position - p).normalize(),
            flux: Spectrum::new(1.0),
            depth,
            parent: light,
            grandparent: None,
        }
    }

    /// Gather point on the floor of the box, traced from a bottom row pixel.
    fn floor_gather_point(scene: &SimpleScene, config: &GVPMConfig) -> GatherPoint {
        let mut gp = GatherPoint::new(Point2i::new(4, 7), 1.0);
        let mut sampler = IndependentSampler::new(2);
        gp.regenerate(scene, config, &mut sampler);
        let g = gp.gather().expect("floor gather");
        assert!((g.p.y + 1.0).abs() < 1e-3);
        gp
    }

    #[test]
    fn empty_map_leaves_accumulators_unchanged() {
        let scene = cornell_box(Point2i::new(8, 8), DemoScene::Cornell);
        let config = config();
        let mut gp = floor_gather_point(&scene, &config);
        let arena = SharedArena::new();
        let mut stats = ShiftStats::default();
        let shifts = create_shifts(&scene, &config, &gp.path, &gp.pixel, &arena, &mut stats);
        let map: SurfacePhotonMap = BVHAccel::new(vec![], 4, SplitMethod::SAH);
        gather_surface(&scene, &config, &map, &mut gp, &shifts, &mut stats);
        assert!(gp.base_flux.is_black());
        assert_eq!(gp.n, 0.0);
        assert_eq!(gp.radius, 0.1);
        assert!(gp.shifted_flux.iter().all(|c| c.is_black()));
    }

    #[test]
    fn nearby_photons_are_gathered_and_shifted() {
        let scene = cornell_box(Point2i::new(8, 8), DemoScene::Cornell);
        let config = config();
        let mut gp = floor_gather_point(&scene, &config);
        let g = *gp.gather().unwrap();
        let photons = vec![
            floor_photon(g.p.x + 0.02, g.p.z, 1),
            floor_photon(g.p.x, g.p.z - 0.03, 1),
            floor_photon(g.p.x + 0.5, g.p.z, 1),
        ];
        let map = BVHAccel::new(photons, 4, SplitMethod::SAH);
        let arena = SharedArena::new();
        let mut stats = ShiftStats::default();
        {
            let shifts = create_shifts(&scene, &config, &gp.path, &gp.pixel, &arena, &mut stats);
            gather_surface(&scene, &config, &map, &mut gp, &shifts, &mut stats);
        }
        assert_eq!(arena.stats().0, 0);

        // Two photons within the radius.
        assert_eq!(gp.n, 2.0 * config.alpha);
        assert!(gp.radius < 0.1);
        assert!(gp.base_flux.y() > 0.0);
        assert!(stats.reconnections > 0);
        for k in 0..4 {
            assert!(gp.weighted_base_flux[k].is_finite());
            assert!(gp.shifted_flux[k].is_finite());
        }
    }

    #[test]
    fn direct_tracing_skips_first_bounce_photons() {
        let scene = cornell_box(Point2i::new(8, 8), DemoScene::Cornell);
        let config = GVPMConfig {
            direct_tracing: true,
            ..config()
        };
        let mut gp = floor_gather_point(&scene, &config);
        let g = *gp.gather().unwrap();
        let map = BVHAccel::new(vec![floor_photon(g.p.x, g.p.z, 1)], 4, SplitMethod::SAH);
        let arena = SharedArena::new();
        let mut stats = ShiftStats::default();
        let shifts = create_shifts(&scene, &config, &gp.path, &gp.pixel, &arena, &mut stats);
        gather_surface(&scene, &config, &map, &mut gp, &shifts, &mut stats);
        assert!(gp.base_flux.is_black());
        assert_eq!(gp.n, 0.0);
    }

    #[test]
    fn photons_on_the_other_side_are_ignored() {
        let scene = cornell_box(Point2i::new(8, 8), DemoScene::Cornell);
        let config = config();
        let mut gp = floor_gather_point(&scene, &config);
        let g = *gp.gather().unwrap();
        let mut photon = floor_photon(g.p.x, g.p.z, 2);
        photon.normal = Some(Vector3f::new(0.0, -1.0, 0.0));
        let map = BVHAccel::new(vec![photon], 4, SplitMethod::SAH);
        let arena = SharedArena::new();
        let mut stats = ShiftStats::default();
        let shifts = create_shifts(&scene, &config, &gp.path, &gp.pixel, &arena, &mut stats);
        gather_surface(&scene, &config, &map, &mut gp, &shifts, &mut stats);
        assert!(gp.base_flux.is_black());
    }

    #[test]
    fn emitter_shifts_weight_failed_directions() {
        let camera = gvpm_core::camera::PinholeCamera::new(
            Point3f::new(0.0, 0.0, -2.0),
            Point3f::zero(),
            Vector3f::new(0.0, 1.0, 0.0),
            60.0,
            Point2i::new(3, 3),
        );
        let mut scene = SimpleScene::new(camera);
        scene.add_area_light(
            gvpm_core::shape::Shape::quad(
                Point3f::new(-5.0, -5.0, 1.0),
                Vector3f::new(0.0, 10.0, 0.0),
                Vector3f::new(10.0, 0.0, 0.0),
            ),
            BSDF::Lambertian {
                reflectance: Spectrum::ZERO,
            },
            Spectrum::new(1.0),
        );
        let config = config();
        let mut gp = GatherPoint::new(Point2i::new(0, 1), 1.0);
        let mut sampler = IndependentSampler::new(9);
        gp.regenerate(&scene, &config, &mut sampler);

        let arena = SharedArena::new();
        let mut stats = ShiftStats::default();
        let shifts = create_shifts(&scene, &config, &gp.path, &gp.pixel, &arena, &mut stats);
        accumulate_emitter_shifts(&mut gp, &shifts, true);

        let left = ShiftDirection::Left.index();
        let right = ShiftDirection::Right.index();
        if gp.path.emission.is_black() {
            assert!(gp.path.gather.is_some());
            assert!(gp.weighted_emitter_flux.iter().all(|c| c.is_black()));
        } else {
            assert_eq!(gp.weighted_emitter_flux[left], gp.path.emission);
            assert!(gp.shifted_emitter_flux[left].is_black());
            assert!(gp.shifted_emitter_flux[right].y() > 0.0);
        }
    }
}
