//! Beam-beam estimate

use super::*;

impl BeamKernel {
    /// Returns the kernel value at the closest approach, or 0 outside the
    /// radius.
    ///
    /// * `h`         - Distance between the two lines.
    /// * `r`         - Kernel radius.
    /// * `sin_theta` - Sine of the angle between the lines.
    pub fn eval(&self, h: Float, r: Float, sin_theta: Float) -> Float {
        if h > r || sin_theta <= 0.0 {
            return 0.0;
        }
        match self {
            Self::Segment => 1.0 / (2.0 * r * sin_theta),
            Self::Cylinder => 3.0 * (r * r - h * h) / (4.0 * r * r * r * sin_theta),
        }
    }
}

/// Evaluates one beam against a camera edge.
///
/// * `ctx`    - Phase context.
/// * `query`  - Camera edge inside the medium.
/// * `kernel` - Kernel shape.
/// * `beam`   - The beam.
/// * `shifts` - Shifted gather points.
/// * `stats`  - Shift counters.
/// * `rec`    - Contributions of the pass.
fn gather_beam(
    ctx: &VolumeContext,
    query: &EdgeQuery,
    kernel: BeamKernel,
    beam: &PhotonBeam,
    shifts: &ShiftSet,
    stats: &mut ShiftStats,
    rec: &mut GradientRecord,
) {
    let edge = query.edge;
    let (u, v, sin_theta, h) = match closest_approach(&edge.origin, &edge.d, &beam.origin, &beam.direction) {
        Some(ca) => ca,
        None => return,
    };
    if u < query.t0 || u > query.t1 || v < 0.0 || v > beam.length {
        return;
    }
    let k = kernel.eval(h, beam.radius, sin_theta);
    if k == 0.0 || !ctx.config.accepts_volume_length(query.camera_depth() + beam.depth) {
        return;
    }
    let medium = ctx.medium;
    let phase = medium.phase();
    let sigma_s = medium.sigma_s();
    let light = beam.flux * medium.transmittance(v);
    let c = query.weight(medium, u) * sigma_s * phase.p(&-edge.d, &-beam.direction) * light * k;
    if c.is_black() {
        return;
    }
    rec.m += 1.0;
    rec.base += c;

    let x = edge.at(u);
    let y = beam.at(v);
    let point = light_point(y, -beam.direction, light, beam.depth, beam.parent);
    for sgp in shifts.iter() {
        let shifted = shifted_edge(sgp, query.index, u).and_then(|se| {
            let xs = se.at(u);
            let ys = y + (xs - x);
            let ls = shift_photon(ctx.scene, ctx.config, &point, &ys, None, stats)?;
            let ds = -ls.wi;
            let sin_shift = se.d.cross(&ds).length();
            let ks = kernel.eval(h, beam.radius, sin_shift);
            if ks == 0.0 {
                return None;
            }
            let jacobian = sgp.jacobian * ls.jacobian;
            let w = se.throughput * se.transmittance_to(medium, u) * sigma_s;
            let c_shift = w * phase.p(&-se.d, &ds) * light * ls.flux_ratio * ks * jacobian;
            Some((c_shift, sgp.pdf_ratio * ls.pdf_ratio * jacobian))
        });
        rec.add_shift(sgp.direction.index(), c, shifted, ctx.config.use_mis);
    }
}

/// Gathers the beams passing near a camera edge. The naive variant tests
/// every beam of the pass, the accelerated one only those whose bounds the
/// edge crosses.
///
/// * `ctx`         - Phase context.
/// * `query`       - Camera edge inside the medium.
/// * `kernel`      - Kernel shape.
/// * `accelerated` - Look beams up in the BVH.
/// * `shifts`      - Shifted gather points.
/// * `stats`       - Shift counters.
/// * `rec`         - Contributions of the pass.
pub fn gather(
    ctx: &VolumeContext,
    query: &EdgeQuery,
    kernel: BeamKernel,
    accelerated: bool,
    shifts: &ShiftSet,
    stats: &mut ShiftStats,
    rec: &mut GradientRecord,
) {
    let map = match ctx.map {
        VolumePhotonMap::Beams(map) => map,
        _ => return,
    };
    if accelerated {
        map.query_ray(&query.ray(), |beam| gather_beam(ctx, query, kernel, beam, shifts, stats, rec));
    } else {
        for beam in map.primitives() {
            gather_beam(ctx, query, kernel, beam, shifts, stats, rec);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use accelerators::{BVHAccel, SplitMethod};
    use float_cmp::approx_eq;
    use shared_arena::SharedArena;

    #[test]
    fn kernels_vanish_outside_radius() {
        assert_eq!(BeamKernel::Segment.eval(0.6, 0.5, 1.0), 0.0);
        assert_eq!(BeamKernel::Cylinder.eval(0.6, 0.5, 1.0), 0.0);
        assert!(approx_eq!(f32, BeamKernel::Segment.eval(0.2, 0.5, 0.5), 2.0, ulps = 4));
        assert!(approx_eq!(f32, BeamKernel::Cylinder.eval(0.0, 0.5, 1.0), 1.5, ulps = 4));
    }

    #[test]
    fn naive_and_accelerated_lookups_agree() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Smoke);
        let config = GVPMConfig {
            vol_technique: VolTechnique::Beam3D,
            ..Default::default()
        };
        let medium = scene.medium().unwrap();
        let parent = LightVertex::emitter(Point3f::new(0.0, 0.99, 0.0), Some(Vector3f::new(0.0, -1.0, 0.0)));
        let beams: Vec<PhotonBeam> = (0..16)
            .map(|i| {
                let x = -0.8 + 0.1 * i as Float;
                PhotonBeam {
                    origin: Point3f::new(x, 0.99, 0.1),
                    direction: Vector3f::new(0.0, -1.0, 0.0),
                    length: 1.99,
                    flux: Spectrum::ONE,
                    depth: 1,
                    parent: LightVertex { position: Point3f::new(x, 0.99, 0.1), ..parent },
                    radius: 0.15,
                }
            })
            .collect();
        let map = VolumePhotonMap::Beams(BVHAccel::new(beams, 4, SplitMethod::SAH));
        let ctx = VolumeContext {
            scene: &scene,
            config: &config,
            medium,
            map: &map,
            radius: VolumeRadius { base: 0.15, scale: 1.0 },
            estimator: VolumeEstimator::from_technique(VolTechnique::Beam3D).unwrap(),
            pass: 1,
            shot_volume: 16,
        };
        let edge = CameraEdge {
            origin: Point3f::new(0.0, 0.0, -3.5),
            d: Vector3f::new(0.0, 0.0, 1.0),
            length: 4.5,
            medium: Some((0.0, 4.5)),
            throughput: Spectrum::ONE,
        };
        let query = EdgeQuery {
            index: 0,
            edge: &edge,
            t0: 0.0,
            t1: 4.5,
        };
        let arena = SharedArena::new();
        let shifts = ShiftDirection::ALL.map(|d| arena.alloc(ShiftGatherPoint::invalid(d, Point2i::new(0, 0))));

        let mut naive = GradientRecord::default();
        let mut accel = GradientRecord::default();
        gather(&ctx, &query, BeamKernel::Cylinder, false, &shifts, &mut ShiftStats::default(), &mut naive);
        gather(&ctx, &query, BeamKernel::Cylinder, true, &shifts, &mut ShiftStats::default(), &mut accel);

        // Beams at x = -0.1, 0.0 and 0.1 are within the radius.
        assert_eq!(naive.m, 3.0);
        assert_eq!(accel.m, naive.m);
        assert!(approx_eq!(f32, accel.base.y(), naive.base.y(), epsilon = 1e-6));
        assert!(naive.base.y() > 0.0);
    }
}
