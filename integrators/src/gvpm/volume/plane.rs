//! Photon planes

use super::*;

/// Returns `|d0 . (d1 x w)|`, the change of variables from the two plane
/// coordinates and the camera distance to a volume.
#[inline]
fn plane_jacobian(d0: &Vector3f, d1: &Vector3f, w: &Vector3f) -> Float {
    d0.dot(&d1.cross(w)).abs()
}

/// Intersects a camera edge with the photon planes of the pass.
///
/// * `ctx`    - Phase context.
/// * `query`  - Camera edge inside the medium.
/// * `shifts` - Shifted gather points.
/// * `stats`  - Shift counters.
/// * `rec`    - Contributions of the pass.
pub fn gather(ctx: &VolumeContext, query: &EdgeQuery, shifts: &ShiftSet, stats: &mut ShiftStats, rec: &mut GradientRecord) {
    let map = match ctx.map {
        VolumePhotonMap::Planes(map) => map,
        _ => return,
    };
    let medium = ctx.medium;
    let phase = medium.phase();
    let sigma_s = medium.sigma_s();
    let edge = query.edge;
    let ray = query.ray();

    map.query_ray(&ray, |plane| {
        let (t, a, b) = match plane.intersect(&ray) {
            Some(hit) => hit,
            None => return,
        };
        if t < query.t0 || t > query.t1 {
            return;
        }
        if !ctx.config.accepts_volume_length(query.camera_depth() + plane.depth) {
            return;
        }
        let jac = plane_jacobian(&plane.d0, &plane.d1, &-edge.d);
        if jac < 1e-4 {
            return;
        }
        let light = plane.flux * medium.transmittance(a);
        let c = query.weight(medium, t) * sigma_s * sigma_s * phase.p(&-edge.d, &-plane.d1) * light / jac;
        if c.is_black() || !c.is_finite() {
            return;
        }
        rec.m += 1.0;
        rec.base += c;

        let y = plane.origin + plane.d0 * a;
        let parent = LightVertex::medium(y, -plane.d0, *phase);
        let point = light_point(y + plane.d1 * b, -plane.d1, light, plane.depth, parent);
        for sgp in shifts.iter() {
            let shifted = shifted_edge(sgp, query.index, t).and_then(|se| {
                let xs = se.at(t);
                let ls = shift_photon(ctx.scene, ctx.config, &point, &xs, None, stats)?;
                let d1 = -ls.wi;
                let jac_shift = plane_jacobian(&plane.d0, &d1, &-se.d);
                if jac_shift < 1e-4 {
                    return None;
                }
                let jacobian = sgp.jacobian * ls.jacobian;
                let w = se.throughput * se.transmittance_to(medium, t) * sigma_s * sigma_s;
                let c_shift = w * phase.p(&-se.d, &d1) * light * ls.flux_ratio * (jacobian / jac_shift);
                Some((c_shift, sgp.pdf_ratio * ls.pdf_ratio * jacobian))
            });
            rec.add_shift(sgp.direction.index(), c, shifted, ctx.config.use_mis);
        }
    });
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
    fn orthogonal_plane_contribution() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Smoke);
        let config = GVPMConfig {
            vol_technique: VolTechnique::Plane0D,
            ..Default::default()
        };
        let medium = scene.medium().unwrap();
        let plane = PhotonPlane {
            origin: Point3f::new(-0.5, 0.5, 0.0),
            d0: Vector3f::new(1.0, 0.0, 0.0),
            d1: Vector3f::new(0.0, -1.0, 0.0),
            length0: 1.0,
            length1: 1.0,
            flux: Spectrum::ONE,
            depth: 2,
            parent: LightVertex::emitter(Point3f::new(-0.5, 0.99, 0.0), Some(Vector3f::new(0.0, -1.0, 0.0))),
        };
        let map = VolumePhotonMap::Planes(BVHAccel::new(vec![plane], 4, SplitMethod::SAH));
        let ctx = VolumeContext {
            scene: &scene,
            config: &config,
            medium,
            map: &map,
            radius: VolumeRadius { base: 0.1, scale: 1.0 },
            estimator: VolumeEstimator::Plane,
            pass: 1,
            shot_volume: 1,
        };
        let edge = CameraEdge {
            origin: Point3f::new(0.0, 0.0, -1.0),
            d: Vector3f::new(0.0, 0.0, 1.0),
            length: 2.0,
            medium: Some((0.0, 2.0)),
            throughput: Spectrum::ONE,
        };
        let query = EdgeQuery {
            index: 0,
            edge: &edge,
            t0: 0.0,
            t1: 2.0,
        };
        let arena = SharedArena::new();
        let shifts = ShiftDirection::ALL.map(|d| arena.alloc(ShiftGatherPoint::invalid(d, Point2i::new(0, 0))));
        let mut rec = GradientRecord::default();
        gather(&ctx, &query, &shifts, &mut ShiftStats::default(), &mut rec);

        assert_eq!(rec.m, 1.0);
        let sigma_s = medium.sigma_s().y();
        let phase = medium.phase().p(&Vector3f::new(0.0, 0.0, -1.0), &Vector3f::new(0.0, 1.0, 0.0));
        let expected = medium.transmittance(1.0).y() * sigma_s * sigma_s * phase * medium.transmittance(0.5).y();
        assert!(approx_eq!(f32, rec.base.y(), expected, epsilon = 1e-6));
    }

    #[test]
    fn grazing_planes_are_skipped() {
        let d0 = Vector3f::new(1.0, 0.0, 0.0);
        let d1 = Vector3f::new(0.0, 0.0, 1.0);
        assert_eq!(plane_jacobian(&d0, &d1, &Vector3f::new(0.0, 0.0, -1.0)), 0.0);
        assert!(approx_eq!(f32, plane_jacobian(&d0, &d1, &Vector3f::new(0.0, 1.0, 0.0)), 1.0, ulps = 2));
    }
}
