//! Camera path shift

use super::*;

/// Replays a camera path through the neighbouring pixel with the same
/// sub-pixel sample. Specular and smooth glossy vertices are shifted with the
/// half-vector map; the shifted path must hit the same kind of vertex at
/// every step.
///
/// * `scene`     - The scene.
/// * `config`    - Integrator settings.
/// * `base`      - Base camera path.
/// * `pixel`     - Base pixel.
/// * `direction` - Shift direction.
pub fn shift_camera_path(
    scene: &dyn Scene,
    config: &GVPMConfig,
    base: &CameraPath,
    pixel: &Point2i,
    direction: ShiftDirection,
) -> ShiftGatherPoint {
    let target = *pixel + direction.offset();
    let mut sgp = ShiftGatherPoint::invalid(direction, target);

    let sensor = scene.sensor();
    if base.vertices.is_empty() || !sensor.contains(&target) {
        return sgp;
    }
    let mut ray = match sensor.generate_ray(&target, &base.sample) {
        Some(ray) => ray,
        None => return sgp,
    };

    let medium = scene.medium();
    let mut path = CameraPath::new(base.sample);
    path.vertices.push(CameraVertex::sensor(ray.o));
    let mut beta = Spectrum::ONE;
    let mut jacobian: Float = 1.0;
    let mut pdf_ratio: Float = 1.0;

    for (i, _) in base.edges.iter().enumerate() {
        let depth = (i + 1) as Int;
        let its = scene.intersect(&ray);
        let length = its.map_or(INFINITY, |si| si.t);
        let range = medium.and_then(|m| m.overlap(&Ray::new(ray.o, ray.d, length)));
        path.edges.push(CameraEdge {
            origin: ray.o,
            d: ray.d,
            length,
            medium: range,
            throughput: beta,
        });

        let bv = base.vertices.get(i + 1);
        let (si, bv) = match (its, bv) {
            (None, None) => break,
            (Some(si), Some(bv)) => (si, bv),
            _ => return sgp,
        };
        let base_bsdf = match bv.bsdf {
            Some(bsdf) => bsdf,
            None => return sgp,
        };
        if is_bounce(&si.bsdf, config.bounce_roughness) != is_bounce(&base_bsdf, config.bounce_roughness) {
            return sgp;
        }
        if let (Some(m), Some((t0, t1))) = (medium, range) {
            beta *= m.transmittance(t1 - t0);
        }

        let wo = -ray.d;
        let n = si.facing_normal(&wo);
        let le = si.le(&wo);
        if !le.is_black() && config.accepts_length(depth) {
            path.emission += beta * le;
        }
        path.vertices.push(CameraVertex {
            p: si.p,
            n,
            wo,
            bsdf: Some(si.bsdf),
            throughput: beta,
        });

        let last = i + 2 >= base.vertices.len();
        if last {
            if let Some(g) = base.gather.as_ref().filter(|g| g.depth == depth) {
                if beta.is_black() {
                    return sgp;
                }
                path.gather = Some(SurfaceGather {
                    p: si.p,
                    n,
                    wo,
                    bsdf: si.bsdf,
                    throughput: beta,
                    depth: g.depth,
                });
            }
            break;
        }

        // Half-vector shift of the next direction.
        let wi_base = match base.edges.get(i + 1) {
            Some(e) => e.d,
            None => break,
        };
        let h = (bv.wo + wi_base).normalize();
        let h_local = Frame::new(&bv.n).to_local(&h);
        let h_shift = Frame::new(&n).to_world(&h_local);
        let wi = reflect(&wo, &h_shift);
        if wi.dot(&n) <= 0.0 {
            return sgp;
        }
        let cos_base = bv.wo.abs_dot(&h);
        if cos_base == 0.0 {
            return sgp;
        }
        jacobian *= wo.abs_dot(&h_shift) / cos_base;

        if si.bsdf.is_delta() {
            beta *= si.bsdf.reflectance();
        } else {
            let pdf_base = base_bsdf.pdf(&bv.n, &bv.wo, &wi_base);
            if pdf_base <= 0.0 {
                return sgp;
            }
            beta *= si.bsdf.f(&n, &wo, &wi) * wi.abs_dot(&n) / pdf_base;
            pdf_ratio *= si.bsdf.pdf(&n, &wo, &wi) / pdf_base;
        }
        if beta.is_black() {
            return sgp;
        }
        ray = si.spawn_ray(&wi);
    }

    sgp.path = path;
    sgp.jacobian = jacobian;
    sgp.pdf_ratio = pdf_ratio;
    sgp.valid = true;
    sgp
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gvpm_core::sampler::*;

    fn config() -> GVPMConfig {
        GVPMConfig {
            vol_technique: VolTechnique::None,
            ..Default::default()
        }
    }

    #[test]
    fn diffuse_shift_lands_on_neighbour() {
        let scene = cornell_box(Point2i::new(16, 16), DemoScene::Cornell);
        let config = config();
        let pixel = Point2i::new(8, 8);
        let mut sampler = IndependentSampler::new(11);
        let base = trace_camera_path(&scene, &config, &pixel, &mut sampler);
        let sgp = shift_camera_path(&scene, &config, &base, &pixel, ShiftDirection::Right);
        assert!(sgp.valid);
        assert_eq!(sgp.pixel, Point2i::new(9, 8));
        assert_eq!(sgp.jacobian, 1.0);
        assert_eq!(sgp.pdf_ratio, 1.0);
        let g = sgp.gather().expect("shifted gather");
        let bg = base.gather.unwrap();
        assert_eq!(g.depth, bg.depth);
        assert!((g.p.x - bg.p.x).abs() > 1e-4);
        assert!((g.p.z - bg.p.z).abs() < 1e-3);
    }

    #[test]
    fn border_pixels_fail() {
        let scene = cornell_box(Point2i::new(4, 4), DemoScene::Cornell);
        let config = config();
        for (pixel, dir) in [
            (Point2i::new(0, 1), ShiftDirection::Left),
            (Point2i::new(3, 1), ShiftDirection::Right),
            (Point2i::new(1, 0), ShiftDirection::Top),
            (Point2i::new(1, 3), ShiftDirection::Bottom),
        ] {
            let mut sampler = IndependentSampler::new(5);
            let base = trace_camera_path(&scene, &config, &pixel, &mut sampler);
            let sgp = shift_camera_path(&scene, &config, &base, &pixel, dir);
            assert!(!sgp.valid);
            assert!(sgp.gather().is_none());
        }
    }

    #[test]
    fn mirror_chains_keep_their_length() {
        let scene = cornell_box(Point2i::new(64, 64), DemoScene::Mirror);
        let config = config();
        let mut checked = 0;
        for y in 32..64 {
            for x in 1..63 {
                let pixel = Point2i::new(x, y);
                let mut sampler = IndependentSampler::new((y * 64 + x) as u64);
                let base = trace_camera_path(&scene, &config, &pixel, &mut sampler);
                let depth = match base.gather {
                    Some(g) if g.depth > 1 => g.depth,
                    _ => continue,
                };
                let sgp = shift_camera_path(&scene, &config, &base, &pixel, ShiftDirection::Right);
                if let Some(g) = sgp.gather() {
                    assert_eq!(g.depth, depth);
                    assert!(sgp.jacobian > 0.0);
                    checked += 1;
                }
            }
        }
        assert!(checked > 0);
    }
}
