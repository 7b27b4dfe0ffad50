//! Manifold walk over perfect mirrors

use super::*;

/// Distance below which two successive mirror points are considered equal.
const MANIFOLD_EPSILON: Float = 1e-4;

/// Finds the mirror point connecting the grandparent of a photon to a
/// shifted photon position. The mirror is linearised as a plane at the
/// current estimate; the grandparent is reflected across it and the line to
/// the shifted position is intersected with the plane, then projected back
/// on the actual surface by ray casting. The Jacobian uses the unfolded
/// path length through the mirror.
///
/// * `scene`          - The scene.
/// * `config`         - Integrator settings.
/// * `grandparent`    - Vertex before the mirror.
/// * `mirror`         - Mirror vertex of the base path.
/// * `base`           - Base photon position.
/// * `base_normal`    - Surface normal at the base photon. `None` in media.
/// * `shifted`        - Shifted photon position.
/// * `shifted_normal` - Surface normal at the shifted photon. `None` in media.
#[allow(clippy::too_many_arguments)]
pub fn manifold_walk(
    scene: &dyn Scene,
    config: &GVPMConfig,
    grandparent: &LightVertex,
    mirror: &LightVertex,
    base: &Point3f,
    base_normal: Option<Normal3f>,
    shifted: &Point3f,
    shifted_normal: Option<Normal3f>,
) -> Option<LightShift> {
    let base_reflectance = match mirror.kind {
        LightVertexKind::Surface { bsdf } if bsdf.is_delta() => bsdf.reflectance(),
        _ => return None,
    };
    let z = grandparent.position;
    let mut m = mirror.position;
    let mut n = mirror.normal?;
    let mut reflectance = base_reflectance;

    let mut converged = false;
    for _ in 0..max(config.max_manifold_iterations, 1) {
        let z_mirrored = z - n * (2.0 * (z - m).dot(&n));
        let d = z_mirrored - *shifted;
        let denom = d.dot(&n);
        if denom.abs() < 1e-8 {
            return None;
        }
        let s = (m - *shifted).dot(&n) / denom;
        if s <= 0.0 || s >= 1.0 {
            return None;
        }
        let dir = d.normalize();
        let ray = match shifted_normal {
            Some(ns) => Ray::spawn(shifted, &ns, &dir),
            None => Ray::unbounded(*shifted, dir),
        };
        let si = scene.intersect(&ray)?;
        if !si.bsdf.is_delta() {
            return None;
        }
        let moved = si.p.distance(&m);
        m = si.p;
        n = si.facing_normal(&-dir);
        reflectance = si.bsdf.reflectance();
        if moved < MANIFOLD_EPSILON {
            converged = true;
            break;
        }
    }
    if !converged {
        return None;
    }

    // The converged point must reflect the grandparent onto the shifted photon.
    let y = m;
    let to_z = z - y;
    let to_x = *shifted - y;
    let (dist_z, dist_x) = (to_z.length(), to_x.length());
    if dist_z == 0.0 || dist_x == 0.0 {
        return None;
    }
    let wz = to_z / dist_z;
    let wx = to_x / dist_x;
    if wz.dot(&n) <= 0.0 || (reflect(&wz, &n) - wx).length() > 1e-2 {
        return None;
    }
    if !scene.visible(&z, &y) {
        return None;
    }

    // Base geometry through the base mirror point.
    let yb = mirror.position;
    let dist_zb = (z - yb).length();
    let dist_xb = (*base - yb).length();
    if dist_zb == 0.0 || dist_xb == 0.0 {
        return None;
    }
    let dir_base = (yb - z) / dist_zb;
    let dir_shifted = -wz;
    let wi_base = (yb - *base) / dist_xb;
    let wi = -wx;

    let cos_ratio = match (base_normal, shifted_normal) {
        (Some(nb), Some(ns)) => {
            let cos_base = wi_base.dot(&nb);
            let cos_shifted = wi.dot(&ns);
            if cos_base <= 0.0 || cos_shifted <= 0.0 {
                return None;
            }
            cos_shifted / cos_base
        }
        _ => 1.0,
    };

    let f_base = grandparent.scatter(&dir_base)
        * base_reflectance
        * scene.transmittance(&z, &yb)
        * scene.transmittance(&yb, base);
    if f_base.is_black() {
        return None;
    }
    let f_shifted =
        grandparent.scatter(&dir_shifted) * reflectance * scene.transmittance(&z, &y) * scene.transmittance(&y, shifted);

    let unfolded_base = dist_zb + dist_xb;
    let unfolded = dist_z + dist_x;
    let pdf_base = grandparent.pdf(&dir_base);
    let pdf_ratio = if pdf_base > 0.0 {
        grandparent.pdf(&dir_shifted) / pdf_base
    } else {
        1.0
    };

    Some(LightShift {
        wi,
        flux_ratio: f_shifted.safe_div(&f_base),
        jacobian: cos_ratio * sqr(unfolded_base) / sqr(unfolded),
        pdf_ratio,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use gvpm_core::camera::PinholeCamera;
    use gvpm_core::reflection::BSDF;
    use gvpm_core::shape::Shape;

    fn mirror_floor() -> SimpleScene {
        let camera = PinholeCamera::new(
            Point3f::new(0.0, 1.0, -5.0),
            Point3f::zero(),
            Vector3f::new(0.0, 1.0, 0.0),
            40.0,
            Point2i::new(4, 4),
        );
        let mut scene = SimpleScene::new(camera);
        scene.add_object(
            Shape::quad(Point3f::new(-5.0, 0.0, -5.0), Vector3f::new(0.0, 0.0, 10.0), Vector3f::new(10.0, 0.0, 0.0)),
            BSDF::Mirror {
                reflectance: Spectrum::new(0.9),
            },
        );
        scene
    }

    fn mirror_vertex() -> LightVertex {
        let wi = Vector3f::new(-1.0, 1.0, 0.0).normalize();
        LightVertex::surface(
            Point3f::zero(),
            Vector3f::new(0.0, 1.0, 0.0),
            wi,
            BSDF::Mirror {
                reflectance: Spectrum::new(0.9),
            },
        )
    }

    #[test]
    fn walk_finds_planar_mirror_point() {
        let scene = mirror_floor();
        let config = GVPMConfig::default();
        let z = LightVertex::emitter(Point3f::new(-1.0, 1.0, 0.0), None);
        let down = Some(Vector3f::new(0.0, -1.0, 0.0));
        let base = Point3f::new(1.0, 1.0, 0.0);
        let shifted = Point3f::new(1.5, 1.0, 0.0);
        let ls = manifold_walk(&scene, &config, &z, &mirror_vertex(), &base, down, &shifted, down).unwrap();

        // Mirror point at (0.25, 0, 0).
        let leg: Float = (1.25 as Float * 1.25 + 1.0).sqrt();
        let expected_wi = Vector3f::new(-1.25, -1.0, 0.0) / leg;
        assert!((ls.wi - expected_wi).length() < 1e-3);

        let cos_base = (0.5 as Float).sqrt();
        let cos_shifted = 1.0 / leg;
        let expected = (cos_shifted / cos_base) * 8.0 / sqr(2.0 * leg);
        assert!(approx_eq!(f32, ls.jacobian, expected, epsilon = 1e-3));
        assert!(approx_eq!(f32, ls.flux_ratio.y(), 1.0, epsilon = 1e-4));
        assert!(approx_eq!(f32, ls.pdf_ratio, 1.0, epsilon = 1e-4));
    }

    #[test]
    fn walk_fails_when_mirror_is_missed() {
        let scene = mirror_floor();
        let config = GVPMConfig::default();
        let z = LightVertex::emitter(Point3f::new(-1.0, 1.0, 0.0), None);
        let down = Some(Vector3f::new(0.0, -1.0, 0.0));
        let base = Point3f::new(1.0, 1.0, 0.0);
        let far = Point3f::new(30.0, 1.0, 0.0);
        assert!(manifold_walk(&scene, &config, &z, &mirror_vertex(), &base, down, &far, down).is_none());
    }
}
