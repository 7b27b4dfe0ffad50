//! Beam radiance estimate

use super::*;

impl BreKernel {
    /// Returns the kernel value at distance `h` from the photon, or 0
    /// outside the radius.
    ///
    /// * `h2` - Squared distance of the camera ray to the photon.
    /// * `r`  - Kernel radius.
    pub fn eval(&self, h2: Float, r: Float) -> Float {
        let r2 = r * r;
        if h2 > r2 {
            return 0.0;
        }
        match self {
            Self::Disc => 1.0 / (PI * r2),
            Self::Sphere => 2.0 * (r2 - h2).sqrt() * 3.0 / (4.0 * PI * r2 * r),
        }
    }
}

/// Intersects a camera edge with the photon spheres of the pass.
///
/// * `ctx`    - Phase context.
/// * `query`  - Camera edge inside the medium.
/// * `kernel` - Kernel shape.
/// * `shifts` - Shifted gather points.
/// * `stats`  - Shift counters.
/// * `rec`    - Contributions of the pass.
pub fn gather(
    ctx: &VolumeContext,
    query: &EdgeQuery,
    kernel: BreKernel,
    shifts: &ShiftSet,
    stats: &mut ShiftStats,
    rec: &mut GradientRecord,
) {
    let map = match ctx.map {
        VolumePhotonMap::Spheres(map) => map,
        _ => return,
    };
    let medium = ctx.medium;
    let phase = medium.phase();
    let edge = query.edge;
    let wo = -edge.d;

    map.query_ray(&query.ray(), |sphere| {
        let photon = &sphere.photon;
        let t = (photon.position - edge.origin).dot(&edge.d);
        if t < query.t0 || t > query.t1 {
            return;
        }
        let x = edge.at(t);
        let k = kernel.eval(photon.position.distance_squared(&x), sphere.radius);
        if k == 0.0 || !ctx.config.accepts_volume_length(query.camera_depth() + photon.depth) {
            return;
        }
        let c = query.weight(medium, t) * phase.p(&wo, &photon.wi) * photon.flux * k;
        if c.is_black() {
            return;
        }
        rec.m += 1.0;
        rec.base += c;

        for sgp in shifts.iter() {
            let shifted = shifted_edge(sgp, query.index, t).and_then(|se| {
                let pos = photon.position + (se.at(t) - x);
                let ls = shift_photon(ctx.scene, ctx.config, photon, &pos, None, stats)?;
                let jacobian = sgp.jacobian * ls.jacobian;
                let w = se.throughput * se.transmittance_to(medium, t);
                let c_shift = w * phase.p(&-se.d, &ls.wi) * photon.flux * ls.flux_ratio * k * jacobian;
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
    use float_cmp::approx_eq;

    #[test]
    fn kernels_vanish_outside_radius() {
        assert_eq!(BreKernel::Disc.eval(0.26, 0.5), 0.0);
        assert_eq!(BreKernel::Sphere.eval(0.26, 0.5), 0.0);
        assert!(approx_eq!(f32, BreKernel::Disc.eval(0.1, 0.5), 1.0 / (PI * 0.25), ulps = 4));
        assert!(approx_eq!(f32, BreKernel::Sphere.eval(0.25, 0.5), 0.0, epsilon = 1e-6));
    }

    #[test]
    fn sphere_kernel_integrates_to_one_across_the_disc() {
        // Integrating the chord kernel over the disc gives the sphere volume.
        let r: Float = 0.5;
        let n = 400;
        let dh = r / n as Float;
        let total: Float = (0..n)
            .map(|i| {
                let h = (i as Float + 0.5) * dh;
                BreKernel::Sphere.eval(h * h, r) * TWO_PI * h * dh
            })
            .sum();
        assert!(approx_eq!(f32, total, 1.0, epsilon = 1e-3));
    }
}
