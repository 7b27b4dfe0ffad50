//! Point photon lookups at sampled distances

use super::*;

/// Samples distances along a camera edge and gathers the point photons
/// within the per pixel radius around each of them.
///
/// * `ctx`       - Phase context.
/// * `query`     - Camera edge inside the medium.
/// * `scale_vol` - Per pixel kernel multiplier.
/// * `shifts`    - Shifted gather points.
/// * `stats`     - Shift counters.
/// * `sampler`   - Sampler of the tile.
/// * `rec`       - Contributions of the pass.
pub fn gather(
    ctx: &VolumeContext,
    query: &EdgeQuery,
    scale_vol: Float,
    shifts: &ShiftSet,
    stats: &mut ShiftStats,
    sampler: &mut dyn Sampler,
    rec: &mut GradientRecord,
) {
    let map = match ctx.map {
        VolumePhotonMap::Points(map) => map,
        _ => return,
    };
    let medium = ctx.medium;
    let phase = medium.phase();
    let radius = ctx.radius.base * scale_vol;
    if radius <= 0.0 {
        return;
    }
    let r2 = radius * radius;
    let kernel = 3.0 / (4.0 * PI * r2 * radius);
    let samples = max(ctx.config.nb_camera_samples, 1);
    let length = query.t1 - query.t0;
    let wo = -query.edge.d;

    for s in 0..samples {
        let u = if ctx.config.stratified {
            (s as Float + sampler.get_1d()) / samples as Float
        } else {
            sampler.get_1d()
        };
        let (dist, pdf) = medium.sample_truncated(length, min(u, 1.0 - Float::EPSILON));
        if pdf <= 0.0 {
            continue;
        }
        let t = query.t0 + dist;
        let p = query.edge.at(t);
        let weight = query.weight(medium, t) * (kernel / (pdf * samples as Float));

        map.query_sphere(&p, radius, |photon| {
            if photon.position.distance_squared(&p) > r2 {
                return;
            }
            if !ctx.config.accepts_volume_length(query.camera_depth() + photon.depth) {
                return;
            }
            let c = weight * phase.p(&wo, &photon.wi) * photon.flux;
            if c.is_black() {
                return;
            }
            rec.m += 1.0;
            rec.base += c;

            for sgp in shifts.iter() {
                let shifted = shifted_edge(sgp, query.index, t).and_then(|se| {
                    let ps = se.at(t);
                    let pos = photon.position + (ps - p);
                    let ls = shift_photon(ctx.scene, ctx.config, photon, &pos, None, stats)?;
                    let jacobian = sgp.jacobian * ls.jacobian;
                    let w = se.throughput * se.transmittance_to(medium, t) * (kernel / (pdf * samples as Float));
                    let c_shift = w * phase.p(&-se.d, &ls.wi) * photon.flux * ls.flux_ratio * jacobian;
                    Some((c_shift, sgp.pdf_ratio * ls.pdf_ratio * jacobian))
                });
                rec.add_shift(sgp.direction.index(), c, shifted, ctx.config.use_mis);
            }
        });
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
