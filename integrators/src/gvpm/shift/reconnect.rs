//! Diffuse reconnection

use super::*;

/// Reconnects a shifted photon position to the parent vertex of the base
/// light path. Returns `None` when the parent cannot reach the shifted
/// position.
///
/// * `scene`          - The scene.
/// * `parent`         - Parent vertex of the base photon.
/// * `base`           - Base photon position.
/// * `base_normal`    - Surface normal at the base photon. `None` in media.
/// * `shifted`        - Shifted photon position.
/// * `shifted_normal` - Surface normal at the shifted photon. `None` in media.
pub fn reconnect(
    scene: &dyn Scene,
    parent: &LightVertex,
    base: &Point3f,
    base_normal: Option<Normal3f>,
    shifted: &Point3f,
    shifted_normal: Option<Normal3f>,
) -> Option<LightShift> {
    let to_base = parent.position - *base;
    let to_shifted = parent.position - *shifted;
    let dist2_base = to_base.length_squared();
    let dist2_shifted = to_shifted.length_squared();
    if dist2_base == 0.0 || dist2_shifted == 0.0 {
        return None;
    }
    let wi_base = to_base / dist2_base.sqrt();
    let wi = to_shifted / dist2_shifted.sqrt();

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

    let f_base = parent.scatter(&-wi_base) * scene.transmittance(&parent.position, base);
    if f_base.is_black() {
        return None;
    }
    let f_shifted = parent.scatter(&-wi);
    if f_shifted.is_black() || !scene.visible(&parent.position, shifted) {
        return None;
    }
    let f_shifted = f_shifted * scene.transmittance(&parent.position, shifted);

    let pdf_base = parent.pdf(&-wi_base);
    let pdf_ratio = if pdf_base > 0.0 {
        parent.pdf(&-wi) / pdf_base
    } else {
        1.0
    };

    Some(LightShift {
        wi,
        flux_ratio: f_shifted.safe_div(&f_base),
        jacobian: cos_ratio * dist2_base / dist2_shifted,
        pdf_ratio,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
