//! Progressive radius reduction

use super::config::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;

/// Fraction of the medium bounding sphere radius used as the base volume
/// kernel radius.
pub const VOLUME_RADIUS_FRACTION: Float = 0.1;

/// Global volume kernel radius of a pass, `base * scale`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VolumeRadius {
    /// Radius at scale 1.
    pub base: Float,

    /// Current scale.
    pub scale: Float,
}

impl VolumeRadius {
    /// Returns the initial radius for a medium.
    ///
    /// * `medium_bounds` - Bounds of the medium.
    /// * `initial_scale` - Initial scale.
    pub fn new(medium_bounds: &Bounds3f, initial_scale: Float) -> Self {
        let (_, radius) = medium_bounds.bounding_sphere();
        Self {
            base: radius * VOLUME_RADIUS_FRACTION,
            scale: initial_scale,
        }
    }

    /// Returns the kernel radius.
    #[inline]
    pub fn radius(&self) -> Float {
        self.base * self.scale
    }

    /// Returns the radius used after pass `it`.
    ///
    /// * `it`        - 1-based pass number.
    /// * `alpha`     - Progressive reduction parameter.
    /// * `dimension` - Kernel dimension.
    pub fn reduced(&self, it: Int, alpha: Float, dimension: KernelDimension) -> Self {
        let it = max(it, 1) as Float;
        let ratio = (it - 1.0 + alpha) / it;
        Self {
            base: self.base,
            scale: self.scale * dimension.reduce(ratio),
        }
    }
}

/// Progressive update of a per pixel count. Returns the ratio
/// `(n + alpha m) / (n + m)` and adds `alpha m` to the count, or returns
/// `None` when no photon was found.
///
/// * `n`     - Accumulated count.
/// * `m`     - Photons found this pass.
/// * `alpha` - Progressive reduction parameter.
pub fn apa_ratio(n: &mut Float, m: Float, alpha: Float) -> Option<Float> {
    if m <= 0.0 {
        return None;
    }
    let n_new = *n + alpha * m;
    let ratio = n_new / (*n + m);
    *n = n_new;
    Some(ratio)
}

/// Shrinks a surface radius after a pass.
///
/// * `n`      - Accumulated count.
/// * `radius` - Surface radius.
/// * `m`      - Photons found this pass.
/// * `alpha`  - Progressive reduction parameter.
pub fn update_surface_radius(n: &mut Float, radius: &mut Float, m: Float, alpha: Float) {
    if let Some(ratio) = apa_ratio(n, m, alpha) {
        *radius *= ratio.sqrt();
    }
}

/// Shrinks a per pixel volume scale after a pass of the distance technique.
///
/// * `n_vol` - Accumulated count.
/// * `scale` - Per pixel volume scale.
/// * `m`     - Photons found this pass.
/// * `alpha` - Progressive reduction parameter.
pub fn update_volume_scale(n_vol: &mut Float, scale: &mut Float, m: Float, alpha: Float) {
    if let Some(ratio) = apa_ratio(n_vol, m, alpha) {
        *scale *= ratio.cbrt();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    #[test]
    fn no_photons_keeps_radius() {
        let (mut n, mut r) = (3.0, 0.5);
        update_surface_radius(&mut n, &mut r, 0.0, 0.7);
        assert_eq!((n, r), (3.0, 0.5));
    }

    #[test]
    fn first_pass_ratio_is_alpha() {
        let (mut n, mut r) = (0.0, 1.0);
        update_surface_radius(&mut n, &mut r, 10.0, 0.5);
        assert!(approx_eq!(f32, n, 5.0, ulps = 2));
        assert!(approx_eq!(f32, r, (0.5 as Float).sqrt(), ulps = 2));
    }

    #[test]
    fn global_scale_follows_kernel_dimension() {
        let vr = VolumeRadius { base: 2.0, scale: 1.0 };
        assert_eq!(vr.reduced(1, 0.5, KernelDimension::Zero).scale, 1.0);
        assert!(approx_eq!(f32, vr.reduced(1, 0.5, KernelDimension::One).scale, 0.5, ulps = 2));
        assert!(approx_eq!(f32, vr.reduced(1, 0.5, KernelDimension::Two).scale, (0.5 as Float).sqrt(), ulps = 2));
        assert!(approx_eq!(f32, vr.reduced(1, 0.5, KernelDimension::Three).scale, (0.5 as Float).cbrt(), ulps = 2));
        // (2 - 1 + 0.5) / 2
        assert!(approx_eq!(f32, vr.reduced(2, 0.5, KernelDimension::One).scale, 0.75, ulps = 2));
        assert_eq!(vr.reduced(4, 0.5, KernelDimension::Three).base, 2.0);
    }

    #[test]
    fn base_radius_from_medium_bounds() {
        let b = Bounds3f::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        let vr = VolumeRadius::new(&b, 0.5);
        assert!(approx_eq!(f32, vr.base, (3.0 as Float).sqrt() * VOLUME_RADIUS_FRACTION, epsilon = 1e-6));
        assert!(approx_eq!(f32, vr.radius(), vr.base * 0.5, ulps = 2));
    }

    proptest! {
        #[test]
        fn counts_grow_and_radii_shrink(
            n0 in 0.0..1000.0f32,
            ms in proptest::collection::vec(0.0..50.0f32, 1..20),
            alpha in 0.01..0.99f32,
        ) {
            let (mut n, mut r) = (n0, 1.0);
            let (mut n_vol, mut s) = (n0, 1.0);
            for m in ms {
                let (n_prev, r_prev, s_prev) = (n, r, s);
                update_surface_radius(&mut n, &mut r, m, alpha);
                update_volume_scale(&mut n_vol, &mut s, m, alpha);
                prop_assert!(n >= n_prev);
                prop_assert!(r <= r_prev);
                prop_assert!(s <= s_prev);
                prop_assert!(r > 0.0);
            }
        }
    }
}
