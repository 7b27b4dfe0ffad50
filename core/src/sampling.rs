//! Sampling routines and the piecewise-constant 1D distribution.

use crate::base::*;
use crate::geometry::*;
use crate::rng::ONE_MINUS_EPSILON;

/// Returns the largest index `i` in `[0, size - 2]` for which `pred(i)` holds,
/// assuming `pred` is true then false over the range.
///
/// * `size` - Number of entries.
/// * `pred` - The predicate.
pub fn find_interval<P>(size: usize, pred: P) -> usize
where
    P: Fn(usize) -> bool,
{
    let (mut first, mut len) = (0, size);
    while len > 0 {
        let half = len >> 1;
        let middle = first + half;
        if pred(middle) {
            first = middle + 1;
            len -= half + 1;
        } else {
            len = half;
        }
    }
    clamp(first as isize - 1, 0, size as isize - 2) as usize
}

/// Maps a unit square sample to the unit disk preserving strata.
///
/// * `u` - Sample in [0, 1)^2.
pub fn concentric_sample_disk(u: &Point2f) -> Point2f {
    let ox = 2.0 * u.x - 1.0;
    let oy = 2.0 * u.y - 1.0;
    if ox == 0.0 && oy == 0.0 {
        return Point2f::new(0.0, 0.0);
    }
    let (r, theta) = if ox.abs() > oy.abs() {
        (ox, 0.25 * PI * (oy / ox))
    } else {
        (oy, 0.5 * PI - 0.25 * PI * (ox / oy))
    };
    Point2f::new(r * theta.cos(), r * theta.sin())
}

/// Cosine weighted direction in the local hemisphere around +z.
///
/// * `u` - Sample in [0, 1)^2.
pub fn cosine_sample_hemisphere(u: &Point2f) -> Vector3f {
    let d = concentric_sample_disk(u);
    let z = safe_sqrt(1.0 - d.x * d.x - d.y * d.y);
    Vector3f::new(d.x, d.y, z)
}

/// PDF of `cosine_sample_hemisphere`.
///
/// * `cos_theta` - Cosine with +z.
pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    max(0.0, cos_theta) * INV_PI
}

/// Uniform direction on the unit sphere.
///
/// * `u` - Sample in [0, 1)^2.
pub fn uniform_sample_sphere(u: &Point2f) -> Vector3f {
    let z = 1.0 - 2.0 * u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = TWO_PI * u.y;
    Vector3f::new(r * phi.cos(), r * phi.sin(), z)
}

/// PDF of `uniform_sample_sphere`.
pub fn uniform_sphere_pdf() -> Float {
    INV_FOUR_PI
}

/// Represents a piecewise-constant 1D function’s PDF and CDF and provides
/// methods to perform this sampling efficiently.
#[derive(Clone, Debug)]
pub struct Distribution1D {
    /// Piecewise-constant function.
    pub func: Vec<Float>,

    /// CDF for `func`.
    pub cdf: Vec<Float>,

    /// Integral of `func`.
    pub func_int: Float,
}

impl Distribution1D {
    /// Returns a new `Distribution1D` for given piecewise-constant function.
    ///
    /// - `f` - Piecewise-constant 1D function.
    pub fn new(f: Vec<Float>) -> Self {
        let n = f.len();
        let mut cdf: Vec<Float> = Vec::with_capacity(n + 1);
        cdf.push(0.0);
        for i in 1..n + 1 {
            cdf.push(cdf[i - 1] + f[i - 1] / n as Float);
        }

        let func_int = cdf[n];
        if func_int == 0.0 {
            for (i, v) in cdf.iter_mut().enumerate().skip(1) {
                *v = i as Float / n as Float;
            }
        } else {
            for v in cdf.iter_mut().skip(1) {
                *v /= func_int;
            }
        }

        Self { func: f, cdf, func_int }
    }

    /// Returns the number of entries.
    pub fn count(&self) -> usize {
        self.func.len()
    }

    /// Return a sample from the discrete distribution given a random sample.
    /// Returns the index, its probability and the sample remapped to [0, 1)
    /// so it can be reused.
    ///
    /// - `u` - The random sample.
    pub fn sample_discrete(&self, u: Float) -> (usize, Float, Float) {
        let offset = find_interval(self.cdf.len(), |index| self.cdf[index] <= u);
        let width = self.cdf[offset + 1] - self.cdf[offset];
        let u_remapped = if width > 0.0 {
            clamp((u - self.cdf[offset]) / width, 0.0, ONE_MINUS_EPSILON)
        } else {
            0.0
        };
        (offset, self.discrete_pdf(offset), u_remapped)
    }

    /// Return the probability of sampling a given entry.
    ///
    /// * `index` - Entry index.
    pub fn discrete_pdf(&self, index: usize) -> Float {
        if self.func_int > 0.0 {
            self.func[index] / (self.func_int * self.count() as Float)
        } else {
            1.0 / self.count() as Float
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn discrete_follows_weights() {
        let d = Distribution1D::new(vec![1.0, 3.0]);
        let (i, pdf, _) = d.sample_discrete(0.1);
        assert_eq!(i, 0);
        assert!((pdf - 0.25).abs() < 1e-6);
        let (i, pdf, u) = d.sample_discrete(0.625);
        assert_eq!(i, 1);
        assert!((pdf - 0.75).abs() < 1e-6);
        assert!((u - 0.5).abs() < 1e-5);
    }

    #[test]
    fn zero_function_is_uniform() {
        let d = Distribution1D::new(vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(d.sample_discrete(0.6).0, 2);
        assert_eq!(d.discrete_pdf(1), 0.25);
    }

    proptest! {
        #[test]
        fn cosine_samples_upper_hemisphere(u0 in 0.0..1.0f32, u1 in 0.0..1.0f32) {
            let w = cosine_sample_hemisphere(&Point2f::new(u0, u1));
            prop_assert!(w.z >= 0.0);
            prop_assert!((w.length() - 1.0).abs() < 1e-4);
        }

        #[test]
        fn sphere_samples_are_unit(u0 in 0.0..1.0f32, u1 in 0.0..1.0f32) {
            let w = uniform_sample_sphere(&Point2f::new(u0, u1));
            prop_assert!((w.length() - 1.0).abs() < 1e-4);
        }

        #[test]
        fn remapped_sample_in_unit_interval(u in 0.0..1.0f32) {
            let d = Distribution1D::new(vec![0.5, 2.0, 0.0, 1.5]);
            let (i, pdf, r) = d.sample_discrete(u);
            prop_assert!(i < 4);
            prop_assert!(pdf > 0.0);
            prop_assert!((0.0..1.0).contains(&r));
        }
    }
}
