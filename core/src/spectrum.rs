//! Spectrum

use crate::base::*;
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

/// Number of samples used in `Spectrum`.
pub const SPECTRUM_SAMPLES: usize = 3;

/// Linear RGB radiometric quantity.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Spectrum {
    /// Red, green and blue samples.
    pub c: [Float; SPECTRUM_SAMPLES],
}

impl Spectrum {
    /// All channels zero.
    pub const ZERO: Self = Self { c: [0.0; SPECTRUM_SAMPLES] };

    /// All channels one.
    pub const ONE: Self = Self { c: [1.0; SPECTRUM_SAMPLES] };

    /// Returns a spectrum with the same value in every channel.
    ///
    /// * `v` - The value.
    pub const fn new(v: Float) -> Self {
        Self { c: [v; SPECTRUM_SAMPLES] }
    }

    /// Returns a spectrum from RGB values.
    ///
    /// * `r` - Red.
    /// * `g` - Green.
    /// * `b` - Blue.
    pub const fn rgb(r: Float, g: Float, b: Float) -> Self {
        Self { c: [r, g, b] }
    }

    /// Returns true if every channel is zero.
    pub fn is_black(&self) -> bool {
        self.c.iter().all(|v| *v == 0.0)
    }

    /// Returns true if no channel is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.c.iter().all(|v| v.is_finite())
    }

    /// Returns the luminance.
    pub fn y(&self) -> Float {
        0.212671 * self.c[0] + 0.715160 * self.c[1] + 0.072169 * self.c[2]
    }

    /// Returns the mean of the channels.
    pub fn average(&self) -> Float {
        self.c.iter().sum::<Float>() / SPECTRUM_SAMPLES as Float
    }

    /// Returns the largest channel.
    pub fn max_component(&self) -> Float {
        self.c.iter().fold(-INFINITY, |m, v| max(m, *v))
    }

    /// Applies a function to every channel.
    ///
    /// * `f` - The function.
    pub fn map<F: Fn(Float) -> Float>(&self, f: F) -> Self {
        Self {
            c: [f(self.c[0]), f(self.c[1]), f(self.c[2])],
        }
    }

    /// Returns the channel-wise absolute value.
    pub fn abs(&self) -> Self {
        self.map(|v| v.abs())
    }

    /// Returns the channel-wise exponential.
    pub fn exp(&self) -> Self {
        self.map(|v| v.exp())
    }

    /// Zeroes strictly negative channels and leaves the others untouched.
    pub fn clamp_negative(&self) -> Self {
        self.map(|v| if v < 0.0 { 0.0 } else { v })
    }

    /// Replaces non-finite channels with zero. Returns the sanitised value
    /// and whether anything was replaced.
    pub fn sanitized(&self) -> (Self, bool) {
        let clean = self.map(|v| if v.is_finite() { v } else { 0.0 });
        (clean, !self.is_finite())
    }

    /// Channel-wise division that maps `x / 0` to zero.
    ///
    /// * `other` - The divisor.
    pub fn safe_div(&self, other: &Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..SPECTRUM_SAMPLES {
            r.c[i] = if other.c[i] != 0.0 { self.c[i] / other.c[i] } else { 0.0 };
        }
        r
    }
}

impl Add for Spectrum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::rgb(self.c[0] + other.c[0], self.c[1] + other.c[1], self.c[2] + other.c[2])
    }
}

impl AddAssign for Spectrum {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Spectrum {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::rgb(self.c[0] - other.c[0], self.c[1] - other.c[1], self.c[2] - other.c[2])
    }
}

impl SubAssign for Spectrum {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul for Spectrum {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self::rgb(self.c[0] * other.c[0], self.c[1] * other.c[1], self.c[2] * other.c[2])
    }
}

impl MulAssign for Spectrum {
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl Mul<Float> for Spectrum {
    type Output = Self;

    fn mul(self, f: Float) -> Self {
        self.map(|v| v * f)
    }
}

impl Mul<Spectrum> for Float {
    type Output = Spectrum;

    fn mul(self, s: Spectrum) -> Spectrum {
        s * self
    }
}

impl MulAssign<Float> for Spectrum {
    fn mul_assign(&mut self, f: Float) {
        *self = *self * f;
    }
}

impl Div<Float> for Spectrum {
    type Output = Self;

    fn div(self, f: Float) -> Self {
        debug_assert!(f != 0.0);
        let inv = 1.0 / f;
        self * inv
    }
}

impl DivAssign<Float> for Spectrum {
    fn div_assign(&mut self, f: Float) {
        *self = *self / f;
    }
}

impl Neg for Spectrum {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl Index<usize> for Spectrum {
    type Output = Float;

    fn index(&self, i: usize) -> &Float {
        &self.c[i]
    }
}

impl IndexMut<usize> for Spectrum {
    fn index_mut(&mut self, i: usize) -> &mut Float {
        &mut self.c[i]
    }
}

impl fmt::Display for Spectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.c[0], self.c[1], self.c[2])
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
