//! Sampler

use crate::base::*;
use crate::geometry::*;
use crate::rng::*;

/// Sampler interface.
pub trait Sampler: Send {
    /// Generates a new instance of an initial `Sampler` for use by a
    /// rendering thread or a work unit.
    ///
    /// * `seed` - The seed for the random number generator.
    fn clone_sampler(&self, seed: u64) -> Box<dyn Sampler>;

    /// Returns the sample value for the next dimension of the current sample vector.
    fn get_1d(&mut self) -> Float;

    /// Returns the sample value for the next two dimensions of the current sample vector.
    fn get_2d(&mut self) -> Point2f;
}

// Implement `Sampler` so `Box<dyn Sampler>` can be passed around where
// `&mut dyn Sampler` can be used.
impl<S: Sampler + ?Sized> Sampler for Box<S> {
    #[inline]
    fn clone_sampler(&self, seed: u64) -> Box<dyn Sampler> {
        (**self).clone_sampler(seed)
    }

    #[inline]
    fn get_1d(&mut self) -> Float {
        (**self).get_1d()
    }

    #[inline]
    fn get_2d(&mut self) -> Point2f {
        (**self).get_2d()
    }
}

/// Sampler returning independent uniform random values.
#[derive(Clone, Debug)]
pub struct IndependentSampler {
    rng: RNG,
}

impl IndependentSampler {
    /// Returns a new `IndependentSampler`.
    ///
    /// * `seed` - Sequence index for the random number generator.
    pub fn new(seed: u64) -> Self {
        Self { rng: RNG::new(seed) }
    }
}

impl Sampler for IndependentSampler {
    fn clone_sampler(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(Self::new(seed))
    }

    fn get_1d(&mut self) -> Float {
        self.rng.uniform_float()
    }

    fn get_2d(&mut self) -> Point2f {
        let x = self.rng.uniform_float();
        let y = self.rng.uniform_float();
        Point2f::new(x, y)
    }
}
