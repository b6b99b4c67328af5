//! Random sampling for bot decisions.
//!
//! There is no hidden global generator: each caller owns a [`RandomGenerator`] and passes it
//! where it is needed. Seed it with [`RandomGenerator::from_seed`] for reproducible games.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::Point2D;

/// A random number generator owned by its caller.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    rng: StdRng,
}

impl RandomGenerator {
    /// A generator seeded from the operating system.
    pub fn new() -> Self {
        RandomGenerator {
            rng: StdRng::from_entropy(),
        }
    }

    /// A deterministic generator: equal seeds give equal sequences.
    pub fn from_seed(seed: u64) -> Self {
        RandomGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform value in `[-1, 1)`.
    pub fn scalar(&mut self) -> f32 {
        self.rng.gen_range(-1.0..1.0)
    }

    /// Uniform value in `[0, 1)`.
    pub fn fraction(&mut self) -> f32 {
        self.rng.gen_range(0.0..1.0)
    }

    /// Uniform integer in `[min, max]`, both ends included.
    ///
    /// # Panics
    /// Panics if `min > max`.
    pub fn integer(&mut self, min: i32, max: i32) -> i32 {
        self.rng.gen_range(min..=max)
    }

    /// Uniform point in the rectangle spanned by `min` and `max`.
    pub fn point_in(&mut self, min: Point2D, max: Point2D) -> Point2D {
        Point2D::new(
            min.x + (max.x - min.x) * self.fraction(),
            min.y + (max.y - min.y) * self.fraction(),
        )
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}
