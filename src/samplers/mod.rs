//! Defines the `Sampler` trait - an object that can randomly draw full
//! valuations from a model - and the sampling-based partition estimators.
//!
//! Every entry point takes the random source as an argument, so a caller
//! holding a seeded generator gets reproducible runs.

use crate::variable::Evidence;

use rand::Rng;

pub mod forward;
pub mod gibbs;
pub mod likelihood;

pub use self::forward::ForwardSampler;
pub use self::gibbs::GibbsSampler;
pub use self::likelihood::LikelihoodWeightedSampler;

pub trait Sampler {
    /// Draw a full valuation from the associated model.
    fn sample<R: Rng>(&mut self, rng: &mut R) -> Evidence;
}

/// A full valuation and its importance weight.
pub struct WeightedSample(pub Evidence, pub f64);

pub trait WeightedSampler {
    /// Draw a full valuation together with its weight.
    fn weighted_sample<R: Rng>(&mut self, rng: &mut R) -> WeightedSample;
}
