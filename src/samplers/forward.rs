//! Defines a simple forward sampler for `BayesNet`s and the logical
//! (rejection) sampling estimator of the partition function.
//!
//! Implementation of Koller & Friedman Algorithm 12.1

use crate::inference::SamplingOptions;
use crate::model::directed::BayesNet;
use crate::model::Model;
use crate::variable::Evidence;

use super::Sampler;

use log::debug;
use rand::Rng;

/// A stateless sampler that walks the topological order, drawing each
/// variable from its conditional given the ancestors already drawn.
pub struct ForwardSampler<'a> {
    model: &'a BayesNet,
}

impl<'a> ForwardSampler<'a> {
    pub fn new(model: &'a BayesNet) -> Self {
        ForwardSampler { model }
    }
}

impl<'a> Sampler for ForwardSampler<'a> {
    fn sample<R: Rng>(&mut self, rng: &mut R) -> Evidence {
        let mut valuation = Evidence::new();
        for &id in self.model.sampling_order() {
            let (variable, value) = self.model.factors()[id]
                .sample(&valuation, rng)
                .expect("a topological order values every parent before its children");
            valuation.insert(variable, value);
        }
        valuation
    }
}

/// Estimate the partition of the evidence by rejection: the fraction of
/// `M = ceil(3 ln(2/delta) / epsilon^2 / lower_bound)` forward samples that
/// agree with every observed value.
pub fn estimate_partition<R: Rng>(
    model: &BayesNet,
    evidence: &Evidence,
    options: &SamplingOptions,
    rng: &mut R,
) -> f64 {
    let samples = (3.0 * (2.0 / options.delta).ln()
        / (options.epsilon * options.epsilon)
        / options.lower_bound)
        .ceil() as usize;
    let samples = samples.clamp(1, options.max_samples.max(1));

    let mut sampler = ForwardSampler::new(model);
    let mut accepted = 0usize;
    for _ in 0..samples {
        let valuation = sampler.sample(rng);
        if evidence
            .iter()
            .all(|(id, value)| valuation.get(id) == Some(value))
        {
            accepted += 1;
        }
    }

    debug!("logical sampling accepted {} of {} samples", accepted, samples);
    accepted as f64 / samples as f64
}
