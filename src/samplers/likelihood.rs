//! Defines a likelihood-weighted sampler for `BayesNet`s and the importance
//! sampling estimator of the partition function.
//!
//! Implementation of Koller & Friedman Algorithm 12.2

use crate::factor::Factor;
use crate::inference::SamplingOptions;
use crate::model::directed::BayesNet;
use crate::model::Model;
use crate::variable::Evidence;

use super::{WeightedSample, WeightedSampler};

use log::debug;
use rand::Rng;

/// A sampler that walks the topological order, fixing evidence variables to
/// their observed values and multiplying the running weight by the
/// conditional probability of each observation.
pub struct LikelihoodWeightedSampler<'a> {
    model: &'a BayesNet,
    evidence: &'a Evidence,
}

impl<'a> LikelihoodWeightedSampler<'a> {
    pub fn new(model: &'a BayesNet, evidence: &'a Evidence) -> Self {
        LikelihoodWeightedSampler { model, evidence }
    }
}

impl<'a> WeightedSampler for LikelihoodWeightedSampler<'a> {
    fn weighted_sample<R: Rng>(&mut self, rng: &mut R) -> WeightedSample {
        let mut valuation = Evidence::new();
        let mut weight = 1.0;

        for &id in self.model.sampling_order() {
            let factor = &self.model.factors()[id];
            if let Some(&observed) = self.evidence.get(&id) {
                valuation.insert(id, observed);
                weight *= factor
                    .value(&valuation)
                    .expect("a topological order values every parent before its children");
            } else {
                let (variable, value) = factor
                    .sample(&valuation, rng)
                    .expect("a topological order values every parent before its children");
                valuation.insert(variable, value);
            }
        }

        WeightedSample(valuation, weight)
    }
}

/// Estimate the partition of the evidence from the mean sample weight.
///
/// Weights are normalized by `U`, the product of the factor maxima, and
/// samples are drawn until `4 ln(2/delta) (1 + epsilon) / epsilon^2`
/// normalized weight has accumulated or the sample budget runs out; the
/// budget is what terminates the loop under zero-mass evidence.
pub fn estimate_partition<R: Rng>(
    model: &BayesNet,
    evidence: &Evidence,
    options: &SamplingOptions,
    rng: &mut R,
) -> f64 {
    let bound: f64 = model.factors().iter().map(Factor::max).product();
    if bound <= 0.0 {
        return 0.0;
    }

    let target =
        4.0 * (2.0 / options.delta).ln() * (1.0 + options.epsilon)
            / (options.epsilon * options.epsilon);

    let mut sampler = LikelihoodWeightedSampler::new(model, evidence);
    let mut effective = 0.0;
    let mut drawn = 0usize;
    while effective < target && drawn < options.max_samples {
        let WeightedSample(_, weight) = sampler.weighted_sample(rng);
        effective += weight / bound;
        drawn += 1;
    }

    debug!(
        "likelihood weighting drew {} samples for {} effective",
        drawn, effective
    );
    if drawn == 0 {
        return 0.0;
    }
    bound * effective / drawn as f64
}
