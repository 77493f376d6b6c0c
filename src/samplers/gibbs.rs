//! Defines a Gibbs `Sampler` and the chain-based estimator of the partition
//! function.
//!
//! Implementation of Koller & Friedman Algorithm 12.4: each sweep resamples
//! every free variable from its Markov-blanket conditional, the product of
//! the factors that mention it under the current state of the chain.

use crate::factor::Factor;
use crate::inference::GibbsOptions;
use crate::model::directed::BayesNet;
use crate::model::Model;
use crate::variable::{Evidence, Variable};

use super::Sampler;

use log::debug;
use rand::Rng;

pub struct GibbsSampler {
    variables: Vec<Variable>,

    /// per variable id, the product of the factors whose scope contains it
    blanket: Vec<Factor>,

    /// ids resampled each sweep, in ascending order
    free: Vec<usize>,

    /// the current state of the chain; clamped variables never change
    state: Evidence,
}

impl GibbsSampler {
    /// Construct a sampler with the evidence clamped. Free variables start
    /// at values drawn uniformly from their domains.
    pub fn new<R: Rng>(model: &BayesNet, evidence: &Evidence, rng: &mut R) -> Self {
        let variables = model.variables().to_vec();

        let blanket = variables
            .iter()
            .map(|v| {
                model
                    .factors()
                    .iter()
                    .filter(|f| f.domain().contains(v.id()))
                    .fold(Factor::constant(1.0), |acc, f| acc.product(f))
            })
            .collect();

        let free: Vec<usize> = variables
            .iter()
            .map(Variable::id)
            .filter(|id| !evidence.contains_key(id))
            .collect();

        let mut state = evidence.clone();
        for v in &variables {
            if !state.contains_key(&v.id()) {
                state.insert(v.id(), rng.gen_range(0..v.cardinality()));
            }
        }

        GibbsSampler {
            variables,
            blanket,
            free,
            state,
        }
    }
}

impl Sampler for GibbsSampler {
    fn sample<R: Rng>(&mut self, rng: &mut R) -> Evidence {
        for idx in 0..self.free.len() {
            let id = self.free[idx];
            let variable = self.variables[id];
            let factor = &self.blanket[id];

            let mut weights = Vec::with_capacity(variable.cardinality());
            for value in 0..variable.cardinality() {
                self.state.insert(id, value);
                weights.push(
                    factor
                        .value(&self.state)
                        .expect("the chain state values every variable"),
                );
            }

            let total: f64 = weights.iter().sum();
            let drawn = if total > 0.0 {
                let draw = rng.gen::<f64>() * total;
                let mut upper = 0.0;
                let mut chosen = variable.cardinality() - 1;
                for (value, weight) in weights.iter().enumerate() {
                    upper += weight;
                    if draw < upper {
                        chosen = value;
                        break;
                    }
                }
                chosen
            } else {
                // the current context has zero mass; restart the coordinate
                rng.gen_range(0..variable.cardinality())
            };
            self.state.insert(id, drawn);
        }

        self.state.clone()
    }
}

/// Estimate the partition of the evidence as the fraction of post-burn-in
/// chain states consistent with it.
///
/// The chain runs unclamped over the full joint; clamping the evidence
/// would make every state consistent and the count meaningless.
pub fn estimate_partition<R: Rng>(
    model: &BayesNet,
    evidence: &Evidence,
    options: &GibbsOptions,
    rng: &mut R,
) -> f64 {
    let mut sampler = GibbsSampler::new(model, &Evidence::new(), rng);
    for _ in 0..options.burn_in {
        sampler.sample(rng);
    }

    if options.samples == 0 {
        return 0.0;
    }
    let mut hits = 0usize;
    for _ in 0..options.samples {
        let state = sampler.sample(rng);
        if evidence
            .iter()
            .all(|(id, value)| state.get(id) == Some(value))
        {
            hits += 1;
        }
    }

    debug!(
        "gibbs chain matched the evidence in {} of {} sweeps",
        hits, options.samples
    );
    hits as f64 / options.samples as f64
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::domain::Domain;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chain() -> BayesNet {
        let x0 = Variable::binary(0);
        let x1 = Variable::binary(1);

        BayesNet::new(
            vec![x0, x1],
            vec![
                Factor::new(Domain::single(x0), vec![0.3, 0.7]).unwrap(),
                Factor::new(
                    Domain::new(vec![x1, x0]).unwrap(),
                    vec![0.8, 0.4, 0.2, 0.6],
                )
                .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn clamped_variables_never_move() {
        let bn = chain();
        let mut evidence = Evidence::new();
        evidence.insert(1, 0);

        let mut rng = StdRng::seed_from_u64(41);
        let mut sampler = GibbsSampler::new(&bn, &evidence, &mut rng);
        for _ in 0..50 {
            let state = sampler.sample(&mut rng);
            assert_eq!(state[&1], 0);
            assert!(state[&0] < 2);
        }
    }

    #[test]
    fn the_chain_visits_states_by_their_mass() {
        let bn = chain();

        // clamped on X1 = 0 the conditional of X0 is (0.24, 0.28) / 0.52
        let mut evidence = Evidence::new();
        evidence.insert(1, 0);

        let mut rng = StdRng::seed_from_u64(43);
        let mut sampler = GibbsSampler::new(&bn, &evidence, &mut rng);
        for _ in 0..500 {
            sampler.sample(&mut rng);
        }

        let sweeps = 20_000;
        let mut ones = 0usize;
        for _ in 0..sweeps {
            let state = sampler.sample(&mut rng);
            if state[&0] == 1 {
                ones += 1;
            }
        }
        let frequency = ones as f64 / sweeps as f64;
        assert!((frequency - 0.28 / 0.52).abs() < 0.05, "observed {}", frequency);
    }

    #[test]
    fn chain_estimate_tracks_the_partition() {
        let bn = chain();
        let mut evidence = Evidence::new();
        evidence.insert(1, 0);

        let mut rng = StdRng::seed_from_u64(47);
        let z = estimate_partition(&bn, &evidence, &GibbsOptions::default(), &mut rng);
        assert!((z - 0.52).abs() < 0.05, "estimated {}", z);
    }
}
