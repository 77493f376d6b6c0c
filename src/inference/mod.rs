//! Defines the inference drivers and their option structures.
//!
//! Options are explicit structs and enums rather than string-keyed maps, so
//! a caller can only request combinations the engine recognizes.

use crate::graph::EliminationHeuristic;

pub mod sum_product;
pub mod variable_elimination;

pub use self::sum_product::{FactorGraph, SumProductOptions, SumProductReport};
pub use self::variable_elimination::variable_elimination;

/// Options for the bucket-elimination driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct EliminationOptions {
    /// Reorder the eliminated variables greedily; `None` keeps the input
    /// order.
    pub heuristic: Option<EliminationHeuristic>,

    /// Normalize each intermediate factor, folding its partition into a
    /// running scale. Long product chains on large models underflow without
    /// this; the final result is unchanged.
    pub renormalize: bool,
}

/// Options for conditional queries on a `BayesNet`.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryOptions {
    /// Restrict the factor set to the requisite nodes found by Bayes-Ball
    /// before answering.
    pub bayes_ball: bool,

    /// Passed through to the bucket-elimination path.
    pub elimination: EliminationOptions,
}

/// How `BayesNet::partition_with` computes its estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PartitionMethod {
    /// Exact, by bucket elimination over the conditioned factors
    #[default]
    VariableElimination,

    /// Forward sampling with rejection of evidence-inconsistent samples
    LogicalSampling,

    /// Importance sampling with evidence-likelihood weights
    LikelihoodWeighting,

    /// A Gibbs chain over the full joint, counting evidence-consistent states
    GibbsSampling,
}

/// Sample-size parameters for the forward and likelihood-weighted
/// estimators. The defaults give the standard (epsilon, delta) guarantee
/// with a 0.1 lower bound on the estimated mass.
#[derive(Clone, Copy, Debug)]
pub struct SamplingOptions {
    pub epsilon: f64,
    pub delta: f64,

    /// Assumed lower bound on the partition, which scales the rejection
    /// sample count.
    pub lower_bound: f64,

    /// Hard budget on drawn samples. The likelihood-weighted loop runs until
    /// its effective sample target otherwise, which never terminates under
    /// inconsistent evidence.
    pub max_samples: usize,
}

impl Default for SamplingOptions {
    fn default() -> SamplingOptions {
        SamplingOptions {
            epsilon: 0.05,
            delta: 0.05,
            lower_bound: 0.1,
            max_samples: 1_000_000,
        }
    }
}

/// Chain parameters for the Gibbs estimator.
#[derive(Clone, Copy, Debug)]
pub struct GibbsOptions {
    /// Sweeps discarded before counting
    pub burn_in: usize,

    /// Sweeps counted after burn-in
    pub samples: usize,
}

impl Default for GibbsOptions {
    fn default() -> GibbsOptions {
        GibbsOptions {
            burn_in: 1_000,
            samples: 10_000,
        }
    }
}

/// Options for `BayesNet::partition_with`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PartitionOptions {
    pub method: PartitionMethod,
    pub elimination: EliminationOptions,
    pub sampling: SamplingOptions,
    pub gibbs: GibbsOptions,

    /// Seed for the sampling estimators; a fresh entropy-seeded generator is
    /// used when absent.
    pub seed: Option<u64>,
}

/// How `BayesNet::marginals_with` computes its estimates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarginalsMethod {
    /// Exact, one bucket elimination per variable
    #[default]
    VariableElimination,

    /// Approximate, by loopy belief propagation on the factor graph
    SumProduct,
}

/// Options for `BayesNet::marginals_with`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarginalsOptions {
    pub method: MarginalsMethod,
    pub elimination: EliminationOptions,
    pub sum_product: SumProductOptions,
}
