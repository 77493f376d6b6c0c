//! Defines a `Model`, which is a Bayesian (directed) or Markovian (undirected)
//! graphical model representing the factorization of a probability
//! distribution P.

use crate::factor::Factor;
use crate::variable::{Evidence, Variable};

pub mod directed;
pub mod undirected;

pub use self::directed::BayesNet;
pub use self::undirected::MarkovNet;

/// The `Model` trait represents a Probabilistic Graphical Model: a registry
/// of variables and factors with naive joint-distribution queries.
///
/// The defaults here materialize the full joint and are exponential in the
/// number of variables; `BayesNet` offers the same queries through bucket
/// elimination and the approximate estimators.
pub trait Model {
    /// The variables of the model, indexed by id.
    fn variables(&self) -> &[Variable];

    /// The factors of the model.
    fn factors(&self) -> &[Factor];

    /// The product of all factors. The empty product is the scalar one.
    fn joint_distribution(&self) -> Factor {
        self.factors()
            .iter()
            .fold(Factor::constant(1.0), |acc, f| acc.product(f))
    }

    /// The product of all factors conditioned on the evidence.
    fn joint_distribution_given(&self, evidence: &Evidence) -> Factor {
        self.factors()
            .iter()
            .fold(Factor::constant(1.0), |acc, f| acc.product(&f.condition(evidence)))
    }

    /// The probability mass of the evidence under the unconditioned joint.
    fn partition(&self, evidence: &Evidence) -> f64 {
        self.joint_distribution_given(evidence).partition()
    }

    /// Per-variable marginals under the evidence, by summing everything else
    /// out of the conditioned, normalized joint. The marginal of an evidence
    /// variable degenerates to a scalar.
    fn marginals(&self, evidence: &Evidence) -> Vec<Factor> {
        let joint = self.joint_distribution_given(evidence).normalize();

        self.variables()
            .iter()
            .map(|v| {
                let mut f = joint.clone();
                for u in self.variables() {
                    if u.id() != v.id() {
                        f = f.sum_out(u);
                    }
                }
                f
            })
            .collect()
    }
}
