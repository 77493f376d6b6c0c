//! Loopy belief propagation on a bipartite factor graph.
//!
//! Implementation of the sum-product message-passing scheme of Koller &
//! Friedman Section 11.3: uniform initial messages, synchronous
//! variable-to-factor then factor-to-variable sweeps, and an L-infinity
//! convergence test. On a tree the fixed point is exact; on a loopy graph
//! the result after the iteration budget is a best-effort approximation,
//! never an error.

use crate::domain::Domain;
use crate::factor::Factor;
use crate::variable::Variable;

use indexmap::IndexMap;
use log::{debug, trace};

/// Options for the sum-product iteration.
#[derive(Clone, Copy, Debug)]
pub struct SumProductOptions {
    /// Hard budget on sweeps
    pub max_iterations: usize,

    /// Stop once no message moved by more than this between sweeps
    pub epsilon: f64,

    /// Blend factor toward the previous message, in `[0, 1)`. Zero keeps the
    /// raw update; values near one slow the iteration but stabilize
    /// oscillating loops.
    pub damping: f64,
}

impl Default for SumProductOptions {
    fn default() -> SumProductOptions {
        SumProductOptions {
            max_iterations: 100,
            epsilon: 1e-8,
            damping: 0.0,
        }
    }
}

/// The outcome of a sum-product run.
#[derive(Clone, Copy, Debug)]
pub struct SumProductReport {
    /// Sweeps performed
    pub iterations: usize,

    /// Largest message change in the final sweep
    pub delta: f64,

    /// Whether the delta fell below epsilon within the budget
    pub converged: bool,
}

/// A bipartite graph between the variables and the factors of a model, with
/// a message table in each direction.
pub struct FactorGraph {
    factors: Vec<Factor>,
    variables: Vec<Variable>,

    /// factor indices adjacent to each variable, in first-seen order
    neighbors: IndexMap<usize, Vec<usize>>,

    /// messages `factor -> variable`, keyed by (factor index, variable id)
    factor_to_variable: IndexMap<(usize, usize), Factor>,

    /// messages `variable -> factor`, keyed by (variable id, factor index)
    variable_to_factor: IndexMap<(usize, usize), Factor>,
}

impl FactorGraph {
    /// Build the graph and initialize every message as the uniform
    /// distribution over its variable.
    pub fn new(factors: &[&Factor]) -> FactorGraph {
        let mut variables: Vec<Variable> = Vec::new();
        let mut neighbors: IndexMap<usize, Vec<usize>> = IndexMap::new();
        let mut factor_to_variable = IndexMap::new();
        let mut variable_to_factor = IndexMap::new();

        for (i, f) in factors.iter().enumerate() {
            for v in f.domain().scope() {
                if !neighbors.contains_key(&v.id()) {
                    variables.push(*v);
                }
                neighbors.entry(v.id()).or_default().push(i);

                let uniform = Factor::filled(Domain::single(*v), 1.0 / v.cardinality() as f64);
                factor_to_variable.insert((i, v.id()), uniform.clone());
                variable_to_factor.insert((v.id(), i), uniform);
            }
        }

        FactorGraph {
            factors: factors.iter().map(|f| (*f).clone()).collect(),
            variables,
            neighbors,
            factor_to_variable,
            variable_to_factor,
        }
    }

    /// The variables appearing in at least one factor scope.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Iterate until convergence or until the budget runs out.
    pub fn run(&mut self, options: &SumProductOptions) -> SumProductReport {
        let mut delta = f64::INFINITY;
        for iteration in 1..=options.max_iterations {
            delta = self.sweep(options.damping);
            trace!("sum-product sweep {}: delta {}", iteration, delta);

            if delta < options.epsilon {
                debug!("sum-product converged after {} sweeps", iteration);
                return SumProductReport {
                    iterations: iteration,
                    delta,
                    converged: true,
                };
            }
        }

        debug!(
            "sum-product stopped at the {}-sweep budget with delta {}",
            options.max_iterations, delta
        );
        SumProductReport {
            iterations: options.max_iterations,
            delta,
            converged: false,
        }
    }

    /// The estimated marginal of a variable: the normalized product of its
    /// incoming messages. A variable absent from every scope gets the
    /// uniform distribution.
    pub fn marginal(&self, v: &Variable) -> Factor {
        let mut f = Factor::filled(Domain::single(*v), 1.0);
        if let Some(adjacent) = self.neighbors.get(&v.id()) {
            for &i in adjacent {
                f = f.product(&self.factor_to_variable[&(i, v.id())]);
            }
        }
        f.normalize()
    }

    /// One synchronous sweep; returns the largest message change.
    fn sweep(&mut self, damping: f64) -> f64 {
        let mut delta: f64 = 0.0;

        // variable to factor, reading only the factor-to-variable table
        let edges: Vec<(usize, usize)> = self.variable_to_factor.keys().copied().collect();
        for (v, i) in edges {
            let updated = self.variable_message(v, i);
            let old = &self.variable_to_factor[&(v, i)];
            let blended = blend(old, &updated, damping);
            delta = delta.max(largest_change(old, &blended));
            self.variable_to_factor.insert((v, i), blended);
        }

        // factor to variable, reading the refreshed variable-to-factor table
        let edges: Vec<(usize, usize)> = self.factor_to_variable.keys().copied().collect();
        for (i, v) in edges {
            let updated = self.factor_message(i, v);
            let old = &self.factor_to_variable[&(i, v)];
            let blended = blend(old, &updated, damping);
            delta = delta.max(largest_change(old, &blended));
            self.factor_to_variable.insert((i, v), blended);
        }

        delta
    }

    /// `mu_{v -> f}`: the normalized product of the messages into `v` from
    /// every other adjacent factor.
    fn variable_message(&self, v: usize, factor: usize) -> Factor {
        let variable = self.variables[self
            .neighbors
            .get_index_of(&v)
            .expect("messages only exist for known variables")];

        let mut message = Factor::filled(Domain::single(variable), 1.0);
        for &other in &self.neighbors[&v] {
            if other == factor {
                continue;
            }
            message = message.product(&self.factor_to_variable[&(other, v)]);
        }
        message.normalize()
    }

    /// `mu_{f -> v}`: the factor times the messages from its other scope
    /// variables, with each of those variables summed out as soon as its
    /// message is folded in.
    fn factor_message(&self, factor: usize, v: usize) -> Factor {
        let mut message = self.factors[factor].clone();
        let scope: Vec<Variable> = message.domain().scope().to_vec();
        for u in scope {
            if u.id() == v {
                continue;
            }
            message = message.product(&self.variable_to_factor[&(u.id(), factor)]);
            message = message.sum_out(&u);
        }
        message.normalize()
    }
}

/// `old * damping + updated * (1 - damping)`, positionwise over the shared
/// single-variable domain.
fn blend(old: &Factor, updated: &Factor, damping: f64) -> Factor {
    if damping <= 0.0 {
        return updated.clone();
    }
    let values: Vec<f64> = old
        .values()
        .iter()
        .zip(updated.values().iter())
        .map(|(o, u)| o * damping + u * (1.0 - damping))
        .collect();
    Factor::new(old.domain().clone(), values)
        .expect("blending two messages over one domain preserves its shape")
}

fn largest_change(old: &Factor, updated: &Factor) -> f64 {
    old.values()
        .iter()
        .zip(updated.values().iter())
        .map(|(o, u)| (o - u).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {

    use super::*;

    const TOLERANCE: f64 = 1e-6;

    /// P(X0) = (0.3, 0.7), P(X1=0 | X0) = (0.8, 0.4)
    fn chain_factors() -> Vec<Factor> {
        let x0 = Variable::binary(0);
        let x1 = Variable::binary(1);

        vec![
            Factor::new(Domain::single(x0), vec![0.3, 0.7]).unwrap(),
            Factor::new(
                Domain::new(vec![x1, x0]).unwrap(),
                vec![0.8, 0.4, 0.2, 0.6],
            )
            .unwrap(),
        ]
    }

    #[test]
    fn exact_on_a_tree() {
        let factors = chain_factors();
        let refs: Vec<&Factor> = factors.iter().collect();
        let mut graph = FactorGraph::new(&refs);

        let report = graph.run(&SumProductOptions::default());
        assert!(report.converged);
        assert!(report.delta < 1e-8);

        let m0 = graph.marginal(&Variable::binary(0));
        assert!((m0[0] - 0.3).abs() < TOLERANCE);
        assert!((m0[1] - 0.7).abs() < TOLERANCE);

        let m1 = graph.marginal(&Variable::binary(1));
        assert!((m1[0] - 0.52).abs() < TOLERANCE);
        assert!((m1[1] - 0.48).abs() < TOLERANCE);
    }

    #[test]
    fn damping_reaches_the_same_fixed_point() {
        let factors = chain_factors();
        let refs: Vec<&Factor> = factors.iter().collect();
        let mut graph = FactorGraph::new(&refs);

        let options = SumProductOptions {
            max_iterations: 500,
            epsilon: 1e-10,
            damping: 0.5,
        };
        let report = graph.run(&options);
        assert!(report.converged);

        let m1 = graph.marginal(&Variable::binary(1));
        assert!((m1[0] - 0.52).abs() < TOLERANCE);
    }

    #[test]
    fn budget_exhaustion_is_not_an_error() {
        let factors = chain_factors();
        let refs: Vec<&Factor> = factors.iter().collect();
        let mut graph = FactorGraph::new(&refs);

        let options = SumProductOptions {
            max_iterations: 1,
            epsilon: 0.0,
            damping: 0.0,
        };
        let report = graph.run(&options);
        assert!(!report.converged);
        assert_eq!(report.iterations, 1);

        // the marginal is still a usable distribution
        let m1 = graph.marginal(&Variable::binary(1));
        assert!((m1.partition() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn unknown_variable_gets_the_uniform_marginal() {
        let factors = chain_factors();
        let refs: Vec<&Factor> = factors.iter().collect();
        let graph = FactorGraph::new(&refs);

        let m = graph.marginal(&Variable::binary(9));
        assert!((m[0] - 0.5).abs() < TOLERANCE);
    }
}
