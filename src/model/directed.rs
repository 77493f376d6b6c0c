//! Defines a `BayesNet`, a directed graphical model whose factors are the
//! conditional distributions `P(X | Pa(X))`, one per variable, with the
//! child first in each factor scope.
//!
//! Beyond the shared `Model` queries, the directed structure supports the
//! classic graph algorithms: roots and leaves, transitive closures, Markov
//! blankets, Shachter's Bayes-Ball reachability for requisite nodes, and
//! m-separation through the ancestral moral graph. Conditional queries run
//! either over the materialized joint or through bucket elimination, and the
//! partition function can be estimated by forward, likelihood-weighted or
//! Gibbs sampling.

use crate::error::{Error, Result};
use crate::factor::Factor;
use crate::inference::{
    variable_elimination, FactorGraph, MarginalsMethod, MarginalsOptions, PartitionMethod,
    PartitionOptions, QueryOptions,
};
use crate::samplers;
use crate::variable::{Evidence, Variable};

use super::Model;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::collections::{HashSet, VecDeque};

/// A Bayesian network over dense variable ids.
///
/// `factors[id]` is the conditional factor of `variables[id]`, whose scope
/// starts with the variable itself followed by its parents. The topological
/// sampling order is computed at construction, which also rejects cyclic
/// parent relations.
#[derive(Debug)]
pub struct BayesNet {
    variables: Vec<Variable>,
    factors: Vec<Factor>,
    parents: Vec<IndexSet<usize>>,
    children: Vec<IndexSet<usize>>,
    sampling_order: Vec<usize>,
}

impl BayesNet {
    /// Build the network from its registries.
    ///
    /// # Errors
    /// * `Error::InvalidModel` if the registries do not line up: ids not
    ///   dense, a factor count mismatch, a factor whose first scope variable
    ///   is not its own, or a scope cardinality disagreeing with the registry
    /// * `Error::UnknownVariable` for a parent id outside the registry
    /// * `Error::CyclicModel` if the parent relation has a cycle
    pub fn new(variables: Vec<Variable>, factors: Vec<Factor>) -> Result<BayesNet> {
        let n = variables.len();
        if factors.len() != n {
            return Err(Error::InvalidModel(format!(
                "{} variables but {} factors",
                n,
                factors.len()
            )));
        }
        for (i, v) in variables.iter().enumerate() {
            if v.id() != i {
                return Err(Error::InvalidModel(format!(
                    "variable ids must be dense, found {} at index {}",
                    v.id(),
                    i
                )));
            }
        }

        let mut parents = vec![IndexSet::new(); n];
        let mut children = vec![IndexSet::new(); n];
        for (i, f) in factors.iter().enumerate() {
            let scope = f.domain().scope();
            match scope.first() {
                Some(child) if child.id() == i => (),
                _ => {
                    return Err(Error::InvalidModel(format!(
                        "factor {} does not start with its own variable",
                        i
                    )))
                }
            }
            for v in scope {
                if v.id() >= n {
                    return Err(Error::UnknownVariable(v.id()));
                }
                if v.cardinality() != variables[v.id()].cardinality() {
                    return Err(Error::InvalidModel(format!(
                        "scope cardinality of variable {} disagrees with the registry",
                        v.id()
                    )));
                }
            }
            for p in &scope[1..] {
                parents[i].insert(p.id());
                children[p.id()].insert(i);
            }
        }

        let sampling_order = topological_order(&parents, &children)?;

        Ok(BayesNet {
            variables,
            factors,
            parents,
            children,
            sampling_order,
        })
    }

    /// The parent set of a variable
    pub fn parents(&self, id: usize) -> &IndexSet<usize> {
        &self.parents[id]
    }

    /// The child set of a variable
    pub fn children(&self, id: usize) -> &IndexSet<usize> {
        &self.children[id]
    }

    /// Variables with no parents
    pub fn roots(&self) -> Vec<Variable> {
        self.variables
            .iter()
            .filter(|v| self.parents[v.id()].is_empty())
            .copied()
            .collect()
    }

    /// Variables with no children
    pub fn leaves(&self) -> Vec<Variable> {
        self.variables
            .iter()
            .filter(|v| self.children[v.id()].is_empty())
            .copied()
            .collect()
    }

    /// The transitive closure of the child relation, excluding `id` itself.
    pub fn descendants(&self, id: usize) -> IndexSet<usize> {
        self.closure(id, &self.children)
    }

    /// The transitive closure of the parent relation, excluding `id` itself.
    pub fn ancestors(&self, id: usize) -> IndexSet<usize> {
        self.closure(id, &self.parents)
    }

    /// The union of the ancestors of each id in the set.
    pub fn ancestors_of(&self, ids: &[usize]) -> IndexSet<usize> {
        let mut out = IndexSet::new();
        let mut stack: Vec<usize> = ids
            .iter()
            .flat_map(|&id| self.parents[id].iter().copied())
            .collect();
        while let Some(v) = stack.pop() {
            if out.insert(v) {
                stack.extend(self.parents[v].iter().copied());
            }
        }
        out
    }

    fn closure(&self, id: usize, relation: &[IndexSet<usize>]) -> IndexSet<usize> {
        let mut out = IndexSet::new();
        let mut stack: Vec<usize> = relation[id].iter().copied().collect();
        while let Some(v) = stack.pop() {
            if out.insert(v) {
                stack.extend(relation[v].iter().copied());
            }
        }
        out
    }

    /// Parents, children and co-parents of a variable: the set that
    /// d-separates it from the rest of the network.
    pub fn markov_blanket(&self, id: usize) -> IndexSet<usize> {
        let mut blanket = IndexSet::new();
        blanket.extend(self.parents[id].iter().copied());
        blanket.extend(self.children[id].iter().copied());
        for &c in &self.children[id] {
            blanket.extend(self.parents[c].iter().copied());
        }
        blanket.shift_remove(&id);
        blanket
    }

    /// The non-descendants a variable is independent of given its parents:
    /// everything except the variable, its parents and its descendants.
    pub fn markov_independence(&self, id: usize) -> IndexSet<usize> {
        let descendants = self.descendants(id);
        self.variables
            .iter()
            .map(Variable::id)
            .filter(|&v| v != id && !self.parents[id].contains(&v) && !descendants.contains(&v))
            .collect()
    }

    /// Shachter's Bayes-Ball reachability.
    ///
    /// Given query variables `targets` (J), observed variables `observed` (K)
    /// and functionally-determined variables `frozen` (F), returns the
    /// requisite probability nodes `Np` (nodes marked on top, whose factors
    /// suffice to answer the query) and the requisite observations
    /// `Ne = K ∩ visited`.
    pub fn bayes_ball(
        &self,
        targets: &[usize],
        observed: &[usize],
        frozen: &[usize],
    ) -> (IndexSet<usize>, IndexSet<usize>) {
        let k: HashSet<usize> = observed.iter().copied().collect();
        let f: HashSet<usize> = frozen.iter().copied().collect();

        let mut visited: IndexSet<usize> = IndexSet::new();
        let mut top: IndexSet<usize> = IndexSet::new();
        let mut bottom: HashSet<usize> = HashSet::new();

        // each target starts as if visited from one of its children
        let mut schedule: Vec<(usize, bool)> = targets.iter().map(|&j| (j, true)).collect();

        while let Some((j, from_child)) = schedule.pop() {
            visited.insert(j);

            if from_child && !k.contains(&j) {
                if top.insert(j) {
                    schedule.extend(self.parents[j].iter().map(|&p| (p, true)));
                }
                if !f.contains(&j) && bottom.insert(j) {
                    schedule.extend(self.children[j].iter().map(|&c| (c, false)));
                }
            } else if !from_child {
                if k.contains(&j) {
                    if top.insert(j) {
                        schedule.extend(self.parents[j].iter().map(|&p| (p, true)));
                    }
                } else if bottom.insert(j) {
                    schedule.extend(self.children[j].iter().map(|&c| (c, false)));
                }
            }
        }

        let requisite_observations = observed
            .iter()
            .copied()
            .filter(|id| visited.contains(id))
            .collect();
        (top, requisite_observations)
    }

    /// Whether `v1` and `v2` are m-separated given the evidence variables:
    /// no path connects them in the moralized ancestral subgraph with the
    /// evidence removed.
    pub fn m_separated(&self, v1: usize, v2: usize, evidence: &[usize]) -> Result<bool> {
        for &id in [v1, v2].iter().chain(evidence) {
            if id >= self.variables.len() {
                return Err(Error::UnknownVariable(id));
            }
        }

        // the ancestral set of both endpoints and the evidence
        let mut relevant: Vec<usize> = vec![v1, v2];
        relevant.extend_from_slice(evidence);
        let mut ancestral = self.ancestors_of(&relevant);
        ancestral.extend(relevant.iter().copied());

        // moralized subgraph: child-parent edges plus edges among the
        // parents of a common child
        let mut graph: IndexMap<usize, IndexSet<usize>> =
            ancestral.iter().map(|&id| (id, IndexSet::new())).collect();
        let connect = |graph: &mut IndexMap<usize, IndexSet<usize>>, a: usize, b: usize| {
            graph
                .get_mut(&a)
                .expect("ancestral vertices are preallocated")
                .insert(b);
            graph
                .get_mut(&b)
                .expect("ancestral vertices are preallocated")
                .insert(a);
        };
        for &id in &ancestral {
            for &p in &self.parents[id] {
                connect(&mut graph, id, p);
            }
            for (&p1, &p2) in self.parents[id].iter().tuple_combinations() {
                connect(&mut graph, p1, p2);
            }
        }

        // the evidence blocks every path through it
        for id in evidence {
            graph.shift_remove(id);
        }
        for (_, adjacent) in graph.iter_mut() {
            for id in evidence {
                adjacent.shift_remove(id);
            }
        }

        if !graph.contains_key(&v1) || !graph.contains_key(&v2) {
            return Ok(true);
        }

        let mut stack = vec![v1];
        let mut seen: HashSet<usize> = HashSet::new();
        while let Some(v) = stack.pop() {
            if v == v2 {
                return Ok(false);
            }
            if !seen.insert(v) {
                continue;
            }
            stack.extend(graph[&v].iter().copied().filter(|u| !seen.contains(u)));
        }
        Ok(true)
    }

    /// A topological order over the variables (equivalently their factors):
    /// every parent precedes its children.
    pub fn sampling_order(&self) -> &[usize] {
        &self.sampling_order
    }

    /// Answer `P(target | evidence)` over the materialized joint: the
    /// conditional table over `target ∪ evidence` obtained by summing every
    /// other variable out and dividing by the target-summed factor.
    ///
    /// With `bayes_ball` enabled only the factors of the requisite
    /// probability nodes enter the joint.
    pub fn query(
        &self,
        target: &[usize],
        evidence: &[usize],
        options: &QueryOptions,
    ) -> Result<Factor> {
        self.check_ids(target, evidence)?;

        let joint = if options.bayes_ball {
            let (requisite, _) = self.bayes_ball(target, evidence, &[]);
            requisite
                .iter()
                .fold(Factor::constant(1.0), |acc, &id| acc.product(&self.factors[id]))
        } else {
            self.joint_distribution()
        };

        let keep: HashSet<usize> = target.iter().chain(evidence).copied().collect();
        let mut f = joint;
        for v in &self.variables {
            if !keep.contains(&v.id()) {
                f = f.sum_out(v);
            }
        }

        self.conditionalize(f, target, evidence)
    }

    /// As `query`, but through bucket elimination instead of the full joint.
    pub fn query_ve(
        &self,
        target: &[usize],
        evidence: &[usize],
        options: &QueryOptions,
    ) -> Result<Factor> {
        self.check_ids(target, evidence)?;

        let keep: HashSet<usize> = target.iter().chain(evidence).copied().collect();
        let (eliminate, factors): (Vec<Variable>, Vec<&Factor>) = if options.bayes_ball {
            let (requisite, _) = self.bayes_ball(target, evidence, &[]);
            (
                requisite
                    .iter()
                    .copied()
                    .filter(|id| !keep.contains(id))
                    .map(|id| self.variables[id])
                    .collect(),
                requisite.iter().map(|&id| &self.factors[id]).collect(),
            )
        } else {
            (
                self.variables
                    .iter()
                    .filter(|v| !keep.contains(&v.id()))
                    .copied()
                    .collect(),
                self.factors.iter().collect(),
            )
        };

        let f = variable_elimination(&eliminate, &factors, &options.elimination);
        self.conditionalize(f, target, evidence)
    }

    /// Divide out the evidence scope: `P(evidence)` is the numerator with
    /// the targets summed out.
    fn conditionalize(&self, f: Factor, target: &[usize], evidence: &[usize]) -> Result<Factor> {
        if evidence.is_empty() {
            return Ok(f);
        }
        let mut g = f.clone();
        for &id in target {
            g = g.sum_out(&self.variables[id]);
        }
        f.divide(&g)
    }

    /// The partition function of the evidence, by the method the options
    /// select: exact bucket elimination or one of the sampling estimators.
    pub fn partition_with(&self, evidence: &Evidence, options: &PartitionOptions) -> Result<f64> {
        self.check_evidence(evidence)?;

        match options.method {
            PartitionMethod::VariableElimination => {
                let conditioned: Vec<Factor> =
                    self.factors.iter().map(|f| f.condition(evidence)).collect();
                let refs: Vec<&Factor> = conditioned.iter().collect();
                let f = variable_elimination(&self.variables, &refs, &options.elimination);
                Ok(f.partition())
            }
            PartitionMethod::LogicalSampling => {
                let mut rng = self.rng(options.seed);
                Ok(samplers::forward::estimate_partition(
                    self,
                    evidence,
                    &options.sampling,
                    &mut rng,
                ))
            }
            PartitionMethod::LikelihoodWeighting => {
                let mut rng = self.rng(options.seed);
                Ok(samplers::likelihood::estimate_partition(
                    self,
                    evidence,
                    &options.sampling,
                    &mut rng,
                ))
            }
            PartitionMethod::GibbsSampling => {
                let mut rng = self.rng(options.seed);
                Ok(samplers::gibbs::estimate_partition(
                    self,
                    evidence,
                    &options.gibbs,
                    &mut rng,
                ))
            }
        }
    }

    /// Per-variable marginals under the evidence, exactly by one bucket
    /// elimination per variable or approximately by loopy sum-product.
    /// The marginal of an evidence variable degenerates to a scalar.
    pub fn marginals_with(
        &self,
        evidence: &Evidence,
        options: &MarginalsOptions,
    ) -> Result<Vec<Factor>> {
        self.check_evidence(evidence)?;

        let conditioned: Vec<Factor> =
            self.factors.iter().map(|f| f.condition(evidence)).collect();
        let refs: Vec<&Factor> = conditioned.iter().collect();

        match options.method {
            MarginalsMethod::VariableElimination => Ok(self
                .variables
                .iter()
                .map(|v| {
                    let eliminate: Vec<Variable> = self
                        .variables
                        .iter()
                        .filter(|u| u.id() != v.id())
                        .copied()
                        .collect();
                    variable_elimination(&eliminate, &refs, &options.elimination).normalize()
                })
                .collect()),
            MarginalsMethod::SumProduct => {
                let mut graph = FactorGraph::new(&refs);
                graph.run(&options.sum_product);
                Ok(self
                    .variables
                    .iter()
                    .map(|v| {
                        if graph.variables().iter().any(|u| u.id() == v.id()) {
                            graph.marginal(v)
                        } else {
                            Factor::constant(1.0)
                        }
                    })
                    .collect())
            }
        }
    }

    fn rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn check_ids(&self, target: &[usize], evidence: &[usize]) -> Result<()> {
        for &id in target.iter().chain(evidence) {
            if id >= self.variables.len() {
                return Err(Error::UnknownVariable(id));
            }
        }
        if target.is_empty() {
            return Err(Error::InvalidScope);
        }
        Ok(())
    }

    fn check_evidence(&self, evidence: &Evidence) -> Result<()> {
        for (&id, &value) in evidence {
            match self.variables.get(id) {
                None => return Err(Error::UnknownVariable(id)),
                Some(v) if value >= v.cardinality() => {
                    return Err(Error::InvalidValue {
                        variable: id,
                        value,
                        cardinality: v.cardinality(),
                    })
                }
                Some(_) => (),
            }
        }
        Ok(())
    }
}

impl Model for BayesNet {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn factors(&self) -> &[Factor] {
        &self.factors
    }
}

/// Kahn's algorithm over the parent counts; lower ids first among the ready.
fn topological_order(
    parents: &[IndexSet<usize>],
    children: &[IndexSet<usize>],
) -> Result<Vec<usize>> {
    let n = parents.len();
    let mut waiting_on: Vec<usize> = parents.iter().map(IndexSet::len).collect();
    let mut ready: VecDeque<usize> = (0..n).filter(|&i| waiting_on[i] == 0).collect();

    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_front() {
        order.push(i);
        for &c in &children[i] {
            waiting_on[c] -= 1;
            if waiting_on[c] == 0 {
                ready.push_back(c);
            }
        }
    }

    if order.len() != n {
        return Err(Error::CyclicModel);
    }
    Ok(order)
}
