//! Definition of the moral graph module
//!
//! A `MoralGraph` is the undirected graph whose vertices are variable ids and
//! whose edges connect every pair of variables that co-occur in a factor
//! scope. For a BAYES model whose factors are child-first conditionals this
//! is exactly the moralization: child-parent edges plus edges among the
//! parents of a common child.
//!
//! The graph drives elimination-order selection: the greedy heuristics
//! (min-degree, min-fill, weighted-min-fill) simulate the elimination on a
//! working copy, tracking the width of the produced order.

use crate::factor::Factor;
use crate::variable::Variable;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::debug;

/// The greedy criterion used to pick the next vertex to eliminate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EliminationHeuristic {
    /// Smallest current neighborhood
    MinDegree,

    /// Fewest fill-in edges, ties broken by smaller degree
    MinFill,

    /// Fill-in edges weighted by the product of the endpoint cardinalities,
    /// ties broken by smaller degree
    WeightedMinFill,
}

/// Undirected graph of factor scopes with symmetric, irreflexive adjacency.
#[derive(Clone, Debug)]
pub struct MoralGraph {
    adjacency: IndexMap<usize, IndexSet<usize>>,
    cardinality: IndexMap<usize, usize>,
}

impl MoralGraph {
    /// Build the graph from a set of factors. `variables` seeds the vertex
    /// set; variables appearing in a factor scope are added as well.
    pub fn new(variables: &[Variable], factors: &[&Factor]) -> MoralGraph {
        let mut adjacency: IndexMap<usize, IndexSet<usize>> = IndexMap::new();
        let mut cardinality: IndexMap<usize, usize> = IndexMap::new();

        for v in variables {
            adjacency.entry(v.id()).or_default();
            cardinality.insert(v.id(), v.cardinality());
        }
        for f in factors {
            for v in f.domain().scope() {
                adjacency.entry(v.id()).or_default();
                cardinality.insert(v.id(), v.cardinality());
            }
        }

        for f in factors {
            for (a, b) in f.domain().scope().iter().tuple_combinations() {
                adjacency
                    .get_mut(&a.id())
                    .expect("every scope variable has an adjacency entry")
                    .insert(b.id());
                adjacency
                    .get_mut(&b.id())
                    .expect("every scope variable has an adjacency entry")
                    .insert(a.id());
            }
        }

        MoralGraph {
            adjacency,
            cardinality,
        }
    }

    /// Number of vertices
    pub fn order(&self) -> usize {
        self.adjacency.len()
    }

    /// The neighborhood of a vertex; empty for an unknown id.
    pub fn neighbors(&self, id: usize) -> Option<&IndexSet<usize>> {
        self.adjacency.get(&id)
    }

    pub fn degree(&self, id: usize) -> usize {
        self.adjacency.get(&id).map_or(0, |adj| adj.len())
    }

    pub fn connected(&self, a: usize, b: usize) -> bool {
        self.adjacency.get(&a).map_or(false, |adj| adj.contains(&b))
    }

    /// Greedily choose an elimination order for `candidates` and return it
    /// together with its width (the largest neighborhood met while
    /// eliminating).
    ///
    /// The heuristic only ranks the candidates; the rest of the graph stays
    /// in place and keeps contributing fill-in edges.
    pub fn ordering(
        &self,
        candidates: &[usize],
        heuristic: EliminationHeuristic,
    ) -> (Vec<usize>, usize) {
        let mut working = self.clone();
        let mut remaining: IndexSet<usize> = candidates.iter().copied().collect();
        let mut order = Vec::with_capacity(remaining.len());
        let mut width = 0;

        while !remaining.is_empty() {
            let next = match heuristic {
                EliminationHeuristic::MinDegree => working.min_degree(&remaining),
                EliminationHeuristic::MinFill => working.min_fill(&remaining),
                EliminationHeuristic::WeightedMinFill => working.weighted_min_fill(&remaining),
            };
            order.push(next);
            width = width.max(working.eliminate(next));
            remaining.shift_remove(&next);
        }

        debug!(
            "{:?} ordering over {} variables has width {}",
            heuristic,
            order.len(),
            width
        );
        (order, width)
    }

    /// Replay a fixed elimination sequence and return its width.
    pub fn order_width(&self, sequence: &[usize]) -> usize {
        let mut working = self.clone();
        let mut width = 0;
        for &id in sequence {
            width = width.max(working.eliminate(id));
        }
        width
    }

    /// Remove a vertex: drop its incident edges, connect its neighborhood
    /// into a clique and return the neighborhood size.
    fn eliminate(&mut self, id: usize) -> usize {
        let adjacent: Vec<usize> = match self.adjacency.shift_remove(&id) {
            Some(adj) => adj.into_iter().collect(),
            None => return 0,
        };

        for &n in &adjacent {
            if let Some(adj) = self.adjacency.get_mut(&n) {
                adj.shift_remove(&id);
            }
        }

        for (i, &a) in adjacent.iter().enumerate() {
            for &b in &adjacent[i + 1..] {
                if !self.connected(a, b) {
                    self.adjacency
                        .get_mut(&a)
                        .expect("neighbors stay in the working graph")
                        .insert(b);
                    self.adjacency
                        .get_mut(&b)
                        .expect("neighbors stay in the working graph")
                        .insert(a);
                }
            }
        }

        adjacent.len()
    }

    fn min_degree(&self, candidates: &IndexSet<usize>) -> usize {
        let mut best = *candidates.first().expect("candidates are non-empty");
        let mut best_degree = self.degree(best);

        for &id in candidates {
            let degree = self.degree(id);
            if degree < best_degree {
                best = id;
                best_degree = degree;
            }
        }
        best
    }

    /// Number of missing edges among the neighbors of `id`.
    fn fill_in(&self, id: usize) -> usize {
        let adjacent = match self.adjacency.get(&id) {
            Some(adj) => adj,
            None => return 0,
        };
        adjacent
            .iter()
            .tuple_combinations()
            .filter(|(&a, &b)| !self.connected(a, b))
            .count()
    }

    /// Missing edges among the neighbors of `id`, each weighted by the
    /// product of the endpoint cardinalities.
    fn weighted_fill_in(&self, id: usize) -> usize {
        let adjacent = match self.adjacency.get(&id) {
            Some(adj) => adj,
            None => return 0,
        };
        adjacent
            .iter()
            .tuple_combinations()
            .filter(|(&a, &b)| !self.connected(a, b))
            .map(|(&a, &b)| self.cardinality[&a] * self.cardinality[&b])
            .sum()
    }

    fn min_fill(&self, candidates: &IndexSet<usize>) -> usize {
        self.pick_by(candidates, |g, id| g.fill_in(id))
    }

    fn weighted_min_fill(&self, candidates: &IndexSet<usize>) -> usize {
        self.pick_by(candidates, |g, id| g.weighted_fill_in(id))
    }

    /// Smallest cost wins; ties broken by smaller degree, then by candidate
    /// order.
    fn pick_by<C>(&self, candidates: &IndexSet<usize>, cost: C) -> usize
    where
        C: Fn(&MoralGraph, usize) -> usize,
    {
        let mut best = *candidates.first().expect("candidates are non-empty");
        let mut best_cost = cost(self, best);

        for &id in candidates.iter().skip(1) {
            let c = cost(self, id);
            if c < best_cost || (c == best_cost && self.degree(id) < self.degree(best)) {
                best = id;
                best_cost = c;
            }
        }
        best
    }
}
