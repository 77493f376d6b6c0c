//! Defines a `MarkovNet`, an undirected graphical model: a bag of
//! non-negative factors whose scopes induce the neighbor relation.

use crate::error::{Error, Result};
use crate::factor::Factor;
use crate::variable::Variable;

use super::Model;

use indexmap::IndexSet;
use itertools::Itertools;

/// A Markov network over dense variable ids.
///
/// Unlike a `BayesNet` there is no factor-per-variable convention: any
/// number of factors over any scopes. Two variables are neighbors when they
/// share a factor scope.
#[derive(Debug)]
pub struct MarkovNet {
    variables: Vec<Variable>,
    factors: Vec<Factor>,
    neighbors: Vec<IndexSet<usize>>,
}

impl MarkovNet {
    /// Build the network from its registries.
    ///
    /// # Errors
    /// * `Error::InvalidModel` if variable ids are not dense or a scope
    ///   cardinality disagrees with the registry
    /// * `Error::UnknownVariable` for a scope id outside the registry
    pub fn new(variables: Vec<Variable>, factors: Vec<Factor>) -> Result<MarkovNet> {
        let n = variables.len();
        for (i, v) in variables.iter().enumerate() {
            if v.id() != i {
                return Err(Error::InvalidModel(format!(
                    "variable ids must be dense, found {} at index {}",
                    v.id(),
                    i
                )));
            }
        }

        let mut neighbors = vec![IndexSet::new(); n];
        for f in &factors {
            for v in f.domain().scope() {
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
            for (a, b) in f.domain().scope().iter().tuple_combinations() {
                neighbors[a.id()].insert(b.id());
                neighbors[b.id()].insert(a.id());
            }
        }

        Ok(MarkovNet {
            variables,
            factors,
            neighbors,
        })
    }

    /// The variables sharing a factor scope with `id`
    pub fn neighbors(&self, id: usize) -> &IndexSet<usize> {
        &self.neighbors[id]
    }
}

impl Model for MarkovNet {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn factors(&self) -> &[Factor] {
        &self.factors
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::domain::Domain;
    use crate::variable::Evidence;

    const TOLERANCE: f64 = 1e-6;

    /// The misconception network of Koller & Friedman Section 4.1: a
    /// four-cycle A - B - C - D with strongly attractive and repulsive
    /// pairwise factors.
    fn misconception() -> MarkovNet {
        let a = Variable::binary(0);
        let b = Variable::binary(1);
        let c = Variable::binary(2);
        let d = Variable::binary(3);

        let ab = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![30.0, 5.0, 1.0, 10.0],
        )
        .unwrap();
        let bc = Factor::new(
            Domain::new(vec![b, c]).unwrap(),
            vec![100.0, 1.0, 1.0, 100.0],
        )
        .unwrap();
        let cd = Factor::new(
            Domain::new(vec![c, d]).unwrap(),
            vec![1.0, 100.0, 100.0, 1.0],
        )
        .unwrap();
        let da = Factor::new(
            Domain::new(vec![d, a]).unwrap(),
            vec![100.0, 1.0, 1.0, 100.0],
        )
        .unwrap();

        MarkovNet::new(vec![a, b, c, d], vec![ab, bc, cd, da]).unwrap()
    }

    #[test]
    fn neighbors_come_from_shared_scopes() {
        let mn = misconception();

        let around_a = mn.neighbors(0);
        assert_eq!(around_a.len(), 2);
        assert!(around_a.contains(&1) && around_a.contains(&3));
        assert!(!around_a.contains(&2));
    }

    #[test]
    fn partition_of_the_misconception_example() {
        let mn = misconception();
        assert!((mn.partition(&Evidence::new()) - 7_201_840.0).abs() < 1.0);
    }

    #[test]
    fn conditioned_partition_shrinks_the_mass() {
        let mn = misconception();

        let mut evidence = Evidence::new();
        evidence.insert(0, 0);
        let conditioned = mn.partition(&evidence);
        assert!(conditioned > 0.0);
        assert!(conditioned < mn.partition(&Evidence::new()));
    }

    #[test]
    fn marginals_are_normalized() {
        let mn = misconception();
        let marginals = mn.marginals(&Evidence::new());

        assert_eq!(marginals.len(), 4);
        for m in &marginals {
            assert!((m.partition() - 1.0).abs() < TOLERANCE);
        }

        // the joint probability of (a=0, b=1, c=1, d=0) is about 0.69
        let joint = mn.joint_distribution().normalize();
        let mut valuation = Evidence::new();
        valuation.insert(0, 0);
        valuation.insert(1, 1);
        valuation.insert(2, 1);
        valuation.insert(3, 0);
        assert!((joint.value(&valuation).unwrap() - 0.69).abs() < 0.005);
    }

    #[test]
    fn scope_ids_are_validated() {
        let a = Variable::binary(0);
        let stray = Variable::binary(5);
        let f = Factor::filled(Domain::new(vec![a, stray]).unwrap(), 1.0);

        match MarkovNet::new(vec![a], vec![f]) {
            Err(Error::UnknownVariable(5)) => (),
            other => panic!("expected an unknown variable error, got {:?}", other),
        }
    }
}
