//! Bucket (variable) elimination.
//!
//! Implementation of Koller & Friedman Algorithm 9.1 - Sum-Product-VE, with
//! the factors organized into per-variable buckets: each factor lives in the
//! bucket of its earliest eliminated scope variable, and eliminating a
//! variable pushes the resulting factor into the bucket of the next
//! eliminated variable still in its scope.

use crate::factor::Factor;
use crate::graph::MoralGraph;
use crate::variable::Variable;

use super::EliminationOptions;

use indexmap::IndexMap;
use log::debug;

use std::collections::HashMap;

/// Eliminate `variables` from the product of `factors` and return the factor
/// over the remaining scope.
///
/// With every scope variable eliminated the result is a scalar holding the
/// partition of the product. An empty factor list yields the scalar one.
pub fn variable_elimination(
    variables: &[Variable],
    factors: &[&Factor],
    options: &EliminationOptions,
) -> Factor {
    let mut result = Factor::constant(1.0);
    let mut scale = 1.0;

    let order: Vec<Variable> = match options.heuristic {
        Some(heuristic) => {
            let graph = MoralGraph::new(variables, factors);
            let ids: Vec<usize> = variables.iter().map(|v| v.id()).collect();
            let (order_ids, width) = graph.ordering(&ids, heuristic);
            debug!("eliminating {} variables at width {}", order_ids.len(), width);

            let by_id: HashMap<usize, Variable> =
                variables.iter().map(|v| (v.id(), *v)).collect();
            order_ids
                .into_iter()
                .map(|id| by_id[&id])
                .collect()
        }
        None => variables.to_vec(),
    };

    // each factor joins the bucket of its earliest eliminated scope variable;
    // factors with no eliminated variable multiply straight into the result
    let mut buckets: IndexMap<usize, Vec<Factor>> =
        order.iter().map(|v| (v.id(), Vec::new())).collect();
    for f in factors {
        match order.iter().find(|v| f.domain().contains(v.id())) {
            Some(v) => buckets
                .get_mut(&v.id())
                .expect("every ordered variable has a bucket")
                .push((*f).clone()),
            None => result = result.product(f),
        }
    }

    for (i, v) in order.iter().enumerate() {
        let bucket = buckets
            .swap_remove(&v.id())
            .expect("buckets are removed exactly once");

        let product = bucket
            .iter()
            .fold(Factor::constant(1.0), |acc, f| acc.product(f));
        let mut tau = product.sum_out(v);

        if options.renormalize {
            let z = tau.partition();
            if z > 0.0 {
                scale *= z;
                tau = tau.normalize();
            }
        }

        match order[i + 1..].iter().find(|u| tau.domain().contains(u.id())) {
            Some(u) => buckets
                .get_mut(&u.id())
                .expect("later variables still have buckets")
                .push(tau),
            None => result = result.product(&tau),
        }
    }

    if scale != 1.0 {
        result = result.product(&Factor::constant(scale));
    }
    result
}
