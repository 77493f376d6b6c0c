//! Definition of the factor module
//!
//! A `Factor` is a non-negative table over the valuations of a `Domain`,
//! together with its partition (the sum of its values). Factors are pure
//! values: every operation produces a new `Factor` and never mutates its
//! operands. A factor with an empty domain is a scalar.
//!
//! Every operation is an instance of the same kernel: enumerate the
//! valuations of the output domain with the odometer and translate each
//! valuation into positions of the operand tables with `project_position`.

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::variable::{Evidence, Variable};

use rand::Rng;

use std::fmt;
use std::ops::{Index, Mul};

#[derive(Clone, Debug)]
pub struct Factor {
    domain: Domain,
    values: Vec<f64>,
    partition: f64,
}

impl Factor {
    /// Create a new `Factor` over the given domain.
    ///
    /// # Errors
    /// * `Error::SizeMismatch` if the table length disagrees with the domain
    ///   size
    /// * `Error::NegativeValue` if any table entry is below zero
    pub fn new(domain: Domain, values: Vec<f64>) -> Result<Factor> {
        if values.len() != domain.size() {
            return Err(Error::SizeMismatch {
                expected: domain.size(),
                found: values.len(),
            });
        }
        if values.iter().any(|&v| v < 0.0) {
            return Err(Error::NegativeValue);
        }

        let partition = values.iter().sum();
        Ok(Factor {
            domain,
            values,
            partition,
        })
    }

    /// The scalar factor with the given value. The empty product starts here.
    pub fn constant(value: f64) -> Factor {
        Factor {
            domain: Domain::empty(),
            values: vec![value],
            partition: value,
        }
    }

    /// A factor holding `value` at every position of `domain`.
    pub fn filled(domain: Domain, value: f64) -> Factor {
        let size = domain.size();
        Factor {
            domain,
            values: vec![value; size],
            partition: size as f64 * value,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The sum of the table values
    pub fn partition(&self) -> f64 {
        self.partition
    }

    pub fn width(&self) -> usize {
        self.domain.width()
    }

    pub fn size(&self) -> usize {
        self.domain.size()
    }

    /// The value of a complete assignment to the scope of this factor.
    ///
    /// The assignment may cover more variables than the scope; the extras are
    /// ignored.
    ///
    /// # Errors
    /// `Error::IncompleteValuation` if a scope variable has no value.
    pub fn value(&self, valuation: &Evidence) -> Result<f64> {
        for v in self.domain.scope() {
            let value = valuation
                .get(&v.id())
                .ok_or(Error::IncompleteValuation(v.id()))?;
            if *value >= v.cardinality() {
                return Err(Error::InvalidValue {
                    variable: v.id(),
                    value: *value,
                    cardinality: v.cardinality(),
                });
            }
        }
        let position = self
            .domain
            .project_position_fixing(&[], &Domain::empty(), valuation);
        Ok(self.values[position])
    }

    /// Product of this factor and another, over the union of their scopes.
    ///
    /// Defined in Koller & Friedman Section 4.2.1; scalar factors act as the
    /// multiplicative identity.
    pub fn product(&self, other: &Factor) -> Factor {
        let domain = self.domain.union(&other.domain);
        let mut values = Vec::with_capacity(domain.size());

        let mut valuation = vec![0; domain.width()];
        for _ in 0..domain.size() {
            let a = self.values[self.domain.project_position(&valuation, &domain)];
            let b = other.values[other.domain.project_position(&valuation, &domain)];
            values.push(a * b);
            domain.next_valuation(&mut valuation);
        }

        let partition = values.iter().sum();
        Factor {
            domain,
            values,
            partition,
        }
    }

    /// Marginalize the factor over `v`, summing the variable out of the
    /// scope. If `v` is not in the scope the factor is returned unchanged.
    ///
    /// Defined in Koller & Friedman Section 9.3.1
    pub fn sum_out(&self, v: &Variable) -> Factor {
        if !self.domain.contains(v.id()) {
            return self.clone();
        }

        let domain = self.domain.minus(v);
        let mut values = vec![0.0; domain.size()];

        let mut valuation = vec![0; domain.width()];
        for _ in 0..domain.size() {
            let mut total = 0.0;
            for k in 0..v.cardinality() {
                total +=
                    self.values[self
                        .domain
                        .project_position_with(&valuation, &domain, v.id(), k)];
            }
            values[domain.position(&valuation)] = total;
            domain.next_valuation(&mut valuation);
        }

        let partition = values.iter().sum();
        Factor {
            domain,
            values,
            partition,
        }
    }

    /// Condition the factor on the evidence, dropping every observed variable
    /// from the scope and selecting the rows that agree with the observed
    /// values. Evidence on variables outside the scope is ignored; a factor
    /// whose scope is disjoint from the evidence is returned unchanged.
    pub fn condition(&self, evidence: &Evidence) -> Factor {
        let domain = self.domain.restrict(evidence);
        if domain.width() == self.domain.width() {
            return self.clone();
        }

        let mut values = Vec::with_capacity(domain.size());
        let mut valuation = vec![0; domain.width()];
        for _ in 0..domain.size() {
            let position = self
                .domain
                .project_position_fixing(&valuation, &domain, evidence);
            values.push(self.values[position]);
            domain.next_valuation(&mut valuation);
        }

        let partition = values.iter().sum();
        Factor {
            domain,
            values,
            partition,
        }
    }

    /// Normalize the factor so its partition is one.
    ///
    /// An all-zero factor has no normalization; it is returned as-is (with
    /// partition zero) and the caller must treat it as inconsistent
    /// evidence.
    pub fn normalize(&self) -> Factor {
        if self.partition <= 0.0 {
            return self.clone();
        }

        let values: Vec<f64> = self.values.iter().map(|v| v / self.partition).collect();
        Factor {
            domain: self.domain.clone(),
            values,
            partition: 1.0,
        }
    }

    /// Pointwise division over the union scope.
    ///
    /// By convention `0/0 := 0`; a non-zero numerator over a zero denominator
    /// is an error.
    ///
    /// # Errors
    /// `Error::DivideByZero` on `x/0` with `x > 0`.
    pub fn divide(&self, other: &Factor) -> Result<Factor> {
        let domain = self.domain.union(&other.domain);
        let mut values = Vec::with_capacity(domain.size());

        let mut valuation = vec![0; domain.width()];
        for _ in 0..domain.size() {
            let num = self.values[self.domain.project_position(&valuation, &domain)];
            let den = other.values[other.domain.project_position(&valuation, &domain)];
            if den == 0.0 {
                if num != 0.0 {
                    return Err(Error::DivideByZero);
                }
                values.push(0.0);
            } else {
                values.push(num / den);
            }
            domain.next_valuation(&mut valuation);
        }

        let partition = values.iter().sum();
        Ok(Factor {
            domain,
            values,
            partition,
        })
    }

    /// Draw a value for the first scope variable from the categorical
    /// distribution obtained by fixing every other scope variable to its
    /// value in `evidence`, renormalizing if needed.
    ///
    /// This interprets the factor as a conditional `P(X | parents)` with `X`
    /// first in the scope, the layout the BAYES readers produce.
    ///
    /// # Errors
    /// * `Error::InvalidScope` if the factor is a scalar
    /// * `Error::MissingParent` if a non-target scope variable has no value
    /// * `Error::InconsistentEvidence` if the selected row sums to zero
    pub fn sample<R: Rng>(&self, evidence: &Evidence, rng: &mut R) -> Result<(usize, usize)> {
        let target = match self.domain.scope().first() {
            Some(v) => *v,
            None => return Err(Error::InvalidScope),
        };
        for v in &self.domain.scope()[1..] {
            if !evidence.contains_key(&v.id()) {
                return Err(Error::MissingParent(v.id()));
            }
        }

        // the target contributes zero to the base position; its stride then
        // walks the conditional row
        let base = self
            .domain
            .project_position_fixing(&[], &Domain::empty(), evidence);
        let stride = self.domain.offset(0);

        let weights: Vec<f64> = (0..target.cardinality())
            .map(|k| self.values[base + k * stride])
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(Error::InconsistentEvidence);
        }

        let draw = rng.gen::<f64>() * total;
        let mut upper = 0.0;
        for (value, w) in weights.iter().enumerate() {
            upper += w;
            if draw < upper {
                return Ok((target.id(), value));
            }
        }
        Ok((target.id(), target.cardinality() - 1))
    }

    /// The largest table value
    pub fn max(&self) -> f64 {
        self.values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// The smallest table value
    pub fn min(&self) -> f64 {
        self.values.iter().cloned().fold(f64::INFINITY, f64::min)
    }
}

impl Index<usize> for Factor {
    type Output = f64;

    fn index(&self, position: usize) -> &f64 {
        &self.values[position]
    }
}

impl Mul for &Factor {
    type Output = Factor;

    fn mul(self, other: &Factor) -> Factor {
        self.product(other)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Factor(width:{}, size:{}, partition:{})",
            self.width(),
            self.size(),
            self.partition
        )?;

        let mut valuation = vec![0; self.width()];
        for i in 0..self.size() {
            for v in &valuation {
                write!(f, "{} ", v)?;
            }
            writeln!(f, ": {}", self.values[i])?;
            self.domain.next_valuation(&mut valuation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TOLERANCE: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn check_partition(f: &Factor) {
        let sum: f64 = f.values().iter().sum();
        assert_close(f.partition(), sum);
    }

    #[test]
    fn new_checks_size_and_sign() {
        let d = Domain::new(vec![Variable::binary(0)]).unwrap();
        match Factor::new(d.clone(), vec![0.5, 0.5, 0.5]) {
            Err(Error::SizeMismatch {
                expected: 2,
                found: 3,
            }) => (),
            other => panic!("expected a size mismatch, got {:?}", other),
        }
        match Factor::new(d, vec![0.5, -0.5]) {
            Err(Error::NegativeValue) => (),
            other => panic!("expected a negative value error, got {:?}", other),
        }
    }

    #[test]
    fn scalar_factor() {
        let f = Factor::constant(1.0);
        assert_eq!(f.width(), 0);
        assert_eq!(f.size(), 1);
        assert_close(f.partition(), 1.0);
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 4.3
    fn product() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);
        let c = Variable::binary(2);

        let phi1 = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![0.5, 0.8, 0.1, 0.0, 0.3, 0.9],
        )
        .unwrap();
        let phi2 = Factor::new(Domain::new(vec![b, c]).unwrap(), vec![0.5, 0.7, 0.1, 0.2]).unwrap();

        let phi = phi1.product(&phi2);

        let ids: Vec<usize> = phi.domain().scope().iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        let expected = [
            0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0.0, 0.0, 0.15, 0.21, 0.09, 0.18,
        ];
        for (i, e) in expected.iter().enumerate() {
            assert_close(phi[i], *e);
        }
        check_partition(&phi);
    }

    #[test]
    fn product_is_commutative_up_to_reordering() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);
        let c = Variable::binary(2);

        let phi1 = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![0.5, 0.8, 0.1, 0.0, 0.3, 0.9],
        )
        .unwrap();
        let phi2 = Factor::new(Domain::new(vec![b, c]).unwrap(), vec![0.5, 0.7, 0.1, 0.2]).unwrap();

        let fg = phi1.product(&phi2);
        let gf = phi2.product(&phi1);

        let mut valuation = vec![0; fg.width()];
        for _ in 0..fg.size() {
            let here = fg.domain().position(&valuation);
            let there = gf.domain().project_position(&valuation, fg.domain());
            assert_close(fg[here], gf[there]);
            fg.domain().next_valuation(&mut valuation);
        }
    }

    #[test]
    fn product_with_scalar_is_identity() {
        let a = Variable::binary(0);
        let f = Factor::new(Domain::single(a), vec![0.3, 0.7]).unwrap();

        let g = f.product(&Factor::constant(1.0));
        assert_eq!(g.domain(), f.domain());
        assert_close(g[0], 0.3);
        assert_close(g[1], 0.7);

        let g = Factor::constant(1.0).product(&f);
        assert_close(g[1], 0.7);
    }

    #[test]
    fn mul_operator() {
        let a = Variable::binary(0);
        let f = Factor::new(Domain::single(a), vec![0.3, 0.7]).unwrap();
        let g = &f * &f;
        assert_close(g[0], 0.09);
        assert_close(g[1], 0.49);
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 9.7
    fn sum_out() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);
        let c = Variable::binary(2);

        let phi = Factor::new(
            Domain::new(vec![a, b, c]).unwrap(),
            vec![
                0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0.0, 0.0, 0.15, 0.21, 0.09, 0.18,
            ],
        )
        .unwrap();

        let marginalized = phi.sum_out(&b);
        let ids: Vec<usize> = marginalized.domain().scope().iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![0, 2]);

        let expected = [0.33, 0.51, 0.05, 0.07, 0.24, 0.39];
        for (i, e) in expected.iter().enumerate() {
            assert_close(marginalized[i], *e);
        }
        check_partition(&marginalized);

        // summing out a variable outside the scope is a copy
        let same = phi.sum_out(&Variable::binary(9));
        assert_eq!(same.size(), phi.size());
    }

    #[test]
    fn sum_out_commutes() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);
        let c = Variable::binary(2);

        let phi = Factor::new(
            Domain::new(vec![a, b, c]).unwrap(),
            vec![
                0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0.0, 0.0, 0.15, 0.21, 0.09, 0.18,
            ],
        )
        .unwrap();

        let ab = phi.sum_out(&a).sum_out(&b);
        let ba = phi.sum_out(&b).sum_out(&a);
        assert_eq!(ab.domain(), ba.domain());
        for i in 0..ab.size() {
            assert_close(ab[i], ba[i]);
        }
    }

    #[test]
    fn condition_selects_rows() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);

        let phi = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![0.5, 0.8, 0.1, 0.0, 0.3, 0.9],
        )
        .unwrap();

        let mut evidence = Evidence::new();
        evidence.insert(0, 2);
        let reduced = phi.condition(&evidence);

        let ids: Vec<usize> = reduced.domain().scope().iter().map(|v| v.id()).collect();
        assert_eq!(ids, vec![1]);
        assert_close(reduced[0], 0.3);
        assert_close(reduced[1], 0.9);

        // evidence disjoint from the scope leaves the factor unchanged
        let mut unrelated = Evidence::new();
        unrelated.insert(7, 0);
        let same = phi.condition(&unrelated);
        assert_eq!(same.size(), phi.size());
    }

    #[test]
    fn condition_composes_over_disjoint_evidence() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);
        let c = Variable::binary(2);

        let phi = Factor::new(
            Domain::new(vec![a, b, c]).unwrap(),
            vec![
                0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0.0, 0.0, 0.15, 0.21, 0.09, 0.18,
            ],
        )
        .unwrap();

        let mut e1 = Evidence::new();
        e1.insert(0, 1);
        let mut e2 = Evidence::new();
        e2.insert(2, 1);
        let mut both = Evidence::new();
        both.insert(0, 1);
        both.insert(2, 1);

        let once = phi.condition(&both);
        let twice = phi.condition(&e1).condition(&e2);
        assert_eq!(once.domain(), twice.domain());
        for i in 0..once.size() {
            assert_close(once[i], twice[i]);
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let a = Variable::binary(0);
        let f = Factor::new(Domain::single(a), vec![3.0, 1.0]).unwrap();

        let n = f.normalize();
        assert_close(n.partition(), 1.0);
        assert_close(n[0], 0.75);

        let again = n.normalize();
        assert_close(again[0], 0.75);
        assert_close(again.partition(), 1.0);
    }

    #[test]
    fn normalize_of_zero_factor_is_zero() {
        let a = Variable::binary(0);
        let f = Factor::new(Domain::single(a), vec![0.0, 0.0]).unwrap();
        let n = f.normalize();
        assert_eq!(n.partition(), 0.0);
        assert_eq!(n[0], 0.0);
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 10.7
    fn divide() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);

        let phi1 = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![0.5, 0.2, 0.0, 0.0, 0.3, 0.45],
        )
        .unwrap();
        let phi2 = Factor::new(Domain::single(a), vec![0.8, 0.0, 0.6]).unwrap();

        let phi = phi1.divide(&phi2).unwrap();

        let expected = [0.625, 0.25, 0.0, 0.0, 0.5, 0.75];
        for (i, e) in expected.iter().enumerate() {
            assert_close(phi[i], *e);
        }
        check_partition(&phi);
    }

    #[test]
    fn divide_by_zero_is_an_error() {
        let a = Variable::binary(0);
        let phi1 = Factor::new(Domain::single(a), vec![0.5, 0.5]).unwrap();
        let phi2 = Factor::new(Domain::single(a), vec![0.0, 1.0]).unwrap();

        match phi1.divide(&phi2) {
            Err(Error::DivideByZero) => (),
            other => panic!("expected a divide by zero error, got {:?}", other),
        }
    }

    #[test]
    fn value_lookup() {
        let a = Variable::new(0, 3);
        let b = Variable::binary(1);

        let phi = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![0.5, 0.8, 0.1, 0.0, 0.3, 0.9],
        )
        .unwrap();

        let mut valuation = Evidence::new();
        valuation.insert(0, 2);
        valuation.insert(1, 0);
        assert_close(phi.value(&valuation).unwrap(), 0.3);

        valuation.remove(&1);
        match phi.value(&valuation) {
            Err(Error::IncompleteValuation(1)) => (),
            other => panic!("expected an incomplete valuation error, got {:?}", other),
        }
    }

    #[test]
    fn sample_follows_the_conditional_row() {
        let a = Variable::binary(0);
        let b = Variable::binary(1);

        // P(a | b) with a deterministic row: P(a=1 | b=1) = 1
        let phi = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![0.5, 0.0, 0.5, 1.0],
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let mut evidence = Evidence::new();
        evidence.insert(1, 1);
        for _ in 0..20 {
            let (id, value) = phi.sample(&evidence, &mut rng).unwrap();
            assert_eq!(id, 0);
            assert_eq!(value, 1);
        }
    }

    #[test]
    fn sample_requires_parent_values() {
        let a = Variable::binary(0);
        let b = Variable::binary(1);
        let phi = Factor::new(
            Domain::new(vec![a, b]).unwrap(),
            vec![0.5, 0.5, 0.5, 0.5],
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        match phi.sample(&Evidence::new(), &mut rng) {
            Err(Error::MissingParent(1)) => (),
            other => panic!("expected a missing parent error, got {:?}", other),
        }
    }

    #[test]
    fn extrema() {
        let a = Variable::new(0, 3);
        let f = Factor::new(Domain::single(a), vec![0.2, 0.7, 0.1]).unwrap();
        assert_close(f.max(), 0.7);
        assert_close(f.min(), 0.1);
    }
}
