//! Definition of the domain module
//!
//! A `Domain` is the ordered scope of a `Factor`: a sequence of distinct
//! `Variable`s together with the row-major linearization of their joint
//! value space. Every factor operation reduces to enumerating the
//! valuations of some domain with the odometer (`next_valuation`) and
//! translating each valuation into linear positions of the operand domains
//! (`project_position` and friends).

use crate::error::{Error, Result};
use crate::variable::{Evidence, Variable};

use std::collections::HashMap;
use std::fmt;

/// An ordered scope of distinct variables with row-major strides.
///
/// For a scope `[X0, X1, ..., Xw-1]` the stride of position `i` is the
/// product of the cardinalities of positions `i+1..w`, so the last variable
/// varies fastest. The empty scope has `size == 1` and represents the domain
/// of a scalar factor.
#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    scope: Vec<Variable>,
    offsets: Vec<usize>,
    size: usize,
    index: HashMap<usize, usize>,
}

impl Domain {
    /// Create a new `Domain` over the given scope.
    ///
    /// # Errors
    /// `Error::DuplicateVariable` if a variable id appears more than once.
    pub fn new(scope: Vec<Variable>) -> Result<Domain> {
        let mut index = HashMap::with_capacity(scope.len());
        for (i, v) in scope.iter().enumerate() {
            if index.insert(v.id(), i).is_some() {
                return Err(Error::DuplicateVariable(v.id()));
            }
        }

        let width = scope.len();
        let mut offsets = vec![0; width];
        let mut size = 1;
        for i in (0..width).rev() {
            offsets[i] = size;
            size *= scope[i].cardinality();
        }

        Ok(Domain {
            scope,
            offsets,
            size,
            index,
        })
    }

    /// The domain of a scalar factor.
    pub fn empty() -> Domain {
        Domain {
            scope: Vec::new(),
            offsets: Vec::new(),
            size: 1,
            index: HashMap::new(),
        }
    }

    /// The domain over a single variable.
    pub fn single(v: Variable) -> Domain {
        Domain::new(vec![v]).expect("a single variable cannot repeat")
    }

    /// Number of variables in the scope
    pub fn width(&self) -> usize {
        self.scope.len()
    }

    /// Number of valuations of the scope
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// The scope, in order
    pub fn scope(&self) -> &[Variable] {
        &self.scope
    }

    /// The variable at scope position `i`
    pub fn variable(&self, i: usize) -> Variable {
        self.scope[i]
    }

    /// The row-major stride of scope position `i`
    pub fn offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    pub fn contains(&self, id: usize) -> bool {
        self.index.contains_key(&id)
    }

    /// The scope position of the variable with the given id
    pub fn index_of(&self, id: usize) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// The scope of `self` followed by the variables of `other` not already
    /// present, preserving order.
    pub fn union(&self, other: &Domain) -> Domain {
        let mut scope = self.scope.clone();
        scope.extend(other.scope.iter().filter(|v| !self.contains(v.id())));
        Domain::new(scope).expect("the union of two valid scopes cannot repeat a variable")
    }

    /// The scope of `self` with `v` removed, preserving relative order.
    pub fn minus(&self, v: &Variable) -> Domain {
        let scope = self
            .scope
            .iter()
            .filter(|u| u.id() != v.id())
            .copied()
            .collect();
        Domain::new(scope).expect("removing a variable cannot introduce a duplicate")
    }

    /// The scope of `self` with every evidence variable removed.
    pub fn restrict(&self, evidence: &Evidence) -> Domain {
        let scope = self
            .scope
            .iter()
            .filter(|u| !evidence.contains_key(&u.id()))
            .copied()
            .collect();
        Domain::new(scope).expect("restricting a scope cannot introduce a duplicate")
    }

    /// Advance `valuation` to its row-major successor in place.
    ///
    /// Returns `true` while a successor exists; on overflow the valuation
    /// wraps to all zeroes and `false` is returned. Starting from all zeroes
    /// and advancing `size()` times therefore visits every valuation exactly
    /// once.
    pub fn next_valuation(&self, valuation: &mut [usize]) -> bool {
        for i in (0..valuation.len()).rev() {
            if valuation[i] + 1 < self.scope[i].cardinality() {
                valuation[i] += 1;
                return true;
            }
            valuation[i] = 0;
        }
        false
    }

    /// As `next_valuation`, but positions whose variable is a key of
    /// `evidence` are frozen and skipped by the odometer.
    pub fn next_valuation_fixing(&self, valuation: &mut [usize], evidence: &Evidence) -> bool {
        for i in (0..valuation.len()).rev() {
            if evidence.contains_key(&self.scope[i].id()) {
                continue;
            }
            if valuation[i] + 1 < self.scope[i].cardinality() {
                valuation[i] += 1;
                return true;
            }
            valuation[i] = 0;
        }
        false
    }

    /// The linear position of a valuation of this domain.
    pub fn position(&self, valuation: &[usize]) -> usize {
        valuation
            .iter()
            .zip(self.offsets.iter())
            .map(|(v, o)| v * o)
            .sum()
    }

    /// The linear position in this domain of the valuation whose coordinates
    /// are copied from `valuation`, which is indexed by `from`. Variables of
    /// this domain absent from `from` contribute zero.
    ///
    /// This is the primitive that aligns factors of different scopes during
    /// products, marginalizations and divisions.
    pub fn project_position(&self, valuation: &[usize], from: &Domain) -> usize {
        self.scope
            .iter()
            .zip(self.offsets.iter())
            .map(|(v, o)| from.index_of(v.id()).map_or(0, |j| valuation[j] * o))
            .sum()
    }

    /// As `project_position`, but the variable with id `id` takes `value`
    /// regardless of `from`. The variable need not be in this domain.
    pub fn project_position_with(
        &self,
        valuation: &[usize],
        from: &Domain,
        id: usize,
        value: usize,
    ) -> usize {
        self.scope
            .iter()
            .zip(self.offsets.iter())
            .map(|(v, o)| {
                if v.id() == id {
                    value * o
                } else {
                    from.index_of(v.id()).map_or(0, |j| valuation[j] * o)
                }
            })
            .sum()
    }

    /// As `project_position`, but variables that are keys of `evidence` take
    /// their observed value. Evidence takes precedence over `from`.
    pub fn project_position_fixing(
        &self,
        valuation: &[usize],
        from: &Domain,
        evidence: &Evidence,
    ) -> usize {
        self.scope
            .iter()
            .zip(self.offsets.iter())
            .map(|(v, o)| {
                if let Some(&value) = evidence.get(&v.id()) {
                    value * o
                } else {
                    from.index_of(v.id()).map_or(0, |j| valuation[j] * o)
                }
            })
            .sum()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain{{")?;
        for (i, v) in self.scope.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v.id())?;
        }
        write!(f, "}}")
    }
}
