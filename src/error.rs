//! Defines the `Error` type for the belief library

use std::error;
use std::fmt;
use std::result;

pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A malformed model or evidence file; carries the offending token or a
    /// description of what was expected.
    Parse(String),

    /// A variable appeared more than once in a scope
    DuplicateVariable(usize),

    /// A variable id that is not part of the model
    UnknownVariable(usize),

    /// An observed value at or beyond the variable's cardinality
    InvalidValue {
        variable: usize,
        value: usize,
        cardinality: usize,
    },

    /// A factor table whose length disagrees with the size of its domain
    SizeMismatch { expected: usize, found: usize },

    /// A factor value below zero
    NegativeValue,

    /// A scope that does not satisfy the constraints of an operation
    InvalidScope,

    /// A registry whose variables and factors do not line up as a model
    InvalidModel(String),

    /// The parent graph of a BAYES model contains a cycle
    CyclicModel,

    /// A conditional factor was sampled without a value for one of its parents
    MissingParent(usize),

    /// A value lookup with an assignment that does not cover the scope
    IncompleteValuation(usize),

    /// Exactly what it sounds like
    DivideByZero,

    /// Evidence with zero probability mass under the model
    InconsistentEvidence,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(what) => write!(f, "parse error: {}", what),
            Error::DuplicateVariable(id) => {
                write!(f, "variable {} appears more than once in the scope", id)
            }
            Error::UnknownVariable(id) => write!(f, "unknown variable id {}", id),
            Error::InvalidValue {
                variable,
                value,
                cardinality,
            } => write!(
                f,
                "value {} is out of range for variable {} with cardinality {}",
                value, variable, cardinality
            ),
            Error::SizeMismatch { expected, found } => write!(
                f,
                "table size {} disagrees with the domain size {}",
                found, expected
            ),
            Error::NegativeValue => write!(f, "factor values may not be negative"),
            Error::InvalidScope => write!(f, "provided scope did not satisfy constraints"),
            Error::InvalidModel(what) => write!(f, "invalid model: {}", what),
            Error::CyclicModel => write!(f, "the parent relation contains a cycle"),
            Error::MissingParent(id) => {
                write!(f, "no value for parent variable {} while sampling", id)
            }
            Error::IncompleteValuation(id) => {
                write!(f, "valuation is missing a value for variable {}", id)
            }
            Error::DivideByZero => write!(f, "encountered division by zero"),
            Error::InconsistentEvidence => {
                write!(f, "the evidence has zero probability under the model")
            }
        }
    }
}

impl error::Error for Error {}
