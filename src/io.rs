//! Readers for the UAI model and evidence formats.
//!
//! Both formats are whitespace-separated token streams; `#` starts a line
//! comment. A model file is a `BAYES` or `MARKOV` header, the variable
//! cardinalities, the factor scopes and then the factor tables in row-major
//! order, child first for BAYES scopes. An evidence file is a count of
//! evidence sets followed by `(variable, value)` pairs.
//!
//! The readers return typed registries; everything downstream of them works
//! on `Variable`s and `Factor`s, never on text.

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::factor::Factor;
use crate::model::directed::BayesNet;
use crate::model::undirected::MarkovNet;
use crate::variable::{Evidence, Variable};

/// A model read from a UAI file, in the kind its header declared.
#[derive(Debug)]
pub enum Network {
    Bayes(BayesNet),
    Markov(MarkovNet),
}

struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = &'a str> + 'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Tokens<'a> {
        let inner = text
            .lines()
            .flat_map(|line| line.split('#').next().unwrap_or("").split_whitespace());
        Tokens {
            inner: Box::new(inner),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| Error::Parse(format!("unexpected end of input, expected {}", what)))
    }

    fn next_usize(&mut self, what: &str) -> Result<usize> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| Error::Parse(format!("expected {}, found '{}'", what, token)))
    }

    fn next_f64(&mut self, what: &str) -> Result<f64> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| Error::Parse(format!("expected {}, found '{}'", what, token)))
    }
}

/// Read a UAI model.
///
/// # Errors
/// `Error::Parse` on a bad header, a truncated file or a non-numeric token;
/// `Error::SizeMismatch` when a table length disagrees with its scope; the
/// `BayesNet` and `MarkovNet` constructor errors pass through.
pub fn read_model(text: &str) -> Result<Network> {
    let mut tokens = Tokens::new(text);

    let header = tokens.next("a BAYES or MARKOV header")?;
    if header != "BAYES" && header != "MARKOV" {
        return Err(Error::Parse(format!(
            "expected a BAYES or MARKOV header, found '{}'",
            header
        )));
    }

    let order = tokens.next_usize("the variable count")?;
    let mut variables = Vec::with_capacity(order);
    for id in 0..order {
        let cardinality = tokens.next_usize("a variable cardinality")?;
        if cardinality == 0 {
            return Err(Error::Parse(format!(
                "variable {} has cardinality zero",
                id
            )));
        }
        variables.push(Variable::new(id, cardinality));
    }

    let count = tokens.next_usize("the factor count")?;
    let mut scopes = Vec::with_capacity(count);
    for _ in 0..count {
        let width = tokens.next_usize("a scope width")?;
        let mut scope = Vec::with_capacity(width);
        for _ in 0..width {
            let id = tokens.next_usize("a scope variable id")?;
            let variable = variables
                .get(id)
                .copied()
                .ok_or(Error::UnknownVariable(id))?;
            scope.push(variable);
        }
        scopes.push(Domain::new(scope)?);
    }

    let mut factors = Vec::with_capacity(count);
    for domain in scopes {
        let size = tokens.next_usize("a table size")?;
        if size != domain.size() {
            return Err(Error::SizeMismatch {
                expected: domain.size(),
                found: size,
            });
        }
        let mut values = Vec::with_capacity(size);
        for _ in 0..size {
            values.push(tokens.next_f64("a table value")?);
        }
        factors.push(Factor::new(domain, values)?);
    }

    match header {
        "BAYES" => Ok(Network::Bayes(BayesNet::new(variables, factors)?)),
        _ => Ok(Network::Markov(MarkovNet::new(variables, factors)?)),
    }
}

/// Read a UAI evidence file against the model's variable registry. Returns
/// the first evidence set; the file typically holds exactly one.
///
/// # Errors
/// `Error::Parse` on truncation or non-numeric tokens;
/// `Error::UnknownVariable` and `Error::InvalidValue` on evidence that does
/// not fit the registry.
pub fn read_evidence(text: &str, variables: &[Variable]) -> Result<Evidence> {
    let mut tokens = Tokens::new(text);

    let sets = tokens.next_usize("the evidence set count")?;
    if sets == 0 {
        return Ok(Evidence::new());
    }

    let pairs = tokens.next_usize("the evidence pair count")?;
    let mut evidence = Evidence::new();
    for _ in 0..pairs {
        let id = tokens.next_usize("an evidence variable id")?;
        let value = tokens.next_usize("an evidence value")?;

        let variable = variables.get(id).ok_or(Error::UnknownVariable(id))?;
        if value >= variable.cardinality() {
            return Err(Error::InvalidValue {
                variable: id,
                value,
                cardinality: variable.cardinality(),
            });
        }
        evidence.insert(id, value);
    }
    Ok(evidence)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model::Model;

    const CHAIN: &str = "\
# a two-variable chain
BAYES
2
2 2
2
1 0
2 1 0
2
 0.3 0.7
4
 0.8 0.4
 0.2 0.6
";

    #[test]
    fn reads_a_bayes_model() {
        let network = read_model(CHAIN).unwrap();
        let bn = match network {
            Network::Bayes(bn) => bn,
            Network::Markov(_) => panic!("expected a BAYES model"),
        };

        assert_eq!(bn.variables().len(), 2);
        assert_eq!(bn.factors().len(), 2);
        assert!(bn.parents(1).contains(&0));
        assert!((bn.joint_distribution().partition() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reads_a_markov_model() {
        let text = "\
MARKOV
2
2 3
1
2 0 1
6
 1 2 3 4 5 6
";
        let network = read_model(text).unwrap();
        let mn = match network {
            Network::Markov(mn) => mn,
            Network::Bayes(_) => panic!("expected a MARKOV model"),
        };

        assert_eq!(mn.variables().len(), 2);
        assert!(mn.neighbors(0).contains(&1));
        assert!((mn.factors()[0].partition() - 21.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_a_bad_header() {
        match read_model("GRID\n1\n2\n0\n") {
            Err(Error::Parse(what)) => assert!(what.contains("GRID")),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_a_truncated_file() {
        match read_model("BAYES\n2\n2") {
            Err(Error::Parse(_)) => (),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_a_size_mismatch() {
        let text = "\
BAYES
1
2
1
1 0
3
 0.5 0.3 0.2
";
        match read_model(text) {
            Err(Error::SizeMismatch {
                expected: 2,
                found: 3,
            }) => (),
            other => panic!("expected a size mismatch, got {:?}", other),
        }
    }

    #[test]
    fn rejects_an_unknown_scope_id() {
        let text = "\
MARKOV
1
2
1
1 4
2
 0.5 0.5
";
        match read_model(text) {
            Err(Error::UnknownVariable(4)) => (),
            other => panic!("expected an unknown variable error, got {:?}", other),
        }
    }

    #[test]
    fn reads_evidence_pairs() {
        let variables = vec![Variable::binary(0), Variable::new(1, 3)];
        let evidence = read_evidence("1\n2 0 1 1 2\n", &variables).unwrap();
        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[&0], 1);
        assert_eq!(evidence[&1], 2);

        // an empty file section means no evidence
        let empty = read_evidence("0\n", &variables).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn validates_evidence_against_the_registry() {
        let variables = vec![Variable::binary(0)];
        match read_evidence("1\n1 3 0\n", &variables) {
            Err(Error::UnknownVariable(3)) => (),
            other => panic!("expected an unknown variable error, got {:?}", other),
        }
        match read_evidence("1\n1 0 2\n", &variables) {
            Err(Error::InvalidValue { variable: 0, .. }) => (),
            other => panic!("expected an invalid value error, got {:?}", other),
        }
    }
}
