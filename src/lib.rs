//! An inference engine for discrete probabilistic graphical models.
//!
//! A model is a registry of finitely-valued `Variable`s and non-negative
//! `Factor` tables over subsets of them, wrapped as a directed `BayesNet` or
//! an undirected `MarkovNet`. The engine answers partition, marginal and
//! conditional queries exactly (bucket elimination over heuristic
//! elimination orders) or approximately (forward, likelihood-weighted and
//! Gibbs sampling, and loopy sum-product on the factor graph), and the
//! directed wrapper exposes the structural queries: roots and leaves,
//! ancestors and descendants, Markov blankets, Bayes-Ball requisite nodes
//! and m-separation.

pub mod domain;
pub mod error;
pub mod factor;
pub mod graph;
pub mod inference;
pub mod io;
pub mod model;
pub mod samplers;
pub mod variable;

pub use domain::Domain;
pub use error::{Error, Result};
pub use factor::Factor;
pub use graph::{EliminationHeuristic, MoralGraph};
pub use model::{BayesNet, MarkovNet, Model};
pub use variable::{Evidence, Variable};
