//! Mamdani-style fuzzy inference engine.
//!
//! The engine is a small nonlinear function evaluator: crisp inputs are
//! fuzzified through linguistic terms, a rule block combines them, and each
//! output variable aggregates the activated consequents into one fuzzy set
//! that is defuzzified back to a crisp value.
//!
//! # Architecture
//!
//! - [`Term`]: named membership function (ramp, triangle)
//! - [`InputVariable`] / [`OutputVariable`]: ranges, terms, current values
//! - [`Rule`] / [`RuleBlock`]: antecedent expression tree, consequents, operators
//! - [`parse_rule`]: textual rule language (`if X is A and Y is B then Z is C`)
//! - [`Centroid`]: discretized center-of-mass defuzzifier
//! - [`Engine`]: owns variables and rule blocks, runs one inference per `process`
//!
//! Variables, terms and rules are fixed once the engine is assembled; only
//! input values and the per-inference fuzzy outputs change between calls.

pub mod defuzz;
pub mod engine;
pub mod error;
pub mod norm;
pub mod parser;
pub mod rule;
pub mod term;
pub mod variable;

pub use defuzz::Centroid;
pub use engine::Engine;
pub use error::{FuzzyError, FuzzyResult};
pub use norm::{SNorm, TNorm};
pub use parser::parse_rule;
pub use rule::{Expression, Proposition, Rule, RuleBlock};
pub use term::{Shape, Term};
pub use variable::{InputVariable, OutputVariable};
