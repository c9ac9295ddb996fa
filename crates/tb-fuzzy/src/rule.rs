//! Rules and rule blocks.
//!
//! Propositions refer to variables and terms by index into the owning
//! engine, so rules are built through [`crate::Engine::parse_rule`] (or
//! [`crate::parse_rule`] against the same variable lists) and are only
//! meaningful for that engine.

use tb_core::Real;

use crate::norm::{SNorm, TNorm};
use crate::variable::InputVariable;

/// `variable is [not] term`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposition {
    pub variable: usize,
    pub term: usize,
    pub negated: bool,
}

/// Antecedent expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Proposition(Proposition),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Truth value of the expression for the current input values.
    pub fn activation_degree(
        &self,
        inputs: &[InputVariable],
        conjunction: TNorm,
        disjunction: SNorm,
    ) -> Real {
        match self {
            Expression::Proposition(p) => {
                let mu = inputs[p.variable].membership(p.term);
                if p.negated { 1.0 - mu } else { mu }
            }
            Expression::And(l, r) => conjunction.compute(
                l.activation_degree(inputs, conjunction, disjunction),
                r.activation_degree(inputs, conjunction, disjunction),
            ),
            Expression::Or(l, r) => disjunction.compute(
                l.activation_degree(inputs, conjunction, disjunction),
                r.activation_degree(inputs, conjunction, disjunction),
            ),
        }
    }

    pub(crate) fn propositions(&self) -> Vec<&Proposition> {
        match self {
            Expression::Proposition(p) => vec![p],
            Expression::And(l, r) | Expression::Or(l, r) => {
                let mut v = l.propositions();
                v.extend(r.propositions());
                v
            }
        }
    }
}

/// One parsed rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub text: String,
    pub antecedent: Expression,
    /// Output propositions; never negated.
    pub consequents: Vec<Proposition>,
    pub weight: Real,
}

/// Rules sharing the same operators.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBlock {
    name: String,
    conjunction: TNorm,
    disjunction: SNorm,
    implication: TNorm,
    rules: Vec<Rule>,
}

impl RuleBlock {
    /// Block with min conjunction, max disjunction and product implication.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conjunction: TNorm::Minimum,
            disjunction: SNorm::Maximum,
            implication: TNorm::AlgebraicProduct,
            rules: Vec::new(),
        }
    }

    pub fn with_conjunction(mut self, conjunction: TNorm) -> Self {
        self.conjunction = conjunction;
        self
    }

    pub fn with_disjunction(mut self, disjunction: SNorm) -> Self {
        self.disjunction = disjunction;
        self
    }

    pub fn with_implication(mut self, implication: TNorm) -> Self {
        self.implication = implication;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conjunction(&self) -> TNorm {
        self.conjunction
    }

    pub fn disjunction(&self) -> SNorm {
        self.disjunction
    }

    pub fn implication(&self) -> TNorm {
        self.implication
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}
