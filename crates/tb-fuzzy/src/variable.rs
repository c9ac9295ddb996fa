//! Input and output linguistic variables.

use tb_core::Real;

use crate::defuzz::Centroid;
use crate::error::{FuzzyError, FuzzyResult};
use crate::norm::{SNorm, TNorm};
use crate::term::{Term, check_identifier};

fn check_range(minimum: Real, maximum: Real) -> FuzzyResult<()> {
    if !(minimum.is_finite() && maximum.is_finite() && minimum < maximum) {
        return Err(FuzzyError::InvalidArg {
            what: "variable range must be finite with minimum < maximum",
        });
    }
    Ok(())
}

/// A crisp input together with the terms it is fuzzified against.
#[derive(Debug, Clone, PartialEq)]
pub struct InputVariable {
    name: String,
    minimum: Real,
    maximum: Real,
    terms: Vec<Term>,
    value: Real,
}

impl InputVariable {
    /// # Errors
    ///
    /// Returns an error for an invalid name or an empty/non-finite range.
    pub fn new(name: impl Into<String>, minimum: Real, maximum: Real) -> FuzzyResult<Self> {
        let name = name.into();
        check_identifier(&name)?;
        check_range(minimum, maximum)?;
        Ok(Self {
            name,
            minimum,
            maximum,
            terms: Vec::new(),
            value: Real::NAN,
        })
    }

    /// Add a term. A later term with an existing name is shadowed by the first.
    pub fn with_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> (Real, Real) {
        (self.minimum, self.maximum)
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term(&self, name: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.name() == name)
    }

    pub(crate) fn term_index(&self, name: &str) -> Option<usize> {
        self.terms.iter().position(|t| t.name() == name)
    }

    /// Current crisp value; NaN until set.
    pub fn value(&self) -> Real {
        self.value
    }

    /// Values outside the range are kept as given; the terms saturate.
    pub fn set_value(&mut self, value: Real) {
        self.value = value;
    }

    /// Degree to which the current value belongs to term `index`.
    pub(crate) fn membership(&self, index: usize) -> Real {
        self.terms[index].membership(self.value)
    }
}

/// A consequent term scaled by the degree of the rule that fired it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Activation {
    term: usize,
    degree: Real,
    implication: TNorm,
}

/// An inferred variable: collects activated terms, then defuzzifies them.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputVariable {
    name: String,
    minimum: Real,
    maximum: Real,
    terms: Vec<Term>,
    aggregation: SNorm,
    defuzzifier: Centroid,
    default_value: Real,
    activations: Vec<Activation>,
    value: Real,
}

impl OutputVariable {
    /// Output with max aggregation, default centroid and a NaN default value.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name or an empty/non-finite range.
    pub fn new(name: impl Into<String>, minimum: Real, maximum: Real) -> FuzzyResult<Self> {
        let name = name.into();
        check_identifier(&name)?;
        check_range(minimum, maximum)?;
        Ok(Self {
            name,
            minimum,
            maximum,
            terms: Vec::new(),
            aggregation: SNorm::default(),
            defuzzifier: Centroid::default(),
            default_value: Real::NAN,
            activations: Vec::new(),
            value: Real::NAN,
        })
    }

    pub fn with_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    pub fn with_aggregation(mut self, aggregation: SNorm) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_defuzzifier(mut self, defuzzifier: Centroid) -> Self {
        self.defuzzifier = defuzzifier;
        self
    }

    /// Value reported when no rule activates this output.
    pub fn with_default_value(mut self, value: Real) -> Self {
        self.default_value = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> (Real, Real) {
        (self.minimum, self.maximum)
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn term(&self, name: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.name() == name)
    }

    pub(crate) fn term_index(&self, name: &str) -> Option<usize> {
        self.terms.iter().position(|t| t.name() == name)
    }

    pub fn aggregation(&self) -> SNorm {
        self.aggregation
    }

    pub fn default_value(&self) -> Real {
        self.default_value
    }

    /// Last defuzzified value; NaN before the first inference.
    pub fn value(&self) -> Real {
        self.value
    }

    /// Whether the last inference activated any term.
    pub fn is_activated(&self) -> bool {
        !self.activations.is_empty()
    }

    pub(crate) fn activate(&mut self, term: usize, degree: Real, implication: TNorm) {
        self.activations.push(Activation {
            term,
            degree,
            implication,
        });
    }

    /// Membership of `x` in the union of all activated, implied terms.
    pub fn aggregated_membership(&self, x: Real) -> Real {
        self.activations.iter().fold(0.0, |acc, a| {
            let implied = a
                .implication
                .compute(a.degree, self.terms[a.term].membership(x));
            self.aggregation.compute(acc, implied)
        })
    }

    pub(crate) fn defuzzify(&mut self) {
        self.value = if self.activations.is_empty() {
            self.default_value
        } else {
            self.defuzzifier
                .defuzzify(|x| self.aggregated_membership(x), self.minimum, self.maximum)
        };
    }

    pub(crate) fn clear(&mut self) {
        self.activations.clear();
        self.value = Real::NAN;
    }
}
