//! Inference engine.

use tb_core::Real;

use crate::error::{FuzzyError, FuzzyResult};
use crate::parser::parse_rule;
use crate::rule::{Rule, RuleBlock};
use crate::variable::{InputVariable, OutputVariable};

/// Owns the variables and rule blocks of one fuzzy system.
///
/// A typical cycle is [`Engine::set_input_value`] for every input,
/// [`Engine::process`], then [`Engine::output_value`] for every output.
/// [`Engine::restart`] clears the per-cycle state between unrelated
/// evaluations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Engine {
    name: String,
    inputs: Vec<InputVariable>,
    outputs: Vec<OutputVariable>,
    blocks: Vec<RuleBlock>,
}

impl Engine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn check_unique(&self, name: &str) -> FuzzyResult<()> {
        let taken = self.inputs.iter().any(|v| v.name() == name)
            || self.outputs.iter().any(|v| v.name() == name);
        if taken {
            return Err(FuzzyError::DuplicateVariable {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if another variable already has this name.
    pub fn add_input_variable(&mut self, variable: InputVariable) -> FuzzyResult<()> {
        self.check_unique(variable.name())?;
        self.inputs.push(variable);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if another variable already has this name.
    pub fn add_output_variable(&mut self, variable: OutputVariable) -> FuzzyResult<()> {
        self.check_unique(variable.name())?;
        self.outputs.push(variable);
        Ok(())
    }

    /// Parse rule text against this engine's variables.
    pub fn parse_rule(&self, text: &str) -> FuzzyResult<Rule> {
        parse_rule(text, &self.inputs, &self.outputs)
    }

    /// # Errors
    ///
    /// Returns an error if a rule refers to a variable or term this engine
    /// does not have (a rule parsed for another engine).
    pub fn add_rule_block(&mut self, block: RuleBlock) -> FuzzyResult<()> {
        for rule in block.rules() {
            let antecedent_ok = rule.antecedent.propositions().iter().all(|p| {
                self.inputs
                    .get(p.variable)
                    .is_some_and(|v| p.term < v.terms().len())
            });
            let consequent_ok = rule.consequents.iter().all(|p| {
                self.outputs
                    .get(p.variable)
                    .is_some_and(|v| p.term < v.terms().len())
            });
            if !(antecedent_ok && consequent_ok) {
                return Err(FuzzyError::InvalidArg {
                    what: "rule refers to variables or terms outside this engine",
                });
            }
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn input_variables(&self) -> &[InputVariable] {
        &self.inputs
    }

    pub fn output_variables(&self) -> &[OutputVariable] {
        &self.outputs
    }

    pub fn rule_blocks(&self) -> &[RuleBlock] {
        &self.blocks
    }

    pub fn input_variable(&self, name: &str) -> Option<&InputVariable> {
        self.inputs.iter().find(|v| v.name() == name)
    }

    pub fn output_variable(&self, name: &str) -> Option<&OutputVariable> {
        self.outputs.iter().find(|v| v.name() == name)
    }

    fn unknown(name: &str) -> FuzzyError {
        FuzzyError::UnknownVariable {
            name: name.to_string(),
        }
    }

    pub fn set_input_value(&mut self, name: &str, value: Real) -> FuzzyResult<()> {
        let variable = self
            .inputs
            .iter_mut()
            .find(|v| v.name() == name)
            .ok_or_else(|| Self::unknown(name))?;
        variable.set_value(value);
        Ok(())
    }

    pub fn input_value(&self, name: &str) -> FuzzyResult<Real> {
        self.input_variable(name)
            .map(InputVariable::value)
            .ok_or_else(|| Self::unknown(name))
    }

    /// Crisp value of `name` from the last [`Engine::process`] call.
    pub fn output_value(&self, name: &str) -> FuzzyResult<Real> {
        self.output_variable(name)
            .map(OutputVariable::value)
            .ok_or_else(|| Self::unknown(name))
    }

    /// Whether the engine has at least one input, one output and one rule.
    pub fn is_ready(&self) -> bool {
        self.check_ready().is_ok()
    }

    fn check_ready(&self) -> FuzzyResult<()> {
        if self.inputs.is_empty() {
            return Err(FuzzyError::NotReady {
                what: "no input variables",
            });
        }
        if self.outputs.is_empty() {
            return Err(FuzzyError::NotReady {
                what: "no output variables",
            });
        }
        if self.blocks.iter().all(|b| b.rules().is_empty()) {
            return Err(FuzzyError::NotReady { what: "no rules" });
        }
        Ok(())
    }

    /// Unset every input and drop every output's activations and value.
    pub fn restart(&mut self) {
        for input in &mut self.inputs {
            input.set_value(Real::NAN);
        }
        for output in &mut self.outputs {
            output.clear();
        }
    }

    /// Run one inference over the current input values.
    ///
    /// Outputs no rule fired for take their default value (NaN unless
    /// configured otherwise).
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is incomplete or an input is not a
    /// finite number.
    pub fn process(&mut self) -> FuzzyResult<()> {
        self.check_ready()?;
        if let Some(bad) = self.inputs.iter().find(|v| !v.value().is_finite()) {
            return Err(FuzzyError::NonFiniteInput {
                variable: bad.name().to_string(),
                value: bad.value(),
            });
        }

        for output in &mut self.outputs {
            output.clear();
        }

        for block in &self.blocks {
            for rule in block.rules() {
                let degree = rule.weight
                    * rule.antecedent.activation_degree(
                        &self.inputs,
                        block.conjunction(),
                        block.disjunction(),
                    );
                if degree > 0.0 {
                    for c in &rule.consequents {
                        self.outputs[c.variable].activate(c.term, degree, block.implication());
                    }
                }
            }
        }

        for output in &mut self.outputs {
            output.defuzzify();
        }
        Ok(())
    }
}
