//! Textual rule language.
//!
//! ```text
//! rule        := "if" disjunction "then" consequent ("and" consequent)* ["with" weight]
//! disjunction := conjunction ("or" conjunction)*
//! conjunction := atom ("and" atom)*
//! atom        := "(" disjunction ")" | input "is" ["not"] term
//! consequent  := output "is" term
//! ```
//!
//! `and` binds tighter than `or`; both associate to the left. Names are
//! resolved while parsing, so a rule that mentions an unknown variable or
//! term is rejected up front.

use tb_core::Real;

use crate::error::{FuzzyError, FuzzyResult};
use crate::rule::{Expression, Proposition, Rule};
use crate::variable::{InputVariable, OutputVariable};

/// Parse `text` against the given input and output variables.
///
/// # Errors
///
/// Returns [`FuzzyError::Parse`] for malformed text, unknown names or a
/// weight outside `[0, 1]`.
pub fn parse_rule(
    text: &str,
    inputs: &[InputVariable],
    outputs: &[OutputVariable],
) -> FuzzyResult<Rule> {
    let mut parser = Parser {
        text,
        tokens: tokenize(text),
        pos: 0,
        inputs,
        outputs,
    };
    parser.rule()
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() || c == '(' || c == ')' {
            if let Some(s) = start.take() {
                tokens.push(&text[s..i]);
            }
            if !c.is_whitespace() {
                tokens.push(&text[i..i + c.len_utf8()]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
    inputs: &'a [InputVariable],
    outputs: &'a [OutputVariable],
}

impl<'a> Parser<'a> {
    fn error(&self, what: impl Into<String>) -> FuzzyError {
        FuzzyError::Parse {
            rule: self.text.to_string(),
            what: what.into(),
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn next_token(&mut self, expected: &str) -> FuzzyResult<&'a str> {
        let token = self
            .peek()
            .ok_or_else(|| self.error(format!("expected {expected}, found end of rule")))?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, keyword: &str) -> bool {
        if self.peek() == Some(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, keyword: &str) -> FuzzyResult<()> {
        let token = self.next_token(&format!("'{keyword}'"))?;
        if token == keyword {
            Ok(())
        } else {
            Err(self.error(format!("expected '{keyword}', found '{token}'")))
        }
    }

    fn rule(&mut self) -> FuzzyResult<Rule> {
        self.expect("if")?;
        let antecedent = self.disjunction()?;
        self.expect("then")?;

        let mut consequents = vec![self.consequent()?];
        while self.eat("and") {
            consequents.push(self.consequent()?);
        }

        let weight = if self.eat("with") {
            self.weight()?
        } else {
            1.0
        };

        if let Some(token) = self.peek() {
            return Err(self.error(format!("unexpected '{token}' after rule")));
        }

        Ok(Rule {
            text: self.text.trim().to_string(),
            antecedent,
            consequents,
            weight,
        })
    }

    fn disjunction(&mut self) -> FuzzyResult<Expression> {
        let mut left = self.conjunction()?;
        while self.eat("or") {
            let right = self.conjunction()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> FuzzyResult<Expression> {
        let mut left = self.atom()?;
        while self.eat("and") {
            let right = self.atom()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn atom(&mut self) -> FuzzyResult<Expression> {
        if self.eat("(") {
            let inner = self.disjunction()?;
            self.expect(")")?;
            return Ok(inner);
        }

        let name = self.next_token("an input variable")?;
        let variable = self
            .inputs
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| self.error(format!("unknown input variable '{name}'")))?;
        self.expect("is")?;
        let negated = self.eat("not");
        let term_name = self.next_token("a term")?;
        let term = self.inputs[variable]
            .term_index(term_name)
            .ok_or_else(|| self.error(format!("unknown term '{term_name}' for '{name}'")))?;

        Ok(Expression::Proposition(Proposition {
            variable,
            term,
            negated,
        }))
    }

    fn consequent(&mut self) -> FuzzyResult<Proposition> {
        let name = self.next_token("an output variable")?;
        let variable = self
            .outputs
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| self.error(format!("unknown output variable '{name}'")))?;
        self.expect("is")?;
        if self.peek() == Some("not") {
            return Err(self.error("consequents cannot be negated"));
        }
        let term_name = self.next_token("a term")?;
        let term = self.outputs[variable]
            .term_index(term_name)
            .ok_or_else(|| self.error(format!("unknown term '{term_name}' for '{name}'")))?;

        Ok(Proposition {
            variable,
            term,
            negated: false,
        })
    }

    fn weight(&mut self) -> FuzzyResult<Real> {
        let token = self.next_token("a weight")?;
        let weight: Real = token
            .parse()
            .map_err(|_| self.error(format!("invalid weight '{token}'")))?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(self.error(format!("weight {weight} outside [0, 1]")));
        }
        Ok(weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn vars() -> (Vec<InputVariable>, Vec<OutputVariable>) {
        let a = InputVariable::new("A", 0.0, 1.0)
            .unwrap()
            .with_term(Term::ramp("LO", 1.0, 0.0).unwrap())
            .with_term(Term::ramp("HI", 0.0, 1.0).unwrap());
        let b = InputVariable::new("B", 0.0, 1.0)
            .unwrap()
            .with_term(Term::ramp("LO", 1.0, 0.0).unwrap());
        let y = OutputVariable::new("Y", -1.0, 1.0)
            .unwrap()
            .with_term(Term::triangle("Z", -0.5, 0.0, 0.5).unwrap());
        let w = OutputVariable::new("W", -1.0, 1.0)
            .unwrap()
            .with_term(Term::triangle("Z", -0.5, 0.0, 0.5).unwrap());
        (vec![a, b], vec![y, w])
    }

    fn prop(variable: usize, term: usize) -> Expression {
        Expression::Proposition(Proposition {
            variable,
            term,
            negated: false,
        })
    }

    #[test]
    fn tokenizes_parentheses() {
        assert_eq!(
            tokenize("if (A is LO)or B is LO"),
            vec!["if", "(", "A", "is", "LO", ")", "or", "B", "is", "LO"]
        );
    }

    #[test]
    fn simple_rule() {
        let (i, o) = vars();
        let r = parse_rule("if A is HI then Y is Z", &i, &o).unwrap();
        assert_eq!(r.antecedent, prop(0, 1));
        assert_eq!(r.consequents.len(), 1);
        assert_eq!(r.weight, 1.0);
        assert_eq!(r.text, "if A is HI then Y is Z");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let (i, o) = vars();
        let r = parse_rule("if A is LO or A is HI and B is LO then Y is Z", &i, &o).unwrap();
        let expected = Expression::Or(
            Box::new(prop(0, 0)),
            Box::new(Expression::And(Box::new(prop(0, 1)), Box::new(prop(1, 0)))),
        );
        assert_eq!(r.antecedent, expected);

        let r = parse_rule("if (A is LO or A is HI) and B is LO then Y is Z", &i, &o).unwrap();
        let expected = Expression::And(
            Box::new(Expression::Or(Box::new(prop(0, 0)), Box::new(prop(0, 1)))),
            Box::new(prop(1, 0)),
        );
        assert_eq!(r.antecedent, expected);
    }

    #[test]
    fn negation_multiple_consequents_and_weight() {
        let (i, o) = vars();
        let r = parse_rule("if A is not LO then Y is Z and W is Z with 0.5", &i, &o).unwrap();
        match r.antecedent {
            Expression::Proposition(p) => assert!(p.negated),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(r.consequents.len(), 2);
        assert_eq!(r.consequents[1].variable, 1);
        assert_eq!(r.weight, 0.5);
    }

    #[test]
    fn rejects_malformed_rules() {
        let (i, o) = vars();
        for text in [
            "",
            "A is LO then Y is Z",
            "if A is LO",
            "if A is LO then",
            "if C is LO then Y is Z",
            "if A is MID then Y is Z",
            "if A is LO then A is LO",
            "if Y is Z then Y is Z",
            "if A is LO then Y is not Z",
            "if (A is LO then Y is Z",
            "if A is LO then Y is Z with 2",
            "if A is LO then Y is Z with heavy",
            "if A is LO then Y is Z extra",
        ] {
            match parse_rule(text, &i, &o) {
                Err(FuzzyError::Parse { rule, .. }) => assert_eq!(rule, text),
                other => panic!("{text:?} gave {other:?}"),
            }
        }
    }
}
