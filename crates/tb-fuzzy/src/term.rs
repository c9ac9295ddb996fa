//! Linguistic terms and their membership functions.

use serde::{Deserialize, Serialize};
use tb_core::Real;

use crate::error::{FuzzyError, FuzzyResult};

/// Membership function shape.
///
/// NaN inputs propagate as NaN so that a missing value is never mistaken
/// for a zero degree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Linear edge between `start` (degree 0) and `end` (degree 1).
    ///
    /// Ascending when `start < end`, descending otherwise; saturates at 1
    /// beyond `end` and at 0 beyond `start`.
    Ramp { start: Real, end: Real },
    /// Triangle with feet `a`, `c` and apex `b`.
    Triangle { a: Real, b: Real, c: Real },
}

impl Shape {
    /// Degree of membership of `x`, in `[0, 1]` (or NaN for NaN input).
    pub fn membership(&self, x: Real) -> Real {
        if x.is_nan() {
            return Real::NAN;
        }
        match *self {
            Shape::Ramp { start, end } => {
                if start < end {
                    if x <= start {
                        0.0
                    } else if x >= end {
                        1.0
                    } else {
                        (x - start) / (end - start)
                    }
                } else if x >= start {
                    0.0
                } else if x <= end {
                    1.0
                } else {
                    (start - x) / (start - end)
                }
            }
            Shape::Triangle { a, b, c } => {
                if x < a || x > c {
                    0.0
                } else if x == b {
                    1.0
                } else if x < b {
                    (x - a) / (b - a)
                } else {
                    (c - x) / (c - b)
                }
            }
        }
    }

    fn validate(&self) -> FuzzyResult<()> {
        match *self {
            Shape::Ramp { start, end } => {
                if !(start.is_finite() && end.is_finite()) {
                    return Err(FuzzyError::InvalidArg {
                        what: "ramp breakpoints must be finite",
                    });
                }
                if start == end {
                    return Err(FuzzyError::InvalidArg {
                        what: "ramp start and end must differ",
                    });
                }
            }
            Shape::Triangle { a, b, c } => {
                if !(a.is_finite() && b.is_finite() && c.is_finite()) {
                    return Err(FuzzyError::InvalidArg {
                        what: "triangle vertices must be finite",
                    });
                }
                if !(a <= b && b <= c && a < c) {
                    return Err(FuzzyError::InvalidArg {
                        what: "triangle vertices must satisfy a <= b <= c and a < c",
                    });
                }
            }
        }
        Ok(())
    }
}

/// A named fuzzy set over a variable's universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    name: String,
    shape: Shape,
}

impl Term {
    /// # Errors
    ///
    /// Returns an error if the name is not a valid identifier or the shape
    /// is degenerate.
    pub fn new(name: impl Into<String>, shape: Shape) -> FuzzyResult<Self> {
        let name = name.into();
        check_identifier(&name)?;
        shape.validate()?;
        Ok(Self { name, shape })
    }

    pub fn ramp(name: impl Into<String>, start: Real, end: Real) -> FuzzyResult<Self> {
        Self::new(name, Shape::Ramp { start, end })
    }

    pub fn triangle(name: impl Into<String>, a: Real, b: Real, c: Real) -> FuzzyResult<Self> {
        Self::new(name, Shape::Triangle { a, b, c })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn membership(&self, x: Real) -> Real {
        self.shape.membership(x)
    }
}

/// Reserved words of the rule language.
pub(crate) const KEYWORDS: [&str; 8] = ["if", "then", "is", "and", "or", "not", "with", "none"];

/// Names must be usable as single tokens in rule text.
pub(crate) fn check_identifier(name: &str) -> FuzzyResult<()> {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err(FuzzyError::InvalidArg {
            what: "names must start with a letter and contain only letters, digits, '_' or '.'",
        });
    }
    if KEYWORDS.contains(&name) {
        return Err(FuzzyError::InvalidArg {
            what: "names must not be rule keywords",
        });
    }
    Ok(())
}
