//! Triangular norms and conorms used for conjunction, implication and
//! aggregation.

use serde::{Deserialize, Serialize};
use tb_core::Real;

/// T-norm: fuzzy intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TNorm {
    #[default]
    Minimum,
    AlgebraicProduct,
}

impl TNorm {
    pub fn compute(self, a: Real, b: Real) -> Real {
        match self {
            TNorm::Minimum => a.min(b),
            TNorm::AlgebraicProduct => a * b,
        }
    }
}

/// S-norm: fuzzy union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SNorm {
    #[default]
    Maximum,
    /// Probabilistic sum `a + b - ab`.
    AlgebraicSum,
}

impl SNorm {
    pub fn compute(self, a: Real, b: Real) -> Real {
        match self {
            SNorm::Maximum => a.max(b),
            SNorm::AlgebraicSum => a + b - a * b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities() {
        for t in [TNorm::Minimum, TNorm::AlgebraicProduct] {
            assert_eq!(t.compute(0.3, 1.0), 0.3);
            assert_eq!(t.compute(0.3, 0.0), 0.0);
        }
        for s in [SNorm::Maximum, SNorm::AlgebraicSum] {
            assert_eq!(s.compute(0.3, 0.0), 0.3);
            assert_eq!(s.compute(0.3, 1.0), 1.0);
        }
    }

    #[test]
    fn values() {
        assert_eq!(TNorm::AlgebraicProduct.compute(0.5, 0.4), 0.2);
        assert!((SNorm::AlgebraicSum.compute(0.5, 0.4) - 0.7).abs() < 1e-12);
    }
}
