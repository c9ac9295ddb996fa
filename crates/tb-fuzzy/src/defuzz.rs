//! Centroid defuzzification.

use serde::{Deserialize, Serialize};
use tb_core::Real;

use crate::error::{FuzzyError, FuzzyResult};

/// Center of mass of a membership function, integrated by the midpoint rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Centroid {
    resolution: usize,
}

impl Default for Centroid {
    fn default() -> Self {
        Self {
            resolution: Self::DEFAULT_RESOLUTION,
        }
    }
}

impl Centroid {
    pub const DEFAULT_RESOLUTION: usize = 200;

    /// # Errors
    ///
    /// Returns an error if `resolution` is zero.
    pub fn new(resolution: usize) -> FuzzyResult<Self> {
        if resolution == 0 {
            return Err(FuzzyError::InvalidArg {
                what: "centroid resolution must be positive",
            });
        }
        Ok(Self { resolution })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Centroid of `membership` over `[minimum, maximum]`.
    ///
    /// Returns NaN when the set has zero area.
    pub fn defuzzify(&self, membership: impl Fn(Real) -> Real, minimum: Real, maximum: Real) -> Real {
        let dx = (maximum - minimum) / self.resolution as Real;
        let mut area = 0.0;
        let mut moment = 0.0;
        for i in 0..self.resolution {
            let x = minimum + (i as Real + 0.5) * dx;
            let y = membership(x);
            moment += x * y;
            area += y;
        }
        if area == 0.0 {
            Real::NAN
        } else {
            moment / area
        }
    }
}
