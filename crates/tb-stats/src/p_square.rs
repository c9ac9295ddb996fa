//! P² streaming quantile estimator.
//!
//! Jain & Chlamtac's algorithm tracks five markers whose heights approximate
//! the minimum, the p/2, p and (1+p)/2 quantiles and the maximum. Each new
//! sample shifts marker positions; a marker that drifts one or more slots
//! from its desired position has its height corrected with a piecewise
//! parabolic prediction, falling back to linear interpolation when the
//! parabola would break marker ordering.

use tb_core::{Real, TbError, TbResult};

use crate::estimator::DataEstimator;
use crate::quantile::sample_quantile;

const MARKERS: usize = 5;

/// Fixed-memory estimator of the `probability`-quantile.
#[derive(Debug, Clone, PartialEq)]
pub struct P2QuantileEstimator {
    probability: Real,
    count: u64,
    /// Marker heights (q_i).
    heights: [Real; MARKERS],
    /// Actual marker positions (n_i), 1-based.
    positions: [Real; MARKERS],
    /// Desired marker positions (n'_i).
    desired: [Real; MARKERS],
    /// Per-sample increments of the desired positions (dn'_i).
    increments: [Real; MARKERS],
}

impl P2QuantileEstimator {
    /// Create an estimator for the given quantile probability.
    ///
    /// # Errors
    ///
    /// Returns an error unless `0 < probability < 1`.
    pub fn new(probability: Real) -> TbResult<Self> {
        if !(probability > 0.0 && probability < 1.0) {
            return Err(TbError::InvalidArg {
                what: "quantile probability must be in (0, 1)",
            });
        }
        let p = probability;
        Ok(Self {
            probability,
            count: 0,
            heights: [0.0; MARKERS],
            positions: [1.0, 2.0, 3.0, 4.0, 5.0],
            desired: [1.0, 1.0 + 2.0 * p, 1.0 + 4.0 * p, 3.0 + 2.0 * p, 5.0],
            increments: [0.0, p / 2.0, p, (1.0 + p) / 2.0, 1.0],
        })
    }

    pub fn probability(&self) -> Real {
        self.probability
    }

    fn adjust_marker(&mut self, i: usize) {
        let h = &mut self.heights;
        let n = &self.positions;

        let d = self.desired[i] - n[i];
        let move_up = d >= 1.0 && n[i + 1] - n[i] > 1.0;
        let move_down = d <= -1.0 && n[i - 1] - n[i] < -1.0;
        if !(move_up || move_down) {
            return;
        }

        let sign: Real = if d > 0.0 { 1.0 } else { -1.0 };
        let slope_up = (h[i + 1] - h[i]) / (n[i + 1] - n[i]);
        let slope_down = (h[i - 1] - h[i]) / (n[i - 1] - n[i]);
        let parabolic = h[i]
            + sign / (n[i + 1] - n[i - 1])
                * ((n[i] - n[i - 1] + sign) * slope_up + (n[i + 1] - n[i] - sign) * slope_down);

        if h[i - 1] < parabolic && parabolic < h[i + 1] {
            h[i] = parabolic;
        } else {
            let j = if sign > 0.0 { i + 1 } else { i - 1 };
            h[i] += sign * (h[j] - h[i]) / (n[j] - n[i]);
        }
        self.positions[i] += sign;
    }
}

impl DataEstimator for P2QuantileEstimator {
    fn collect(&mut self, value: Real) {
        self.count += 1;

        // The first five samples become the initial marker heights.
        if self.count <= MARKERS as u64 {
            self.heights[(self.count - 1) as usize] = value;
            if self.count == MARKERS as u64 {
                self.heights.sort_by(|a, b| a.total_cmp(b));
            }
            return;
        }

        // Locate the cell containing the sample, stretching the extremes.
        let cell = if value < self.heights[0] {
            self.heights[0] = value;
            1
        } else if value >= self.heights[MARKERS - 1] {
            self.heights[MARKERS - 1] = value;
            MARKERS - 1
        } else {
            (1..MARKERS)
                .find(|&i| value < self.heights[i])
                .unwrap_or(MARKERS - 1)
        };

        for pos in &mut self.positions[cell..] {
            *pos += 1.0;
        }
        for (desired, inc) in self.desired.iter_mut().zip(self.increments) {
            *desired += inc;
        }

        for i in 1..MARKERS - 1 {
            self.adjust_marker(i);
        }
    }

    fn estimate(&self) -> Option<Real> {
        match self.count {
            0 => None,
            n if n < MARKERS as u64 => sample_quantile(&self.heights[..n as usize], self.probability),
            _ => Some(self.heights[2]),
        }
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn reset(&mut self) {
        // probability was validated at construction
        let p = self.probability;
        self.count = 0;
        self.heights = [0.0; MARKERS];
        self.positions = [1.0, 2.0, 3.0, 4.0, 5.0];
        self.desired = [1.0, 1.0 + 2.0 * p, 1.0 + 4.0 * p, 3.0 + 2.0 * p, 5.0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_probability() {
        assert!(P2QuantileEstimator::new(0.0).is_err());
        assert!(P2QuantileEstimator::new(1.0).is_err());
        assert!(P2QuantileEstimator::new(Real::NAN).is_err());
        assert!(P2QuantileEstimator::new(0.95).is_ok());
    }

    #[test]
    fn few_samples_use_exact_quantile() {
        let mut est = P2QuantileEstimator::new(0.5).unwrap();
        assert!(est.estimate().is_none());

        est.collect_many(&[3.0, 1.0, 2.0]);
        assert_eq!(est.count(), 3);
        assert_eq!(est.estimate(), Some(2.0));
    }

    #[test]
    fn five_samples_give_middle_marker() {
        let mut est = P2QuantileEstimator::new(0.5).unwrap();
        est.collect_many(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(est.estimate(), Some(3.0));
    }

    #[test]
    fn jain_chlamtac_worked_example() {
        // Data set from the original P² paper; the 0.5-quantile marker
        // after 20 observations is 4.44 (rounded to two decimals).
        let data = [
            0.02, 0.15, 0.74, 3.39, 0.83, 22.37, 10.15, 15.43, 38.62, 15.92, 34.6, 10.28, 1.47,
            0.4, 0.05, 11.39, 0.27, 0.42, 0.09, 11.37,
        ];
        let mut est = P2QuantileEstimator::new(0.5).unwrap();
        est.collect_many(&data);
        let q = est.estimate().unwrap();
        assert!((q - 4.44).abs() < 0.01, "got {q}");
    }

    #[test]
    fn reset_restores_initial_markers() {
        let mut est = P2QuantileEstimator::new(0.9).unwrap();
        est.collect_many(&(0..100).map(Real::from).collect::<Vec<_>>());
        let fresh = P2QuantileEstimator::new(0.9).unwrap();
        est.reset();
        assert_eq!(est, fresh);
    }

    #[test]
    fn markers_stay_ordered() {
        let mut est = P2QuantileEstimator::new(0.3).unwrap();
        for i in 0..500 {
            // deterministic zig-zag stream
            let v = ((i * 37) % 101) as Real;
            est.collect(v);
        }
        for w in est.heights.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }
}
