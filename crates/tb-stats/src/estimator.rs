//! Summary-statistic estimators.
//!
//! An estimator reduces every observation collected since its last reset to
//! a single scalar. Estimates are only meaningful once something has been
//! collected, so [`DataEstimator::estimate`] returns `None` on an empty
//! accumulator.

use core::fmt;

use tb_core::Real;

/// Stateful accumulator reducing a stream of samples to one summary value.
pub trait DataEstimator: fmt::Debug + Send {
    /// Append one sample.
    fn collect(&mut self, value: Real);

    /// Append a batch of samples, in order.
    fn collect_many(&mut self, values: &[Real]) {
        for &v in values {
            self.collect(v);
        }
    }

    /// Current summary value, or `None` if nothing was collected since reset.
    fn estimate(&self) -> Option<Real>;

    /// Number of samples collected since the last reset.
    fn count(&self) -> u64;

    /// Drop all accumulated state.
    fn reset(&mut self);
}

/// Running arithmetic mean.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeanEstimator {
    count: u64,
    mean: Real,
}

impl MeanEstimator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataEstimator for MeanEstimator {
    fn collect(&mut self, value: Real) {
        self.count += 1;
        // Incremental update keeps the accumulator bounded for long runs.
        self.mean += (value - self.mean) / self.count as Real;
    }

    fn estimate(&self) -> Option<Real> {
        (self.count > 0).then_some(self.mean)
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn mean_matches_batch_average(values in prop::collection::vec(-1.0e3_f64..1.0e3_f64, 1..200)) {
            let mut est = MeanEstimator::new();
            est.collect_many(&values);
            let expected = values.iter().sum::<f64>() / values.len() as f64;
            let got = est.estimate().unwrap();
            prop_assert!((got - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }
}
