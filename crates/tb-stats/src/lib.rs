//! Statistical estimators and smoothers for noisy sensor streams.
//!
//! Controllers never look at raw observations. Application metrics are
//! reduced to one summary value per control interval by an estimator, and
//! VM utilization series are turned into a forecastable level by a smoother.
//!
//! # Estimators
//!
//! - [`MeanEstimator`]: running arithmetic mean
//! - [`P2QuantileEstimator`]: single-pass P² quantile with five markers
//!
//! # Smoothers
//!
//! - [`LastValueSmoother`]: holds the most recent sample
//! - [`BrownSingleExponentialSmoother`]: level-only exponential smoothing
//! - [`HoltWintersDoubleExponentialSmoother`]: level and trend
//! - [`BrownDoubleExponentialSmoother`]: Brown's linear exponential smoothing
//!
//! All state is O(1) in the length of the stream.

pub mod estimator;
pub mod p_square;
pub mod quantile;
pub mod smoother;

pub use estimator::{DataEstimator, MeanEstimator};
pub use p_square::P2QuantileEstimator;
pub use quantile::sample_quantile;
pub use smoother::{
    BrownDoubleExponentialSmoother, BrownSingleExponentialSmoother, DataSmoother,
    HoltWintersDoubleExponentialSmoother, LastValueSmoother,
};
