//! Exponential smoothers and forecasters.
//!
//! A smoother ingests one observation at a time and keeps a level (and for
//! the double variants a trend) that can be projected `horizon` steps ahead.
//! Before the first observation there is nothing to project, so
//! [`DataSmoother::forecast`] returns `None`.

use core::fmt;

use tb_core::{Real, TbError, TbResult};

/// Stateful forecaster over a scalar series.
pub trait DataSmoother: fmt::Debug + Send {
    /// Ingest one sample and return the updated level.
    fn smooth(&mut self, value: Real) -> Real;

    /// Ingest a batch of samples in order; returns the final level, if any.
    fn smooth_many(&mut self, values: &[Real]) -> Option<Real> {
        let mut level = None;
        for &v in values {
            level = Some(self.smooth(v));
        }
        level.or_else(|| self.forecast(0))
    }

    /// Predicted value `horizon` steps ahead, without consuming data.
    fn forecast(&self, horizon: u32) -> Option<Real>;

    /// Return to the unseeded state.
    fn reset(&mut self);
}

fn check_factor(value: Real, what: &'static str) -> TbResult<Real> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(TbError::InvalidArg { what })
    }
}

/// Holds the most recent observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastValueSmoother {
    level: Option<Real>,
}

impl LastValueSmoother {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataSmoother for LastValueSmoother {
    fn smooth(&mut self, value: Real) -> Real {
        self.level = Some(value);
        value
    }

    fn forecast(&self, _horizon: u32) -> Option<Real> {
        self.level
    }

    fn reset(&mut self) {
        self.level = None;
    }
}

/// Brown's single exponential smoothing.
///
/// `S_t = alpha * x_t + (1 - alpha) * S_{t-1}`, seeded with `S_0 = x_0`.
/// There is no trend term, so every horizon forecasts the current level.
#[derive(Debug, Clone, PartialEq)]
pub struct BrownSingleExponentialSmoother {
    alpha: Real,
    level: Option<Real>,
}

impl BrownSingleExponentialSmoother {
    /// # Errors
    ///
    /// Returns an error unless `0 < alpha <= 1`.
    pub fn new(alpha: Real) -> TbResult<Self> {
        Ok(Self {
            alpha: check_factor(alpha, "smoothing factor must be in (0, 1]")?,
            level: None,
        })
    }

    pub fn alpha(&self) -> Real {
        self.alpha
    }
}

impl DataSmoother for BrownSingleExponentialSmoother {
    fn smooth(&mut self, value: Real) -> Real {
        let level = match self.level {
            None => value,
            Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
        };
        self.level = Some(level);
        level
    }

    fn forecast(&self, _horizon: u32) -> Option<Real> {
        self.level
    }

    fn reset(&mut self) {
        self.level = None;
    }
}

/// Holt-Winters double exponential smoothing (level + trend).
#[derive(Debug, Clone, PartialEq)]
pub struct HoltWintersDoubleExponentialSmoother {
    alpha: Real,
    beta: Real,
    level: Option<Real>,
    trend: Option<Real>,
}

impl HoltWintersDoubleExponentialSmoother {
    /// # Errors
    ///
    /// Returns an error unless both factors are in `(0, 1]`.
    pub fn new(alpha: Real, beta: Real) -> TbResult<Self> {
        Ok(Self {
            alpha: check_factor(alpha, "level factor must be in (0, 1]")?,
            beta: check_factor(beta, "trend factor must be in (0, 1]")?,
            level: None,
            trend: None,
        })
    }

    /// Derive both factors from a single discount `delta`:
    /// `alpha = 1 - (1 - delta)^2`, `beta = delta^2 / alpha`.
    pub fn from_delta(delta: Real) -> TbResult<Self> {
        let delta = check_factor(delta, "discount factor must be in (0, 1]")?;
        let alpha = 1.0 - (1.0 - delta) * (1.0 - delta);
        Self::new(alpha, delta * delta / alpha)
    }

    pub fn alpha(&self) -> Real {
        self.alpha
    }

    pub fn beta(&self) -> Real {
        self.beta
    }
}

impl DataSmoother for HoltWintersDoubleExponentialSmoother {
    fn smooth(&mut self, value: Real) -> Real {
        match (self.level, self.trend) {
            (None, _) => self.level = Some(value),
            (Some(level), None) => self.trend = Some(value - level),
            (Some(level), Some(trend)) => {
                let next = self.alpha * value + (1.0 - self.alpha) * (level + trend);
                self.trend = Some(self.beta * (next - level) + (1.0 - self.beta) * trend);
                self.level = Some(next);
            }
        }
        self.level.unwrap_or(value)
    }

    fn forecast(&self, horizon: u32) -> Option<Real> {
        self.level
            .map(|level| level + Real::from(horizon) * self.trend.unwrap_or(0.0))
    }

    fn reset(&mut self) {
        self.level = None;
        self.trend = None;
    }
}

/// Brown's double (linear) exponential smoothing.
#[derive(Debug, Clone, PartialEq)]
pub struct BrownDoubleExponentialSmoother {
    alpha: Real,
    /// First and second smoothed statistics, seeded together.
    stats: Option<(Real, Real)>,
}

impl BrownDoubleExponentialSmoother {
    /// # Errors
    ///
    /// Returns an error unless `0 < alpha < 1`.
    pub fn new(alpha: Real) -> TbResult<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(TbError::InvalidArg {
                what: "smoothing factor must be in (0, 1)",
            });
        }
        Ok(Self { alpha, stats: None })
    }

    fn intercept_and_slope(&self) -> Option<(Real, Real)> {
        self.stats.map(|(s1, s2)| {
            let a = 2.0 * s1 - s2;
            let b = self.alpha / (1.0 - self.alpha) * (s1 - s2);
            (a, b)
        })
    }
}

impl DataSmoother for BrownDoubleExponentialSmoother {
    fn smooth(&mut self, value: Real) -> Real {
        let (s1, s2) = match self.stats {
            None => (value, value),
            Some((s1, s2)) => {
                let s1 = self.alpha * value + (1.0 - self.alpha) * s1;
                let s2 = self.alpha * s1 + (1.0 - self.alpha) * s2;
                (s1, s2)
            }
        };
        self.stats = Some((s1, s2));
        2.0 * s1 - s2
    }

    fn forecast(&self, horizon: u32) -> Option<Real> {
        self.intercept_and_slope()
            .map(|(a, b)| a + Real::from(horizon) * b)
    }

    fn reset(&mut self) {
        self.stats = None;
    }
}
