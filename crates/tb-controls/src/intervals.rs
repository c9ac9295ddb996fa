//! Sampling and control intervals.
//!
//! The manager never schedules itself; these types only carry the
//! configured periods and help a driver decide when the next call is due.

use tb_core::{Real, Time, as_ms, ensure_positive, ms};

use crate::error::ControlResult;

/// Sampling and control periods, both strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlIntervals {
    sampling: Time,
    control: Time,
}

impl Default for ControlIntervals {
    /// One millisecond each, matching an unconfigured manager.
    fn default() -> Self {
        Self {
            sampling: ms(1.0),
            control: ms(1.0),
        }
    }
}

impl ControlIntervals {
    /// # Errors
    ///
    /// Returns an error if either period is not a finite positive number
    /// of milliseconds.
    pub fn new(sampling_ms: Real, control_ms: Real) -> ControlResult<Self> {
        let mut intervals = Self::default();
        intervals.set_sampling_time_ms(sampling_ms)?;
        intervals.set_control_time_ms(control_ms)?;
        Ok(intervals)
    }

    pub fn set_sampling_time_ms(&mut self, value: Real) -> ControlResult<()> {
        self.sampling = ms(ensure_positive(value, "sampling time must be positive")?);
        Ok(())
    }

    pub fn set_control_time_ms(&mut self, value: Real) -> ControlResult<()> {
        self.control = ms(ensure_positive(value, "control time must be positive")?);
        Ok(())
    }

    pub fn sampling_time(&self) -> Time {
        self.sampling
    }

    pub fn control_time(&self) -> Time {
        self.control
    }

    pub fn sampling_time_ms(&self) -> Real {
        as_ms(self.sampling)
    }

    pub fn control_time_ms(&self) -> Real {
        as_ms(self.control)
    }
}

/// Tracks when a periodic call is next due.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalClock {
    period: Time,
    next: Time,
}

impl IntervalClock {
    /// First firing one period after `start`.
    pub fn new(period: Time, start: Time) -> Self {
        Self {
            period,
            next: start + period,
        }
    }

    pub fn next_due(&self) -> Time {
        self.next
    }

    pub fn is_due(&self, now: Time) -> bool {
        now >= self.next
    }

    /// Move to the following period.
    pub fn advance(&mut self) {
        self.next += self.period;
    }

    pub fn reset(&mut self, now: Time) {
        self.next = now + self.period;
    }
}
