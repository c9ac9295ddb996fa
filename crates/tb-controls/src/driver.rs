//! Simulated-time driver.
//!
//! Real deployments call `sample`/`control` from a timer thread. For
//! simulations and tests, [`SimulatedDriver`] walks a virtual clock instead,
//! invoking the manager whenever a sampling or control period elapses.

use tb_core::{Time, s};

use crate::intervals::{ControlIntervals, IntervalClock};
use crate::manager::{ApplicationManager, ControlPolicy};

#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    now: Time,
    sampling: IntervalClock,
    control: IntervalClock,
}

impl SimulatedDriver {
    /// Driver starting at time zero with the manager's intervals.
    pub fn new(intervals: &ControlIntervals) -> Self {
        let start = s(0.0);
        Self {
            now: start,
            sampling: IntervalClock::new(intervals.sampling_time(), start),
            control: IntervalClock::new(intervals.control_time(), start),
        }
    }

    pub fn now(&self) -> Time {
        self.now
    }

    /// Advance to `until`, sampling and controlling as periods elapse.
    ///
    /// `before_sample` runs ahead of every `sample` call with the current
    /// time, so the caller can feed the simulated sensors. When both
    /// periods end together, sampling comes first.
    pub fn run_until<P: ControlPolicy>(
        &mut self,
        manager: &mut ApplicationManager<P>,
        until: Time,
        mut before_sample: impl FnMut(Time),
    ) {
        loop {
            let next = if self.sampling.next_due() <= self.control.next_due() {
                self.sampling.next_due()
            } else {
                self.control.next_due()
            };
            if next > until {
                break;
            }
            self.now = next;
            if self.sampling.is_due(self.now) {
                before_sample(self.now);
                manager.sample();
                self.sampling.advance();
            }
            if self.control.is_due(self.now) {
                manager.control();
                self.control.advance();
            }
        }
        self.now = until;
    }
}
