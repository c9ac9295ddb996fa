//! Control-cycle bookkeeping.

/// What one `control()` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Decisions were computed and handed to the VMs.
    ///
    /// A VM may still refuse its update. That refusal is logged and does
    /// not undo updates already accepted by other VMs in the same cycle, so
    /// after `Applied` some VMs can be resized while others are not.
    Applied,
    /// Some required observation was missing; nothing was computed.
    Skipped { reason: String },
    /// Inference failed; every decision of the cycle was discarded.
    Failed { reason: String },
}

/// Per-manager cycle counters.
///
/// Every `control()` call bumps `ctl_count` and exactly one of the other
/// three, so `ctl_count == ctl_skip_count + ctl_fail_count + applied_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlCounters {
    pub ctl_count: u64,
    pub ctl_skip_count: u64,
    pub ctl_fail_count: u64,
    pub applied_count: u64,
}

impl ControlCounters {
    pub fn record(&mut self, outcome: &ControlOutcome) {
        self.ctl_count += 1;
        match outcome {
            ControlOutcome::Applied => self.applied_count += 1,
            ControlOutcome::Skipped { .. } => self.ctl_skip_count += 1,
            ControlOutcome::Failed { .. } => self.ctl_fail_count += 1,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.ctl_count == self.ctl_skip_count + self.ctl_fail_count + self.applied_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
