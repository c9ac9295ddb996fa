//! Resource share actuation.
//!
//! Controllers compute a signed change per VM resource; the new share is
//! the old one plus the change, clamped to `[0, 1]`. Changes that leave the
//! share (numerically) where it is are not sent to the VM.

use tb_core::{Real, Tolerances, VmPerformanceCategory, clamp_unit, nearly_equal};

use crate::app::VirtualMachine;
use crate::error::ControlResult;

/// Share to actuate after applying `delta` to `old`.
///
/// Returns `None` when the result is not finite or equals `old` within
/// floating-point tolerance.
pub fn next_share(old: Real, delta: Real) -> Option<Real> {
    let new = clamp_unit(old + delta);
    if !new.is_finite() || nearly_equal(old, new, Tolerances::default()) {
        None
    } else {
        Some(new)
    }
}

/// Current share of the resource measured by `category`.
pub fn resource_share(vm: &dyn VirtualMachine, category: VmPerformanceCategory) -> Real {
    match category {
        VmPerformanceCategory::CpuUtil => vm.cpu_share(),
        VmPerformanceCategory::MemoryUtil => vm.memory_share(),
    }
}

pub fn set_resource_share(
    vm: &dyn VirtualMachine,
    category: VmPerformanceCategory,
    share: Real,
) -> ControlResult<()> {
    match category {
        VmPerformanceCategory::CpuUtil => vm.set_cpu_share(share),
        VmPerformanceCategory::MemoryUtil => vm.set_memory_share(share),
    }
}
