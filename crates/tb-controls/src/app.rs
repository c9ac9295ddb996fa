//! Application and virtual machine collaborators.

use std::fmt;
use std::sync::Arc;

use tb_core::{AppPerformanceCategory, Real, VmId, VmPerformanceCategory};

use crate::error::ControlResult;
use crate::sensor::SensorHandle;

/// A virtual machine whose resource shares the manager may resize.
///
/// Shares are fractions of the VM's maximum allocation, in `[0, 1]`.
pub trait VirtualMachine: fmt::Debug + Send + Sync {
    fn id(&self) -> &VmId;

    /// Maximum CPU capacity, e.g. the number of virtual CPUs.
    fn cpu_cap(&self) -> Real;

    fn cpu_share(&self) -> Real;

    fn set_cpu_share(&self, share: Real) -> ControlResult<()>;

    fn memory_share(&self) -> Real;

    fn set_memory_share(&self, share: Real) -> ControlResult<()>;

    /// Utilization sensor for `category`, if the VM provides one.
    fn sensor(&self, category: VmPerformanceCategory) -> Option<SensorHandle>;
}

pub type VmHandle = Arc<dyn VirtualMachine>;

/// A multi-tier application spread over several VMs.
pub trait Application: fmt::Debug + Send + Sync {
    /// VMs in a stable order; log columns follow it.
    fn vms(&self) -> Vec<VmHandle>;

    fn num_vms(&self) -> usize {
        self.vms().len()
    }

    /// Sensor for an application-level metric, if available.
    fn sensor(&self, category: AppPerformanceCategory) -> Option<SensorHandle>;
}

pub type ApplicationHandle = Arc<dyn Application>;
