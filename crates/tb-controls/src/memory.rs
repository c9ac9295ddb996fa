//! In-process testbed collaborators.
//!
//! These stand in for hypervisor and benchmark drivers: a test (or a
//! simulation loop) pushes readings into [`MemorySensor`]s and inspects the
//! shares the manager wrote to each [`MemoryVirtualMachine`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tb_core::{AppPerformanceCategory, Real, VmId, VmPerformanceCategory};

use crate::app::{Application, VirtualMachine, VmHandle};
use crate::error::{ControlError, ControlResult};
use crate::sensor::{Observation, Sensor, SensorHandle};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sensor fed by hand.
///
/// Pushed readings stay pending until the next `sense`, which makes them
/// available to `observations`.
#[derive(Debug, Default)]
pub struct MemorySensor {
    pending: Mutex<Vec<Observation>>,
    sensed: Mutex<Vec<Observation>>,
    fail_next: AtomicBool,
}

impl MemorySensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reading stamped with the current time.
    pub fn push(&self, label: &str, value: Real) {
        self.push_observation(Observation::now(label, value));
    }

    pub fn push_observation(&self, observation: Observation) {
        lock(&self.pending).push(observation);
    }

    /// Make the next `sense` call fail, as a broken driver would.
    pub fn fail_next_sense(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl Sensor for MemorySensor {
    fn sense(&self) -> ControlResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ControlError::Driver {
                what: "sensor unavailable".to_string(),
            });
        }
        let mut fresh = std::mem::take(&mut *lock(&self.pending));
        lock(&self.sensed).append(&mut fresh);
        Ok(())
    }

    fn has_observations(&self) -> bool {
        !lock(&self.sensed).is_empty()
    }

    fn observations(&self) -> Vec<Observation> {
        std::mem::take(&mut *lock(&self.sensed))
    }
}

#[derive(Debug, Clone, Copy)]
struct Shares {
    cpu: Real,
    memory: Real,
}

fn check_share(share: Real) -> ControlResult<Real> {
    if (0.0..=1.0).contains(&share) {
        Ok(share)
    } else {
        Err(ControlError::InvalidArg {
            what: "share must be in [0, 1]",
        })
    }
}

/// VM with in-memory shares and one [`MemorySensor`] per resource.
#[derive(Debug)]
pub struct MemoryVirtualMachine {
    id: VmId,
    cpu_cap: Real,
    shares: Mutex<Shares>,
    sensors: BTreeMap<VmPerformanceCategory, Arc<MemorySensor>>,
    reject_shares: AtomicBool,
}

impl MemoryVirtualMachine {
    /// VM with full shares.
    pub fn new(id: impl Into<VmId>, cpu_cap: Real) -> Self {
        Self {
            id: id.into(),
            cpu_cap,
            shares: Mutex::new(Shares {
                cpu: 1.0,
                memory: 1.0,
            }),
            sensors: VmPerformanceCategory::ALL
                .into_iter()
                .map(|c| (c, Arc::new(MemorySensor::new())))
                .collect(),
            reject_shares: AtomicBool::new(false),
        }
    }

    /// # Errors
    ///
    /// Returns an error unless both shares are in `[0, 1]`.
    pub fn with_shares(self, cpu: Real, memory: Real) -> ControlResult<Self> {
        let shares = Shares {
            cpu: check_share(cpu)?,
            memory: check_share(memory)?,
        };
        *lock(&self.shares) = shares;
        Ok(self)
    }

    /// Utilization sensor of `category`, for feeding readings.
    pub fn utilization_sensor(&self, category: VmPerformanceCategory) -> Arc<MemorySensor> {
        // every category gets a sensor in `new`
        Arc::clone(&self.sensors[&category])
    }

    /// Make every later share update fail.
    pub fn reject_share_updates(&self, reject: bool) {
        self.reject_shares.store(reject, Ordering::SeqCst);
    }

    fn update(&self, apply: impl FnOnce(&mut Shares)) -> ControlResult<()> {
        if self.reject_shares.load(Ordering::SeqCst) {
            return Err(ControlError::Driver {
                what: format!("VM {} refused the share update", self.id),
            });
        }
        apply(&mut *lock(&self.shares));
        Ok(())
    }
}

impl VirtualMachine for MemoryVirtualMachine {
    fn id(&self) -> &VmId {
        &self.id
    }

    fn cpu_cap(&self) -> Real {
        self.cpu_cap
    }

    fn cpu_share(&self) -> Real {
        lock(&self.shares).cpu
    }

    fn set_cpu_share(&self, share: Real) -> ControlResult<()> {
        let share = check_share(share)?;
        self.update(|s| s.cpu = share)
    }

    fn memory_share(&self) -> Real {
        lock(&self.shares).memory
    }

    fn set_memory_share(&self, share: Real) -> ControlResult<()> {
        let share = check_share(share)?;
        self.update(|s| s.memory = share)
    }

    fn sensor(&self, category: VmPerformanceCategory) -> Option<SensorHandle> {
        self.sensors
            .get(&category)
            .map(|s| Arc::clone(s) as SensorHandle)
    }
}

/// Application made of [`MemoryVirtualMachine`]s, with one output sensor
/// per application metric.
#[derive(Debug)]
pub struct MemoryApplication {
    vms: Vec<Arc<MemoryVirtualMachine>>,
    sensors: BTreeMap<AppPerformanceCategory, Arc<MemorySensor>>,
}

impl MemoryApplication {
    pub fn new(vms: Vec<Arc<MemoryVirtualMachine>>) -> Self {
        Self {
            vms,
            sensors: AppPerformanceCategory::ALL
                .into_iter()
                .map(|c| (c, Arc::new(MemorySensor::new())))
                .collect(),
        }
    }

    pub fn vm(&self, index: usize) -> Option<&Arc<MemoryVirtualMachine>> {
        self.vms.get(index)
    }

    /// Sensor of an application metric, for feeding readings.
    pub fn output_sensor(&self, category: AppPerformanceCategory) -> Arc<MemorySensor> {
        Arc::clone(&self.sensors[&category])
    }
}

impl Application for MemoryApplication {
    fn vms(&self) -> Vec<VmHandle> {
        self.vms
            .iter()
            .map(|vm| Arc::clone(vm) as VmHandle)
            .collect()
    }

    fn num_vms(&self) -> usize {
        self.vms.len()
    }

    fn sensor(&self, category: AppPerformanceCategory) -> Option<SensorHandle> {
        self.sensors
            .get(&category)
            .map(|s| Arc::clone(s) as SensorHandle)
    }
}
