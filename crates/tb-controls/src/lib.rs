//! Application managers for virtualized testbeds.
//!
//! An application manager watches a multi-VM application through sensors,
//! estimates its performance against per-metric targets and, for the FC2Q
//! controller, resizes each VM's CPU and memory shares with a fuzzy rule
//! base. An external scheduler drives the manager by calling
//! [`ApplicationManager::sample`] every sampling interval and
//! [`ApplicationManager::control`] every control interval.
//!
//! # Architecture
//!
//! - [`Sensor`], [`VirtualMachine`], [`Application`]: collaborator traits
//!   implemented by hypervisor/benchmark drivers (or the in-memory
//!   [`memory`] testbed)
//! - [`ApplicationManager`]: lifecycle (`reset`/`sample`/`control`),
//!   observers and shared configuration in [`ManagerCore`]
//! - [`ControlPolicy`]: the per-controller steps, implemented by
//!   [`Fc2qController`] and [`MonitorController`]
//! - [`actuator`]: share clamping and application
//! - [`DataLog`]: one CSV row per control call
//! - [`ManagerConfig`]: YAML/JSON configuration
//!
//! # Failure model
//!
//! Only setup is fatal. Missing observations skip a control step and
//! inference failures abandon it; both are counted in
//! [`ControlCounters`] and the loop carries on.

pub mod actuator;
pub mod app;
pub mod config;
pub mod counters;
pub mod datalog;
pub mod driver;
pub mod error;
pub mod fc2q;
pub mod intervals;
pub mod manager;
pub mod memory;
pub mod monitor;
pub mod sensor;

pub use actuator::{next_share, resource_share, set_resource_share};
pub use app::{Application, ApplicationHandle, VirtualMachine, VmHandle};
pub use config::{EstimatorConfig, ManagerConfig, TargetConfig, load_json, load_yaml, save_yaml};
pub use counters::{ControlCounters, ControlOutcome};
pub use datalog::{DataLog, LogRow};
pub use driver::SimulatedDriver;
pub use error::{ControlError, ControlResult};
pub use fc2q::Fc2qController;
pub use intervals::{ControlIntervals, IntervalClock};
pub use manager::{ApplicationManager, ControlPolicy, ManagerCore, ManagerEvent};
pub use memory::{MemoryApplication, MemorySensor, MemoryVirtualMachine};
pub use monitor::MonitorController;
pub use sensor::{Observation, Sensor, SensorHandle, read_sensor};
