//! FC2Q fuzzy MIMO capacity controller.
//!
//! Every control interval, each VM's CPU and memory residuals (share minus
//! smoothed utilization) and the application's relative error feed a
//! Mamdani rule base that recommends a change of each share. All VMs are
//! decided first; shares are only touched once every decision succeeded.
//!
//! | residual \ error | LOW | FINE | HIGH |
//! |------------------|-----|------|------|
//! | NEG              | BUP | UP   | UP   |
//! | OK               | UP  | STY  | DWN  |
//! | POS              | STY | DWN  | BDW  |

use std::collections::BTreeMap;

use tb_core::{AppPerformanceCategory, Real, VmPerformanceCategory};
use tb_fuzzy::{Engine, InputVariable, OutputVariable, RuleBlock, SNorm, TNorm, Term};
use tb_stats::{BrownSingleExponentialSmoother, DataSmoother};
use tracing::{debug, warn};

use crate::actuator::{next_share, resource_share, set_resource_share};
use crate::app::VmHandle;
use crate::config::ManagerConfig;
use crate::counters::{ControlCounters, ControlOutcome};
use crate::datalog::{DataLog, LogRow};
use crate::error::{ControlError, ControlResult};
use crate::manager::{ControlPolicy, ManagerCore, TargetReading};
use crate::sensor::{SensorHandle, read_sensor};

const ERROR_VAR: &str = "E";

const RESIDUAL_TERMS: [&str; 3] = ["NEG", "OK", "POS"];
const ERROR_TERMS: [&str; 3] = ["LOW", "FINE", "HIGH"];
const RULE_TABLE: [[&str; 3]; 3] = [
    ["BUP", "UP", "UP"],
    ["UP", "STY", "DWN"],
    ["STY", "DWN", "BDW"],
];

fn residual_var(category: VmPerformanceCategory) -> &'static str {
    match category {
        VmPerformanceCategory::CpuUtil => "Cres",
        VmPerformanceCategory::MemoryUtil => "Mres",
    }
}

fn delta_var(category: VmPerformanceCategory) -> &'static str {
    match category {
        VmPerformanceCategory::CpuUtil => "DeltaC",
        VmPerformanceCategory::MemoryUtil => "DeltaM",
    }
}

fn residual_input(name: &str) -> ControlResult<InputVariable> {
    Ok(InputVariable::new(name, 0.0, 1.0)?
        .with_term(Term::ramp("NEG", 0.30, 0.00)?)
        .with_term(Term::triangle("OK", 0.10, 0.25, 0.40)?)
        .with_term(Term::ramp("POS", 0.30, 1.00)?))
}

fn delta_output(name: &str) -> ControlResult<OutputVariable> {
    Ok(OutputVariable::new(name, -1.0, 1.0)?
        .with_aggregation(SNorm::AlgebraicSum)
        .with_default_value(Real::NAN)
        .with_term(Term::triangle("BDW", -1.00, -0.55, -0.10)?)
        .with_term(Term::triangle("DWN", -0.20, -0.125, -0.05)?)
        .with_term(Term::triangle("STY", -0.10, 0.00, 0.10)?)
        .with_term(Term::triangle("UP", 0.05, 0.125, 0.20)?)
        .with_term(Term::triangle("BUP", 0.10, 0.55, 1.00)?))
}

/// The FC2Q rule base: one residual input and one delta output per
/// resource, sharing the error input.
fn build_engine() -> ControlResult<Engine> {
    let mut engine = Engine::new("fc2q");
    for category in VmPerformanceCategory::ALL {
        engine.add_input_variable(residual_input(residual_var(category))?)?;
    }
    engine.add_input_variable(
        InputVariable::new(ERROR_VAR, -1.0, 1.0)?
            .with_term(Term::ramp("LOW", 0.20, -0.40)?)
            .with_term(Term::triangle("FINE", 0.10, 0.20, 0.30)?)
            .with_term(Term::ramp("HIGH", 0.30, 1.00)?),
    )?;
    for category in VmPerformanceCategory::ALL {
        engine.add_output_variable(delta_output(delta_var(category))?)?;
    }

    let mut block = RuleBlock::new("capacity")
        .with_conjunction(TNorm::Minimum)
        .with_disjunction(SNorm::Maximum)
        .with_implication(TNorm::AlgebraicProduct);
    for category in VmPerformanceCategory::ALL {
        for (residual, row) in RESIDUAL_TERMS.iter().zip(RULE_TABLE) {
            for (error, delta) in ERROR_TERMS.iter().zip(row) {
                let text = format!(
                    "if {} is {residual} and {ERROR_VAR} is {error} then {} is {delta}",
                    residual_var(category),
                    delta_var(category),
                );
                block.add_rule(engine.parse_rule(&text)?);
            }
        }
    }
    engine.add_rule_block(block)?;
    Ok(engine)
}

/// Utilization feed of one VM resource.
#[derive(Debug)]
struct ResourceChannel {
    category: VmPerformanceCategory,
    sensor: SensorHandle,
    smoother: BrownSingleExponentialSmoother,
    /// Observations received during the current control interval.
    observed: u64,
}

#[derive(Debug)]
struct ManagedVm {
    vm: VmHandle,
    channels: Vec<ResourceChannel>,
}

/// Fuzzy controller for the CPU and memory shares of every VM of an
/// application.
#[derive(Debug)]
pub struct Fc2qController {
    smoothing_factor: Real,
    engine: Engine,
    counters: ControlCounters,
    outputs: BTreeMap<AppPerformanceCategory, SensorHandle>,
    vms: Vec<ManagedVm>,
    log: Option<DataLog>,
}

impl Fc2qController {
    pub const DEFAULT_SMOOTHING_FACTOR: Real = 0.9;

    pub fn new() -> ControlResult<Self> {
        Self::with_smoothing_factor(Self::DEFAULT_SMOOTHING_FACTOR)
    }

    /// # Errors
    ///
    /// Returns an error unless `0 < beta <= 1`.
    pub fn with_smoothing_factor(beta: Real) -> ControlResult<Self> {
        BrownSingleExponentialSmoother::new(beta)?;
        Ok(Self {
            smoothing_factor: beta,
            engine: build_engine()?,
            counters: ControlCounters::default(),
            outputs: BTreeMap::new(),
            vms: Vec::new(),
            log: None,
        })
    }

    pub fn smoothing_factor(&self) -> Real {
        self.smoothing_factor
    }

    /// Takes effect at the next reset.
    pub fn set_smoothing_factor(&mut self, beta: Real) -> ControlResult<()> {
        BrownSingleExponentialSmoother::new(beta)?;
        self.smoothing_factor = beta;
        Ok(())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn log_header(&self, core: &ManagerCore) -> Vec<String> {
        let mut columns = vec!["ts".to_string()];
        for managed in &self.vms {
            let id = managed.vm.id();
            columns.push(format!("Cap_{{{id}}}"));
            columns.push(format!("Share_{{{id}}}"));
        }
        for category in core.target_metrics() {
            columns.push(format!("r_{{{category}}}"));
            columns.push(format!("y_{{{category}}}"));
            columns.push(format!("E_{{{category}}}"));
        }
        for managed in &self.vms {
            columns.push(format!("Cres_{{{}}}", managed.vm.id()));
        }
        columns.extend(
            ["# Controls", "# Skip Controls", "# Fail Controls"].map(String::from),
        );
        columns
    }

    /// First VM resource without observations this interval.
    fn missing_input(&self) -> Option<String> {
        self.vms.iter().find_map(|managed| {
            managed
                .channels
                .iter()
                .find(|ch| ch.observed == 0)
                .map(|ch| format!("no {} observation for VM {}", ch.category, managed.vm.id()))
        })
    }

    /// Residual of every VM resource, in channel order. NaN if the smoother
    /// has never seen data.
    fn residuals(&self) -> Vec<Vec<Real>> {
        self.vms
            .iter()
            .map(|managed| {
                managed
                    .channels
                    .iter()
                    .map(|ch| {
                        let share = resource_share(managed.vm.as_ref(), ch.category);
                        share - ch.smoother.forecast(0).unwrap_or(Real::NAN)
                    })
                    .collect()
            })
            .collect()
    }

    /// Run the rule base for every VM. Any failure discards the whole cycle.
    fn infer(&mut self, residuals: &[Vec<Real>], error: Real) -> ControlResult<Vec<Vec<Real>>> {
        let mut deltas = Vec::with_capacity(self.vms.len());
        for (managed, vm_residuals) in self.vms.iter().zip(residuals) {
            self.engine.restart();
            for (ch, &residual) in managed.channels.iter().zip(vm_residuals) {
                self.engine
                    .set_input_value(residual_var(ch.category), residual)?;
            }
            self.engine.set_input_value(ERROR_VAR, error)?;
            self.engine.process()?;

            let mut vm_deltas = Vec::with_capacity(managed.channels.len());
            for (ch, &residual) in managed.channels.iter().zip(vm_residuals) {
                let variable = delta_var(ch.category);
                let delta = self.engine.output_value(variable)?;
                if !delta.is_finite() {
                    return Err(ControlError::NonFiniteOutput {
                        vm: managed.vm.id().to_string(),
                        variable,
                        value: delta,
                    });
                }
                debug!(vm = %managed.vm.id(), resource = %ch.category, residual, error, delta, "fuzzy decision");
                vm_deltas.push(delta);
            }
            deltas.push(vm_deltas);
        }
        Ok(deltas)
    }

    fn actuate(&self, deltas: &[Vec<Real>]) {
        for (managed, vm_deltas) in self.vms.iter().zip(deltas) {
            let vm = managed.vm.as_ref();
            for (ch, &delta) in managed.channels.iter().zip(vm_deltas) {
                let old = resource_share(vm, ch.category);
                let Some(new) = next_share(old, delta) else {
                    continue;
                };
                match set_resource_share(vm, ch.category, new) {
                    Ok(()) => {
                        debug!(vm = %vm.id(), resource = %ch.category, old, new, "share updated");
                    }
                    Err(err) => {
                        warn!(vm = %vm.id(), resource = %ch.category, error = %err, "share update failed");
                    }
                }
            }
        }
    }

    fn decide(&mut self, residuals: &[Vec<Real>], readings: &[TargetReading]) -> ControlOutcome {
        if let Some(reason) = self.missing_input() {
            debug!(%reason, "control skipped");
            return ControlOutcome::Skipped { reason };
        }
        if let Some(r) = readings.iter().find(|r| r.estimate.is_none()) {
            let reason = format!("no {} observation for the application", r.category);
            debug!(%reason, "control skipped");
            return ControlOutcome::Skipped { reason };
        }
        // With several targets the last metric drives the rule base.
        let Some(error) = readings.last().and_then(TargetReading::relative_error) else {
            return ControlOutcome::Skipped {
                reason: "no target metric".to_string(),
            };
        };

        match self.infer(residuals, error) {
            Ok(deltas) => {
                self.actuate(&deltas);
                debug!("control applied");
                ControlOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "control not applied: failed to compute the fuzzy control");
                ControlOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn write_log_row(&mut self, residuals: &[Vec<Real>], readings: &[TargetReading]) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        let mut row = LogRow::stamped(chrono::Utc::now().timestamp());
        for managed in &self.vms {
            row.real(managed.vm.cpu_cap()).real(managed.vm.cpu_share());
        }
        for reading in readings {
            row.real(reading.target)
                .real(reading.estimate.unwrap_or(Real::NAN))
                .real(reading.relative_error().unwrap_or(Real::NAN));
        }
        // Only the first resource's residual is logged.
        for vm_residuals in residuals {
            row.real(vm_residuals.first().copied().unwrap_or(Real::NAN));
        }
        row.count(self.counters.ctl_count)
            .count(self.counters.ctl_skip_count)
            .count(self.counters.ctl_fail_count);
        if let Err(err) = log.write_row(&row) {
            warn!(error = %err, "cannot write data log row");
        }
    }
}

impl ControlPolicy for Fc2qController {
    fn configure(&mut self, config: &ManagerConfig) -> ControlResult<()> {
        self.set_smoothing_factor(config.smoothing_factor)
    }

    fn do_reset(&mut self, core: &ManagerCore) -> ControlResult<()> {
        let app = core.require_app()?;
        if core.target_metrics().is_empty() {
            return Err(ControlError::Configuration {
                what: "no target metric is set".to_string(),
            });
        }
        self.outputs = core.output_sensors()?;

        let mut vms = Vec::new();
        for vm in app.vms() {
            let mut channels = Vec::new();
            for category in VmPerformanceCategory::ALL {
                let sensor = vm.sensor(category).ok_or_else(|| ControlError::Configuration {
                    what: format!("VM {} has no {category} sensor", vm.id()),
                })?;
                channels.push(ResourceChannel {
                    category,
                    sensor,
                    smoother: BrownSingleExponentialSmoother::new(self.smoothing_factor)?,
                    observed: 0,
                });
            }
            vms.push(ManagedVm { vm, channels });
        }
        self.vms = vms;

        self.counters.reset();
        self.engine.restart();

        self.log = None;
        if let Some(path) = core.data_log() {
            let header = self.log_header(core);
            self.log = Some(DataLog::create(path, &header)?);
        }
        debug!(vms = self.vms.len(), targets = core.target_metrics().len(), "fc2q reset");
        Ok(())
    }

    fn do_sample(&mut self, core: &mut ManagerCore) {
        for managed in &mut self.vms {
            for ch in &mut managed.channels {
                for obs in read_sensor(ch.sensor.as_ref(), ch.category.as_str()) {
                    ch.smoother.smooth(obs.value);
                    ch.observed += 1;
                }
            }
        }
        core.collect_outputs(&self.outputs);
    }

    fn do_control(&mut self, core: &mut ManagerCore) -> ControlOutcome {
        let residuals = self.residuals();
        let readings = core.target_readings();

        let outcome = self.decide(&residuals, &readings);
        self.counters.record(&outcome);
        self.write_log_row(&residuals, &readings);

        for managed in &mut self.vms {
            for ch in &mut managed.channels {
                ch.observed = 0;
            }
        }
        core.end_interval();
        outcome
    }

    fn counters(&self) -> ControlCounters {
        self.counters
    }
}
