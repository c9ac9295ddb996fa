//! Monitor-only controller.

use std::collections::BTreeMap;

use tb_core::{AppPerformanceCategory, Real};
use tracing::{debug, warn};

use crate::app::VmHandle;
use crate::counters::{ControlCounters, ControlOutcome};
use crate::datalog::{DataLog, LogRow};
use crate::error::ControlResult;
use crate::manager::{ControlPolicy, ManagerCore};
use crate::sensor::SensorHandle;

/// Samples and logs application performance without touching any VM.
///
/// Useful as a baseline run next to a real controller. A control step with
/// data counts as applied; one without data is skipped.
#[derive(Debug, Default)]
pub struct MonitorController {
    counters: ControlCounters,
    outputs: BTreeMap<AppPerformanceCategory, SensorHandle>,
    vms: Vec<VmHandle>,
    log: Option<DataLog>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self::default()
    }

    fn log_header(&self, core: &ManagerCore) -> Vec<String> {
        let mut columns = vec!["ts".to_string()];
        for vm in &self.vms {
            columns.push(format!("Cap_{{{}}}", vm.id()));
            columns.push(format!("Share_{{{}}}", vm.id()));
        }
        for category in core.target_metrics() {
            columns.push(format!("y_{{{category}}}"));
            columns.push(format!("yn_{{{category}}}"));
            columns.push(format!("r_{{{category}}}"));
        }
        columns.extend(
            ["# Controls", "# Skip Controls", "# Fail Controls"].map(String::from),
        );
        columns
    }
}

impl ControlPolicy for MonitorController {
    fn do_reset(&mut self, core: &ManagerCore) -> ControlResult<()> {
        let app = core.require_app()?;
        self.outputs = core.output_sensors()?;
        self.vms = app.vms();
        self.counters.reset();

        self.log = None;
        if let Some(path) = core.data_log() {
            let header = self.log_header(core);
            self.log = Some(DataLog::create(path, &header)?);
        }
        Ok(())
    }

    fn do_sample(&mut self, core: &mut ManagerCore) {
        core.collect_outputs(&self.outputs);
    }

    fn do_control(&mut self, core: &mut ManagerCore) -> ControlOutcome {
        let readings = core.target_readings();
        let outcome = match readings.iter().find(|r| r.estimate.is_none()) {
            Some(r) => {
                let reason = format!("no {} observation for the application", r.category);
                debug!(%reason, "monitoring step skipped");
                ControlOutcome::Skipped { reason }
            }
            None => {
                for r in &readings {
                    debug!(metric = %r.category, estimate = r.estimate, target = r.target, error = r.relative_error(), "application performance");
                }
                ControlOutcome::Applied
            }
        };
        self.counters.record(&outcome);

        if let Some(log) = self.log.as_mut() {
            let mut row = LogRow::stamped(chrono::Utc::now().timestamp());
            for vm in &self.vms {
                row.real(vm.cpu_cap()).real(vm.cpu_share());
            }
            for r in &readings {
                let y = r.estimate.unwrap_or(Real::NAN);
                row.real(y).real(y / r.target).real(r.target);
            }
            row.count(self.counters.ctl_count)
                .count(self.counters.ctl_skip_count)
                .count(self.counters.ctl_fail_count);
            if let Err(err) = log.write_row(&row) {
                warn!(error = %err, "cannot write data log row");
            }
        }

        core.end_interval();
        outcome
    }

    fn counters(&self) -> ControlCounters {
        self.counters
    }
}
