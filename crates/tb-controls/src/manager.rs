//! Application manager lifecycle.
//!
//! [`ApplicationManager`] owns the configuration shared by every
//! controller ([`ManagerCore`]) and a [`ControlPolicy`] holding the
//! controller-specific state. Each of `reset`, `sample` and `control` runs
//! the policy step, then calls the observers registered for that event in
//! registration order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tb_core::{AppPerformanceCategory, Real, ensure_finite};
use tb_stats::{DataEstimator, DataSmoother, MeanEstimator};
use tracing::debug;

use crate::app::ApplicationHandle;
use crate::config::ManagerConfig;
use crate::counters::{ControlCounters, ControlOutcome};
use crate::error::{ControlError, ControlResult};
use crate::intervals::ControlIntervals;
use crate::sensor::{SensorHandle, read_sensor};

/// Target, current estimate and relative error of one application metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetReading {
    pub category: AppPerformanceCategory,
    pub target: Real,
    /// `None` if nothing was observed since the estimator was last reset.
    pub estimate: Option<Real>,
}

impl TargetReading {
    pub fn relative_error(&self) -> Option<Real> {
        self.estimate
            .map(|y| self.category.relative_error(self.target, y))
    }
}

/// Configuration and application-level statistics shared by all policies.
#[derive(Debug)]
pub struct ManagerCore {
    intervals: ControlIntervals,
    app: Option<ApplicationHandle>,
    targets: BTreeMap<AppPerformanceCategory, Real>,
    estimators: BTreeMap<AppPerformanceCategory, Box<dyn DataEstimator>>,
    smoothers: BTreeMap<AppPerformanceCategory, Box<dyn DataSmoother>>,
    data_log: Option<PathBuf>,
    reset_estimation_every_interval: bool,
}

impl Default for ManagerCore {
    fn default() -> Self {
        Self {
            intervals: ControlIntervals::default(),
            app: None,
            targets: BTreeMap::new(),
            estimators: BTreeMap::new(),
            smoothers: BTreeMap::new(),
            data_log: None,
            reset_estimation_every_interval: true,
        }
    }
}

impl ManagerCore {
    pub fn set_app(&mut self, app: ApplicationHandle) {
        self.app = Some(app);
    }

    pub fn app(&self) -> Option<&ApplicationHandle> {
        self.app.as_ref()
    }

    pub(crate) fn require_app(&self) -> ControlResult<ApplicationHandle> {
        self.app.clone().ok_or_else(|| ControlError::Configuration {
            what: "no application is bound to the manager".to_string(),
        })
    }

    pub fn intervals(&self) -> &ControlIntervals {
        &self.intervals
    }

    pub fn set_sampling_time_ms(&mut self, value: Real) -> ControlResult<()> {
        self.intervals.set_sampling_time_ms(value)
    }

    pub fn set_control_time_ms(&mut self, value: Real) -> ControlResult<()> {
        self.intervals.set_control_time_ms(value)
    }

    /// Set the target of `category`.
    ///
    /// A metric without a registered estimator gets a running mean.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero or non-finite target (relative errors
    /// divide by it).
    pub fn set_target(&mut self, category: AppPerformanceCategory, value: Real) -> ControlResult<()> {
        let value = ensure_finite(value, "target value")?;
        if value == 0.0 {
            return Err(ControlError::InvalidArg {
                what: "target value must be non-zero",
            });
        }
        self.targets.insert(category, value);
        self.estimators
            .entry(category)
            .or_insert_with(|| Box::new(MeanEstimator::new()));
        Ok(())
    }

    pub fn target(&self, category: AppPerformanceCategory) -> Option<Real> {
        self.targets.get(&category).copied()
    }

    /// Targeted metrics in category order.
    pub fn target_metrics(&self) -> Vec<AppPerformanceCategory> {
        self.targets.keys().copied().collect()
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
    }

    pub fn set_estimator(&mut self, category: AppPerformanceCategory, estimator: Box<dyn DataEstimator>) {
        self.estimators.insert(category, estimator);
    }

    pub fn estimator(&self, category: AppPerformanceCategory) -> Option<&dyn DataEstimator> {
        self.estimators.get(&category).map(|e| e.as_ref())
    }

    /// Track the raw series of `category` with `smoother` as well.
    pub fn set_smoother(&mut self, category: AppPerformanceCategory, smoother: Box<dyn DataSmoother>) {
        self.smoothers.insert(category, smoother);
    }

    pub fn smoother(&self, category: AppPerformanceCategory) -> Option<&dyn DataSmoother> {
        self.smoothers.get(&category).map(|s| s.as_ref())
    }

    /// Path of the per-control CSV log; `None` disables logging.
    pub fn set_data_log(&mut self, path: Option<PathBuf>) {
        self.data_log = path;
    }

    pub fn data_log(&self) -> Option<&Path> {
        self.data_log.as_deref()
    }

    pub fn set_reset_estimation_every_interval(&mut self, on: bool) {
        self.reset_estimation_every_interval = on;
    }

    pub fn reset_estimation_every_interval(&self) -> bool {
        self.reset_estimation_every_interval
    }

    /// Drop everything every estimator and smoother accumulated.
    pub(crate) fn reset_statistics(&mut self) {
        for estimator in self.estimators.values_mut() {
            estimator.reset();
        }
        for smoother in self.smoothers.values_mut() {
            smoother.reset();
        }
    }

    /// Resolve the application sensor of every targeted metric.
    pub(crate) fn output_sensors(
        &self,
    ) -> ControlResult<BTreeMap<AppPerformanceCategory, SensorHandle>> {
        let app = self.require_app()?;
        self.targets
            .keys()
            .map(|&category| {
                app.sensor(category)
                    .map(|sensor| (category, sensor))
                    .ok_or_else(|| ControlError::Configuration {
                        what: format!("application has no {category} sensor"),
                    })
            })
            .collect()
    }

    /// Poll application sensors and feed their observations to the
    /// estimators (and smoothers, where registered).
    pub(crate) fn collect_outputs(&mut self, sensors: &BTreeMap<AppPerformanceCategory, SensorHandle>) {
        for (&category, sensor) in sensors {
            let observations = read_sensor(sensor.as_ref(), category.as_str());
            if observations.is_empty() {
                continue;
            }
            let values: Vec<Real> = observations.iter().map(|o| o.value).collect();
            if let Some(estimator) = self.estimators.get_mut(&category) {
                estimator.collect_many(&values);
            }
            if let Some(smoother) = self.smoothers.get_mut(&category) {
                smoother.smooth_many(&values);
            }
            debug!(metric = %category, count = values.len(), "collected application observations");
        }
    }

    /// Current reading of every targeted metric, in category order.
    pub fn target_readings(&self) -> Vec<TargetReading> {
        self.targets
            .iter()
            .map(|(&category, &target)| TargetReading {
                category,
                target,
                estimate: self
                    .estimators
                    .get(&category)
                    .filter(|e| e.count() > 0)
                    .and_then(|e| e.estimate()),
            })
            .collect()
    }

    /// Close the current control interval.
    pub(crate) fn end_interval(&mut self) {
        if self.reset_estimation_every_interval {
            for estimator in self.estimators.values_mut() {
                estimator.reset();
            }
        }
    }
}

/// Controller-specific steps run by an [`ApplicationManager`].
pub trait ControlPolicy: fmt::Debug + Send {
    /// Take the controller-specific parts of a configuration.
    fn configure(&mut self, _config: &ManagerConfig) -> ControlResult<()> {
        Ok(())
    }

    /// Rewire sensors and drop per-run state. The core has already checked
    /// that an application is bound and cleared its statistics.
    fn do_reset(&mut self, core: &ManagerCore) -> ControlResult<()>;

    fn do_sample(&mut self, core: &mut ManagerCore);

    fn do_control(&mut self, core: &mut ManagerCore) -> ControlOutcome;

    fn counters(&self) -> ControlCounters;
}

/// Lifecycle event an observer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerEvent {
    Reset,
    Sample,
    Control,
}

type Observer<P> = Box<dyn FnMut(&ApplicationManager<P>) + Send>;

/// Drives a [`ControlPolicy`] through reset, sample and control calls.
pub struct ApplicationManager<P: ControlPolicy> {
    core: ManagerCore,
    policy: P,
    on_reset: Vec<Observer<P>>,
    on_sample: Vec<Observer<P>>,
    on_control: Vec<Observer<P>>,
}

impl<P: ControlPolicy> fmt::Debug for ApplicationManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationManager")
            .field("core", &self.core)
            .field("policy", &self.policy)
            .field("observers", &(self.on_reset.len(), self.on_sample.len(), self.on_control.len()))
            .finish()
    }
}

impl<P: ControlPolicy> ApplicationManager<P> {
    pub fn new(policy: P) -> Self {
        Self {
            core: ManagerCore::default(),
            policy,
            on_reset: Vec::new(),
            on_sample: Vec::new(),
            on_control: Vec::new(),
        }
    }

    pub fn core(&self) -> &ManagerCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ManagerCore {
        &mut self.core
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    pub fn counters(&self) -> ControlCounters {
        self.policy.counters()
    }

    /// Register `observer` for `event`; observers run in registration order.
    pub fn add_observer(
        &mut self,
        event: ManagerEvent,
        observer: impl FnMut(&ApplicationManager<P>) + Send + 'static,
    ) {
        self.observers_mut(event).push(Box::new(observer));
    }

    fn observers_mut(&mut self, event: ManagerEvent) -> &mut Vec<Observer<P>> {
        match event {
            ManagerEvent::Reset => &mut self.on_reset,
            ManagerEvent::Sample => &mut self.on_sample,
            ManagerEvent::Control => &mut self.on_control,
        }
    }

    fn notify(&mut self, event: ManagerEvent) {
        let mut observers = std::mem::take(self.observers_mut(event));
        for observer in &mut observers {
            observer(&*self);
        }
        *self.observers_mut(event) = observers;
    }

    /// Start a new run: clear statistics and counters, rewire sensors and
    /// reopen the data log.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no application is bound or the
    /// policy cannot wire itself to it.
    pub fn reset(&mut self) -> ControlResult<()> {
        self.core.require_app()?;
        self.core.reset_statistics();
        self.policy.do_reset(&self.core)?;
        self.notify(ManagerEvent::Reset);
        Ok(())
    }

    /// Gather one sampling interval worth of observations.
    pub fn sample(&mut self) {
        self.policy.do_sample(&mut self.core);
        self.notify(ManagerEvent::Sample);
    }

    /// Run one control step. Never fails; see [`ControlOutcome`].
    pub fn control(&mut self) -> ControlOutcome {
        let outcome = self.policy.do_control(&mut self.core);
        self.notify(ManagerEvent::Control);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tb_stats::{LastValueSmoother, P2QuantileEstimator};

    use crate::memory::MemoryApplication;

    #[derive(Debug, Default)]
    struct Recorder {
        counters: ControlCounters,
        resets: u32,
    }

    impl ControlPolicy for Recorder {
        fn do_reset(&mut self, _core: &ManagerCore) -> ControlResult<()> {
            self.resets += 1;
            self.counters.reset();
            Ok(())
        }

        fn do_sample(&mut self, _core: &mut ManagerCore) {}

        fn do_control(&mut self, core: &mut ManagerCore) -> ControlOutcome {
            let outcome = ControlOutcome::Applied;
            self.counters.record(&outcome);
            core.end_interval();
            outcome
        }

        fn counters(&self) -> ControlCounters {
            self.counters
        }
    }

    #[test]
    fn reset_requires_an_application() {
        let mut manager = ApplicationManager::new(Recorder::default());
        assert!(matches!(manager.reset(), Err(ControlError::Configuration { .. })));
        assert_eq!(manager.policy().resets, 0);

        manager.core_mut().set_app(Arc::new(MemoryApplication::new(Vec::new())));
        manager.reset().unwrap();
        assert_eq!(manager.policy().resets, 1);
    }

    #[test]
    fn observers_run_in_order_after_the_step() {
        let mut manager = ApplicationManager::new(Recorder::default());
        manager.core_mut().set_app(Arc::new(MemoryApplication::new(Vec::new())));
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            manager.add_observer(ManagerEvent::Control, move |m| {
                seen.lock().unwrap().push((tag, m.counters().ctl_count));
            });
        }
        let resets = Arc::clone(&seen);
        manager.add_observer(ManagerEvent::Reset, move |m| {
            resets.lock().unwrap().push(("reset", m.counters().ctl_count));
        });

        manager.reset().unwrap();
        manager.control();
        manager.control();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("reset", 0), ("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn targets_get_a_default_estimator() {
        let mut core = ManagerCore::default();
        core.set_target(AppPerformanceCategory::ResponseTime, 0.5).unwrap();
        assert!(core.estimator(AppPerformanceCategory::ResponseTime).is_some());

        core.set_estimator(
            AppPerformanceCategory::Throughput,
            Box::new(P2QuantileEstimator::new(0.9).unwrap()),
        );
        core.set_target(AppPerformanceCategory::Throughput, 10.0).unwrap();
        assert_eq!(core.target_metrics(), AppPerformanceCategory::ALL.to_vec());

        assert!(core.set_target(AppPerformanceCategory::Throughput, 0.0).is_err());
        assert!(matches!(
            core.set_target(AppPerformanceCategory::Throughput, Real::NAN),
            Err(ControlError::NonFinite { what: "target value", .. })
        ));
        assert!(matches!(
            core.set_target(AppPerformanceCategory::Throughput, Real::INFINITY),
            Err(ControlError::NonFinite { .. })
        ));
        assert_eq!(core.target(AppPerformanceCategory::Throughput), Some(10.0));
    }

    #[test]
    fn readings_without_data_have_no_error() {
        let mut core = ManagerCore::default();
        core.set_target(AppPerformanceCategory::ResponseTime, 2.0).unwrap();
        let readings = core.target_readings();
        assert_eq!(readings.len(), 1);
        assert!(readings[0].estimate.is_none());
        assert!(readings[0].relative_error().is_none());
    }

    #[test]
    fn reset_clears_estimators_and_smoothers() {
        let app = Arc::new(MemoryApplication::new(Vec::new()));
        let mut manager = ApplicationManager::new(Recorder::default());
        manager.core_mut().set_app(app.clone());
        manager
            .core_mut()
            .set_target(AppPerformanceCategory::Throughput, 10.0)
            .unwrap();
        manager
            .core_mut()
            .set_smoother(AppPerformanceCategory::Throughput, Box::new(LastValueSmoother::new()));

        let sensors = manager.core().output_sensors().unwrap();
        app.output_sensor(AppPerformanceCategory::Throughput).push("tput", 12.0);
        manager.core_mut().collect_outputs(&sensors);
        let core = manager.core();
        assert_eq!(core.estimator(AppPerformanceCategory::Throughput).unwrap().count(), 1);
        assert_eq!(
            core.smoother(AppPerformanceCategory::Throughput).unwrap().forecast(0),
            Some(12.0)
        );

        manager.reset().unwrap();
        let core = manager.core();
        assert_eq!(core.estimator(AppPerformanceCategory::Throughput).unwrap().count(), 0);
        assert!(core
            .smoother(AppPerformanceCategory::Throughput)
            .unwrap()
            .forecast(0)
            .is_none());
    }

    #[test]
    fn estimation_reset_per_interval_is_optional() {
        let mut core = ManagerCore::default();
        core.set_target(AppPerformanceCategory::Throughput, 10.0).unwrap();
        core.estimators
            .get_mut(&AppPerformanceCategory::Throughput)
            .unwrap()
            .collect(5.0);

        core.set_reset_estimation_every_interval(false);
        core.end_interval();
        assert_eq!(core.target_readings()[0].estimate, Some(5.0));

        core.set_reset_estimation_every_interval(true);
        core.end_interval();
        assert_eq!(core.target_readings()[0].estimate, None);
    }
}
