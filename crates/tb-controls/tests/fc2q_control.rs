mod common;

use std::sync::Arc;

use common::{capture_warnings, fc2q_manager, temp_path, testbed};
use proptest::prelude::*;
use tb_controls::{
    Application, ApplicationManager, ControlCounters, ControlError, ControlOutcome, ControlResult,
    Fc2qController, MemoryApplication, MemoryVirtualMachine, MemorySensor, SensorHandle,
    VirtualMachine, VmHandle,
};
use tb_core::{AppPerformanceCategory, VmId, VmPerformanceCategory};
use tb_stats::DataEstimator;

const RT: AppPerformanceCategory = AppPerformanceCategory::ResponseTime;

#[test]
fn starved_and_slow_vm_gets_clamped_to_full_share() {
    let tb = testbed(&[(0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();

    // residual 0 (NEG) and error -0.4 (LOW) => big increase
    tb.feed_all_vms(0.5, 0.5);
    tb.feed_app(RT, 1.4);
    manager.sample();

    assert_eq!(manager.control(), ControlOutcome::Applied);
    assert_eq!(tb.vms[0].cpu_share(), 1.0);
    assert_eq!(tb.vms[0].memory_share(), 1.0);
    assert_eq!(manager.counters().applied_count, 1);
}

#[test]
fn idle_and_fast_vm_is_shrunk() {
    let tb = testbed(&[(1.0, 1.0)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();

    // residual 1 (POS) and error 1 (HIGH) => big decrease
    tb.feed_all_vms(0.0, 0.0);
    tb.feed_app(RT, 0.0);
    manager.sample();

    assert_eq!(manager.control(), ControlOutcome::Applied);
    let cpu = tb.vms[0].cpu_share();
    assert!((cpu - 0.45).abs() < 1e-3, "{cpu}");
}

#[test]
fn missing_application_data_skips_control() {
    let tb = testbed(&[(0.5, 0.5), (0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();

    tb.feed_all_vms(0.5, 0.5);
    manager.sample();
    assert_eq!(manager.core().estimator(RT).unwrap().count(), 0);

    assert!(matches!(manager.control(), ControlOutcome::Skipped { .. }));
    assert_eq!(tb.cpu_shares(), vec![0.5, 0.5]);
    let c = manager.counters();
    assert_eq!((c.ctl_count, c.ctl_skip_count, c.ctl_fail_count), (1, 1, 0));
}

#[test]
fn missing_vm_data_skips_control() {
    let tb = testbed(&[(0.5, 0.5), (0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();

    // only vm0 reports
    tb.feed_vm(0, 0.5, 0.5);
    tb.feed_app(RT, 1.4);
    manager.sample();

    match manager.control() {
        ControlOutcome::Skipped { reason } => assert!(reason.contains("vm1"), "{reason}"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(tb.cpu_shares(), vec![0.5, 0.5]);
}

#[test]
fn estimates_are_per_interval() {
    let tb = testbed(&[(0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();

    tb.feed_all_vms(0.5, 0.5);
    tb.feed_app(RT, 1.0);
    manager.sample();
    assert_eq!(manager.control(), ControlOutcome::Applied);

    // next interval: VMs report, the application does not
    tb.feed_all_vms(0.5, 0.5);
    manager.sample();
    assert!(matches!(manager.control(), ControlOutcome::Skipped { .. }));

    // with estimation carried across intervals the old data is reused
    manager.core_mut().set_reset_estimation_every_interval(false);
    tb.feed_all_vms(0.5, 0.5);
    tb.feed_app(RT, 1.0);
    manager.sample();
    manager.control();
    tb.feed_all_vms(0.5, 0.5);
    manager.sample();
    assert_eq!(manager.control(), ControlOutcome::Applied);
}

#[test]
fn failing_sensor_counts_as_missing_data_and_warns() {
    let tb = testbed(&[(0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();

    tb.feed_all_vms(0.5, 0.5);
    tb.feed_app(RT, 1.4);
    tb.app.output_sensor(RT).fail_next_sense();
    let (outcome, logs) = capture_warnings(|| {
        manager.sample();
        manager.control()
    });
    assert!(matches!(outcome, ControlOutcome::Skipped { .. }));
    assert!(logs.contains("sensor poll failed"), "{logs}");
    assert_eq!(tb.cpu_shares(), vec![0.5]);
}

/// VM whose CPU share cannot be read.
#[derive(Debug)]
struct BrokenVm {
    inner: MemoryVirtualMachine,
}

impl VirtualMachine for BrokenVm {
    fn id(&self) -> &VmId {
        self.inner.id()
    }
    fn cpu_cap(&self) -> f64 {
        self.inner.cpu_cap()
    }
    fn cpu_share(&self) -> f64 {
        f64::NAN
    }
    fn set_cpu_share(&self, share: f64) -> ControlResult<()> {
        self.inner.set_cpu_share(share)
    }
    fn memory_share(&self) -> f64 {
        self.inner.memory_share()
    }
    fn set_memory_share(&self, share: f64) -> ControlResult<()> {
        self.inner.set_memory_share(share)
    }
    fn sensor(&self, category: VmPerformanceCategory) -> Option<SensorHandle> {
        self.inner.sensor(category)
    }
}

#[derive(Debug)]
struct MixedApp {
    healthy: Arc<MemoryVirtualMachine>,
    broken: Arc<BrokenVm>,
    rt: Arc<MemorySensor>,
}

impl Application for MixedApp {
    fn vms(&self) -> Vec<VmHandle> {
        vec![self.healthy.clone(), self.broken.clone()]
    }
    fn sensor(&self, category: AppPerformanceCategory) -> Option<SensorHandle> {
        (category == RT).then(|| self.rt.clone() as SensorHandle)
    }
}

#[test]
fn inference_failure_on_one_vm_discards_the_whole_cycle() {
    let healthy = Arc::new(
        MemoryVirtualMachine::new("ok", 1.0)
            .with_shares(0.5, 0.5)
            .unwrap(),
    );
    let broken = Arc::new(BrokenVm {
        inner: MemoryVirtualMachine::new("broken", 1.0)
            .with_shares(0.5, 0.5)
            .unwrap(),
    });
    let rt = Arc::new(MemorySensor::new());
    let app = Arc::new(MixedApp {
        healthy: healthy.clone(),
        broken: broken.clone(),
        rt: rt.clone(),
    });

    let mut manager = ApplicationManager::new(Fc2qController::new().unwrap());
    manager.core_mut().set_app(app);
    manager.core_mut().set_target(RT, 1.0).unwrap();
    manager.reset().unwrap();

    for category in VmPerformanceCategory::ALL {
        healthy.utilization_sensor(category).push("util", 0.5);
        broken.inner.utilization_sensor(category).push("util", 0.5);
    }
    rt.push("rt", 1.4);

    let (outcome, logs) = capture_warnings(|| {
        manager.sample();
        manager.control()
    });

    assert!(matches!(outcome, ControlOutcome::Failed { .. }), "{outcome:?}");
    // the healthy VM was decided first but must not be touched
    assert_eq!(healthy.cpu_share(), 0.5);
    assert_eq!(healthy.memory_share(), 0.5);
    assert_eq!(broken.memory_share(), 0.5);
    assert_eq!(manager.counters().ctl_fail_count, 1);
    assert!(logs.contains("control not applied"), "{logs}");
}

#[test]
fn undecidable_error_is_a_failure() {
    let tb = testbed(&[(0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 10.0);
    manager.reset().unwrap();

    // E = 0.3 sits on the edge of every error term: no rule fires
    tb.feed_all_vms(0.25, 0.25);
    tb.feed_app(RT, 7.0);
    manager.sample();

    let (outcome, logs) = capture_warnings(|| manager.control());
    match outcome {
        ControlOutcome::Failed { reason } => assert!(reason.contains("Non-finite"), "{reason}"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(logs.contains("WARN"), "{logs}");
    assert_eq!(tb.cpu_shares(), vec![0.5]);
}

#[test]
fn refused_actuation_is_logged_but_applied() {
    let tb = testbed(&[(0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();
    tb.vms[0].reject_share_updates(true);

    tb.feed_all_vms(0.5, 0.5);
    tb.feed_app(RT, 1.4);
    manager.sample();
    let (outcome, logs) = capture_warnings(|| manager.control());

    assert_eq!(outcome, ControlOutcome::Applied);
    assert_eq!(tb.cpu_shares(), vec![0.5]);
    assert!(logs.contains("share update failed"), "{logs}");
}

#[test]
fn refusal_by_one_vm_keeps_the_others_updates() {
    let tb = testbed(&[(0.5, 0.5), (0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();
    tb.vms[1].reject_share_updates(true);

    tb.feed_all_vms(0.5, 0.5);
    tb.feed_app(RT, 1.4);
    manager.sample();
    let (outcome, logs) = capture_warnings(|| manager.control());

    assert_eq!(outcome, ControlOutcome::Applied);
    assert_eq!(tb.cpu_shares(), vec![1.0, 0.5]);
    assert_eq!(tb.vms[0].memory_share(), 1.0);
    assert_eq!(tb.vms[1].memory_share(), 0.5);
    assert!(logs.contains("vm1"), "{logs}");
    assert_eq!(manager.counters().applied_count, 1);
}

#[test]
fn reset_zeroes_counters_and_requires_wiring() {
    let tb = testbed(&[(0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.reset().unwrap();
    manager.control();
    manager.control();
    assert_eq!(manager.counters().ctl_count, 2);

    manager.reset().unwrap();
    assert_eq!(manager.counters(), ControlCounters::default());

    let mut unbound = ApplicationManager::new(Fc2qController::new().unwrap());
    assert!(matches!(unbound.reset(), Err(ControlError::Configuration { .. })));

    let mut untargeted = ApplicationManager::new(Fc2qController::new().unwrap());
    untargeted
        .core_mut()
        .set_app(Arc::new(MemoryApplication::new(Vec::new())));
    assert!(matches!(untargeted.reset(), Err(ControlError::Configuration { .. })));
}

#[test]
fn data_log_has_one_row_per_control() {
    let tb = testbed(&[(0.5, 0.5), (1.0, 1.0)]);
    let path = temp_path("fc2q.csv");
    let mut manager = fc2q_manager(&tb, 1.0);
    manager.core_mut().set_data_log(Some(path.clone()));
    manager.reset().unwrap();

    manager.control(); // skipped: nothing sampled
    tb.feed_all_vms(0.5, 0.5);
    tb.feed_app(RT, 1.4);
    manager.sample();
    manager.control();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "\"ts\",\"Cap_{vm0}\",\"Share_{vm0}\",\"Cap_{vm1}\",\"Share_{vm1}\",\
         \"r_{response_time}\",\"y_{response_time}\",\"E_{response_time}\",\
         \"Cres_{vm0}\",\"Cres_{vm1}\",\"# Controls\",\"# Skip Controls\",\"# Fail Controls\""
    );

    let first: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(first.len(), 13);
    assert!(first[0].parse::<i64>().unwrap() > 0);
    assert_eq!(&first[5..10], &["1", "NaN", "NaN", "NaN", "NaN"]);
    assert_eq!(&first[10..], &["1", "1", "0"]);

    let second: Vec<&str> = lines[2].split(',').collect();
    assert_eq!(second[1..5], ["2", "1", "2", "1"]);
    assert_eq!(second[6], "1.4");
    assert_eq!(&second[10..], &["2", "1", "0"]);
    std::fs::remove_file(&path).ok();
}

#[test]
fn data_log_stays_valid_csv_for_awkward_vm_ids() {
    let vm = Arc::new(
        MemoryVirtualMachine::new("web,\"1\"", 2.0)
            .with_shares(0.5, 0.5)
            .unwrap(),
    );
    let app = Arc::new(MemoryApplication::new(vec![vm.clone()]));
    let path = temp_path("awkward.csv");
    let mut manager = ApplicationManager::new(Fc2qController::new().unwrap());
    manager.core_mut().set_app(app.clone());
    manager.core_mut().set_target(RT, 1.0).unwrap();
    manager.core_mut().set_data_log(Some(path.clone()));
    manager.reset().unwrap();

    for category in VmPerformanceCategory::ALL {
        vm.utilization_sensor(category).push("util", 0.5);
    }
    app.output_sensor(RT).push("rt", 1.4);
    manager.sample();
    assert_eq!(manager.control(), ControlOutcome::Applied);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let header = reader.headers().unwrap().clone();
    assert_eq!(header.len(), 10);
    assert_eq!(&header[1], "Cap_{web,\"1\"}");
    assert_eq!(&header[6], "Cres_{web,\"1\"}");
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), header.len());
    assert_eq!(&rows[0][2], "1");
    std::fs::remove_file(&path).ok();
}

#[test]
fn unopenable_log_fails_reset() {
    let tb = testbed(&[(0.5, 0.5)]);
    let mut manager = fc2q_manager(&tb, 1.0);
    manager
        .core_mut()
        .set_data_log(Some(temp_path("missing-dir").join("log.csv")));
    assert!(matches!(manager.reset(), Err(ControlError::DataLog { .. })));
}

#[derive(Debug, Clone)]
enum Step {
    Feed { vms: bool, app: bool, rt: f64, util: f64 },
    Control,
    Reset,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<bool>(), any::<bool>(), 0.0_f64..3.0, 0.0_f64..1.0)
            .prop_map(|(vms, app, rt, util)| Step::Feed { vms, app, rt, util }),
        Just(Step::Control),
        Just(Step::Reset),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn counters_always_add_up(steps in prop::collection::vec(step(), 1..40)) {
        let tb = testbed(&[(0.5, 0.5), (0.3, 0.8)]);
        let mut manager = fc2q_manager(&tb, 1.0);
        manager.reset().unwrap();
        for s in steps {
            match s {
                Step::Feed { vms, app, rt, util } => {
                    if vms {
                        tb.feed_all_vms(util, util);
                    }
                    if app {
                        tb.feed_app(RT, rt);
                    }
                    manager.sample();
                }
                Step::Control => {
                    manager.control();
                }
                Step::Reset => {
                    manager.reset().unwrap();
                    prop_assert_eq!(manager.counters(), ControlCounters::default());
                }
            }
            let c = manager.counters();
            prop_assert!(c.is_consistent(), "{:?}", c);
            for share in tb.cpu_shares() {
                prop_assert!((0.0..=1.0).contains(&share));
            }
        }
    }
}
