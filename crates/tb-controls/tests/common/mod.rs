#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tb_controls::{ApplicationManager, Fc2qController, MemoryApplication, MemoryVirtualMachine};
use tb_core::{AppPerformanceCategory, VmPerformanceCategory};
use tracing_subscriber::fmt::MakeWriter;

pub struct Testbed {
    pub app: Arc<MemoryApplication>,
    pub vms: Vec<Arc<MemoryVirtualMachine>>,
}

/// One VM per `(cpu_share, memory_share)` pair, named `vm0`, `vm1`, ...
pub fn testbed(shares: &[(f64, f64)]) -> Testbed {
    let vms: Vec<_> = shares
        .iter()
        .enumerate()
        .map(|(i, &(cpu, mem))| {
            Arc::new(
                MemoryVirtualMachine::new(format!("vm{i}"), 2.0)
                    .with_shares(cpu, mem)
                    .unwrap(),
            )
        })
        .collect();
    let app = Arc::new(MemoryApplication::new(vms.clone()));
    Testbed { app, vms }
}

impl Testbed {
    pub fn feed_vm(&self, index: usize, cpu_util: f64, mem_util: f64) {
        let vm = &self.vms[index];
        vm.utilization_sensor(VmPerformanceCategory::CpuUtil)
            .push("cpu", cpu_util);
        vm.utilization_sensor(VmPerformanceCategory::MemoryUtil)
            .push("mem", mem_util);
    }

    pub fn feed_all_vms(&self, cpu_util: f64, mem_util: f64) {
        for i in 0..self.vms.len() {
            self.feed_vm(i, cpu_util, mem_util);
        }
    }

    pub fn feed_app(&self, category: AppPerformanceCategory, value: f64) {
        self.app.output_sensor(category).push(category.as_str(), value);
    }

    pub fn cpu_shares(&self) -> Vec<f64> {
        use tb_controls::VirtualMachine;
        self.vms.iter().map(|vm| vm.cpu_share()).collect()
    }
}

/// FC2Q manager on `tb` with a response-time target.
pub fn fc2q_manager(tb: &Testbed, rt_target: f64) -> ApplicationManager<Fc2qController> {
    let mut manager = ApplicationManager::new(Fc2qController::new().unwrap());
    let core = manager.core_mut();
    core.set_app(tb.app.clone());
    core.set_sampling_time_ms(1000.0).unwrap();
    core.set_control_time_ms(5000.0).unwrap();
    core.set_target(AppPerformanceCategory::ResponseTime, rt_target)
        .unwrap();
    manager
}

pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tb-controls-{}-{name}", std::process::id()))
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a subscriber that records warnings; returns what was logged.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    (result, text)
}
