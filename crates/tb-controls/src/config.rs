//! Manager configuration files.
//!
//! ```yaml
//! sampling_time_ms: 10000
//! control_time_ms: 60000
//! smoothing_factor: 0.9
//! data_log: /tmp/fc2q.csv
//! targets:
//!   response_time:
//!     value: 0.5
//!     estimator: { kind: quantile, probability: 0.95 }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tb_core::{AppPerformanceCategory, Real, ensure_finite};
use tb_stats::{DataEstimator, MeanEstimator, P2QuantileEstimator};

use crate::error::{ControlError, ControlResult};
use crate::intervals::ControlIntervals;
use crate::manager::{ApplicationManager, ControlPolicy};

fn default_smoothing_factor() -> Real {
    0.9
}

fn default_true() -> bool {
    true
}

/// Estimator used for an application metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorConfig {
    #[default]
    Mean,
    /// Streaming P² estimate of the given quantile.
    Quantile { probability: Real },
}

impl EstimatorConfig {
    pub fn build(&self) -> ControlResult<Box<dyn DataEstimator>> {
        Ok(match *self {
            EstimatorConfig::Mean => Box::new(MeanEstimator::new()),
            EstimatorConfig::Quantile { probability } => {
                Box::new(P2QuantileEstimator::new(probability)?)
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub value: Real,
    #[serde(default)]
    pub estimator: EstimatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub sampling_time_ms: Real,
    pub control_time_ms: Real,
    /// Exponential smoothing factor of the per-VM utilization smoothers.
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: Real,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_log: Option<PathBuf>,
    pub targets: BTreeMap<AppPerformanceCategory, TargetConfig>,
    #[serde(default = "default_true")]
    pub reset_estimation_every_interval: bool,
}

impl ManagerConfig {
    /// # Errors
    ///
    /// Returns the first invalid field: a non-positive interval, a
    /// smoothing factor outside `(0, 1]`, a zero or non-finite target or a
    /// quantile probability outside `(0, 1)`.
    pub fn validate(&self) -> ControlResult<()> {
        ControlIntervals::new(self.sampling_time_ms, self.control_time_ms)?;
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(ControlError::InvalidArg {
                what: "smoothing factor must be in (0, 1]",
            });
        }
        for target in self.targets.values() {
            if ensure_finite(target.value, "target value")? == 0.0 {
                return Err(ControlError::InvalidArg {
                    what: "target value must be non-zero",
                });
            }
            target.estimator.build()?;
        }
        Ok(())
    }

    /// Push this configuration into `manager`, replacing its intervals,
    /// targets, estimators and data log path. Takes effect at the next
    /// reset.
    pub fn apply<P: ControlPolicy>(&self, manager: &mut ApplicationManager<P>) -> ControlResult<()> {
        self.validate()?;
        let core = manager.core_mut();
        core.set_sampling_time_ms(self.sampling_time_ms)?;
        core.set_control_time_ms(self.control_time_ms)?;
        core.clear_targets();
        for (&category, target) in &self.targets {
            core.set_estimator(category, target.estimator.build()?);
            core.set_target(category, target.value)?;
        }
        core.set_data_log(self.data_log.clone());
        core.set_reset_estimation_every_interval(self.reset_estimation_every_interval);
        manager.policy_mut().configure(self)
    }
}

pub fn load_yaml(path: &Path) -> ControlResult<ManagerConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ManagerConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

pub fn save_yaml(path: &Path, config: &ManagerConfig) -> ControlResult<()> {
    config.validate()?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ControlResult<ManagerConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ManagerConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
