//! Performance categories observed by the controllers.
//!
//! Both sets are closed: the rule base only knows two application metrics
//! and two VM resources, so every use site matches exhaustively.

use core::fmt;
use core::str::FromStr;

use crate::TbError;

/// Application-level performance metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum AppPerformanceCategory {
    /// Mean/percentile response time; lower is better.
    ResponseTime,
    /// Served requests per unit time; higher is better.
    Throughput,
}

impl AppPerformanceCategory {
    pub const ALL: [Self; 2] = [Self::ResponseTime, Self::Throughput];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResponseTime => "response_time",
            Self::Throughput => "throughput",
        }
    }

    /// Normalized error of `measured` against `target`.
    ///
    /// Positive values mean the application performs better than required
    /// (spare capacity), negative values mean it lags behind its target.
    pub fn relative_error(self, target: f64, measured: f64) -> f64 {
        match self {
            Self::ResponseTime => (target - measured) / target,
            Self::Throughput => (measured - target) / target,
        }
    }
}

impl fmt::Display for AppPerformanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppPerformanceCategory {
    type Err = TbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TbError::UnknownCategory {
                name: s.to_string(),
            })
    }
}

/// Per-VM resource utilization metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum VmPerformanceCategory {
    CpuUtil,
    MemoryUtil,
}

impl VmPerformanceCategory {
    pub const ALL: [Self; 2] = [Self::CpuUtil, Self::MemoryUtil];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CpuUtil => "cpu_util",
            Self::MemoryUtil => "memory_util",
        }
    }
}

impl fmt::Display for VmPerformanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VmPerformanceCategory {
    type Err = TbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TbError::UnknownCategory {
                name: s.to_string(),
            })
    }
}
