//! Sensors and their observations.
//!
//! A sensor is polled with [`Sensor::sense`], which gathers whatever the
//! underlying source produced since the previous poll. The gathered
//! observations are then drained, in order, with [`Sensor::observations`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tb_core::Real;
use tracing::warn;

use crate::error::ControlResult;

/// One timestamped reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub value: Real,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, label: impl Into<String>, value: Real) -> Self {
        Self {
            timestamp,
            label: label.into(),
            value,
        }
    }

    /// Observation stamped with the current time.
    pub fn now(label: impl Into<String>, value: Real) -> Self {
        Self::new(Utc::now(), label, value)
    }
}

/// Source of observations for one metric.
///
/// Methods take `&self`: sensors are shared between the manager and the
/// driver that feeds them, so implementations use interior mutability.
pub trait Sensor: fmt::Debug + Send + Sync {
    /// Gather new observations. May block on I/O.
    fn sense(&self) -> ControlResult<()>;

    fn has_observations(&self) -> bool;

    /// Drain the observations gathered by the last `sense`, oldest first.
    fn observations(&self) -> Vec<Observation>;
}

pub type SensorHandle = Arc<dyn Sensor>;

/// Poll `sensor` and drain its observations.
///
/// A failing `sense` is logged and reads as an empty interval. Readings
/// that are not finite numbers are dropped.
pub fn read_sensor(sensor: &dyn Sensor, metric: &str) -> Vec<Observation> {
    if let Err(err) = sensor.sense() {
        warn!(metric, error = %err, "sensor poll failed, no observations this interval");
        return Vec::new();
    }
    if !sensor.has_observations() {
        return Vec::new();
    }
    let mut observations = sensor.observations();
    let before = observations.len();
    observations.retain(|o| o.value.is_finite());
    if observations.len() < before {
        warn!(metric, dropped = before - observations.len(), "dropped non-finite observations");
    }
    observations
}
