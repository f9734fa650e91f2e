//! The two limit samplers. Each one only ever raises its flag; the axis
//! controller that reacts to the limit clears it once recovery is done, so
//! repeated over-threshold observations are idempotent.

use std::time::Duration;

use log::info;

use crate::arm_hal::{ReflectanceSensorHal, TouchSensorHal};
use crate::periodic::run_periodic;
use crate::signals::ArmSignals;

pub const SENSOR_PERIOD: Duration = Duration::from_millis(200);

/// Reflected light at or above this means the arm has reached the top of its
/// travel (the sensor looks at the arm itself up there).
pub const REFLECTION_LIMIT: i32 = 30;

pub struct TopLimitSampler {
    hal: Box<dyn ReflectanceSensorHal + Send>,
    signals: ArmSignals,
}

impl TopLimitSampler {
    pub fn new(hal: Box<dyn ReflectanceSensorHal + Send>, signals: ArmSignals) -> Self {
        Self { hal, signals }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        let shutdown = self.signals.shutdown.clone();
        run_periodic(SENSOR_PERIOD, &shutdown, || self.tick())
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        let reflection = self.hal.reflected_light()?;
        if reflection >= REFLECTION_LIMIT && !self.signals.top_limit.is_set() {
            info!("top limit reached (reflection {reflection})");
            self.signals.top_limit.raise();
        }
        Ok(())
    }
}

pub struct ClockwiseLimitSampler {
    hal: Box<dyn TouchSensorHal + Send>,
    signals: ArmSignals,
}

impl ClockwiseLimitSampler {
    pub fn new(hal: Box<dyn TouchSensorHal + Send>, signals: ArmSignals) -> Self {
        Self { hal, signals }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        let shutdown = self.signals.shutdown.clone();
        run_periodic(SENSOR_PERIOD, &shutdown, || self.tick())
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        if self.hal.is_pressed()? && !self.signals.clockwise_limit.is_set() {
            info!("clockwise limit reached");
            self.signals.clockwise_limit.raise();
        }
        Ok(())
    }
}
