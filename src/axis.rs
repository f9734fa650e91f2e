//! The shared state machine behind the rotation and elevation activities.
//!
//! Per tick, in priority order: sensor-limit recovery (back off by a fixed
//! relative offset), soft-limit recovery (return to absolute zero), then
//! direct drive per the latest intent. Recovery blocks the activity until
//! the move completes and brackets itself with the correction flag; user
//! intent is still sampled during those ticks but not applied.

use std::time::Duration;

use log::info;

use crate::arm_hal::{wait_for_motion_stop, MotorCommand, MotorHal};
use crate::periodic::run_periodic;
use crate::signals::{ArmSignals, ElevationIntent, Intent, RotationIntent, SharedFlag};

pub const MOTOR_PERIOD: Duration = Duration::from_millis(90);

pub const ROTATION_POWER: i32 = 30;
pub const ELEVATION_UP_POWER: i32 = -30;
pub const ELEVATION_DOWN_POWER: i32 = 20;

/// Relative back-off applied when a sensor limit trips; also the distance
/// from each sensor limit to the calibrated zero.
pub const ROTATION_RECOVERY_UNITS: i32 = -350;
pub const ELEVATION_RECOVERY_UNITS: i32 = 100;

/// Geometric travel limits on the side without a sensor.
pub const ROTATION_LEFT_LIMIT: i32 = -400;
pub const ELEVATION_BOTTOM_LIMIT: i32 = 200;

#[derive(Debug, Copy, Clone)]
pub enum SoftLimit {
    Below(i32),
    Above(i32),
}

impl SoftLimit {
    fn exceeded_by(self, position: i32) -> bool {
        match self {
            SoftLimit::Below(limit) => position < limit,
            SoftLimit::Above(limit) => position > limit,
        }
    }
}

pub struct AxisProfile {
    pub name: &'static str,
    pub recovery_offset: i32,
    pub soft_limit: SoftLimit,
    /// Maps the latest intent to this axis's requested duty cycle.
    pub requested_duty: fn(Intent) -> i32,
}

pub fn rotation_profile() -> AxisProfile {
    AxisProfile {
        name: "rotation",
        recovery_offset: ROTATION_RECOVERY_UNITS,
        soft_limit: SoftLimit::Below(ROTATION_LEFT_LIMIT),
        requested_duty: |intent| match intent.rotation {
            RotationIntent::Right => ROTATION_POWER,
            RotationIntent::Left => -ROTATION_POWER,
            RotationIntent::Stop => 0,
        },
    }
}

pub fn elevation_profile() -> AxisProfile {
    AxisProfile {
        name: "elevation",
        recovery_offset: ELEVATION_RECOVERY_UNITS,
        soft_limit: SoftLimit::Above(ELEVATION_BOTTOM_LIMIT),
        requested_duty: |intent| match intent.elevation {
            ElevationIntent::Rise => ELEVATION_UP_POWER,
            ElevationIntent::Lower => ELEVATION_DOWN_POWER,
            ElevationIntent::Stop => 0,
        },
    }
}

pub struct AxisController {
    motor: Box<dyn MotorHal + Send>,
    /// The sensor-limit flag this axis reacts to and clears.
    limit: SharedFlag,
    signals: ArmSignals,
    profile: AxisProfile,
    current_duty: i32,
}

impl AxisController {
    pub fn rotation(motor: Box<dyn MotorHal + Send>, signals: &ArmSignals) -> Self {
        Self {
            motor,
            limit: signals.clockwise_limit.clone(),
            signals: signals.clone(),
            profile: rotation_profile(),
            current_duty: 0,
        }
    }

    pub fn elevation(motor: Box<dyn MotorHal + Send>, signals: &ArmSignals) -> Self {
        Self {
            motor,
            limit: signals.top_limit.clone(),
            signals: signals.clone(),
            profile: elevation_profile(),
            current_duty: 0,
        }
    }

    pub fn run_loop(&mut self) -> anyhow::Result<()> {
        let shutdown = self.signals.shutdown.clone();
        run_periodic(MOTOR_PERIOD, &shutdown, || self.tick())
    }

    pub fn into_motor(self) -> Box<dyn MotorHal + Send> {
        self.motor
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        let requested = (self.profile.requested_duty)(self.signals.intent.snapshot());

        if self.limit.is_set() {
            info!(
                "{}: sensor limit hit, backing off {} units",
                self.profile.name, self.profile.recovery_offset
            );
            self.signals.correction.raise();
            self.motor.send_command(MotorCommand::RunToRelPos {
                offset: self.profile.recovery_offset,
            })?;
            wait_for_motion_stop(self.motor.as_ref())?;
            self.limit.clear();
            self.cut_power()?;
            self.signals.correction.clear();
        } else if self.profile.soft_limit.exceeded_by(self.motor.position()?) {
            info!("{}: soft limit exceeded, returning to zero", self.profile.name);
            self.signals.correction.raise();
            self.motor
                .send_command(MotorCommand::RunToAbsPos { position: 0 })?;
            wait_for_motion_stop(self.motor.as_ref())?;
            self.cut_power()?;
            self.signals.correction.clear();
        } else if requested != self.current_duty {
            self.motor.send_command(MotorCommand::RunDirect {
                duty_cycle: requested,
            })?;
            self.current_duty = requested;
        }
        Ok(())
    }

    fn cut_power(&mut self) -> anyhow::Result<()> {
        self.motor
            .send_command(MotorCommand::RunDirect { duty_cycle: 0 })?;
        self.current_duty = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::arm_hal_mock::MockMotor;
    use crate::periodic::{rank, spawn_rt};
    use crate::signals::ClawIntent;

    fn intent(rotation: RotationIntent, elevation: ElevationIntent) -> Intent {
        Intent {
            rotation,
            elevation,
            claw: ClawIntent::Inactive,
        }
    }

    #[test]
    fn direct_drive_issued_once_per_intent_change() {
        let motor = MockMotor::new();
        let signals = ArmSignals::new();
        let mut controller = AxisController::rotation(Box::new(motor.clone()), &signals);

        signals
            .intent
            .publish(intent(RotationIntent::Left, ElevationIntent::Stop));
        for _ in 0..5 {
            controller.tick().unwrap();
        }
        // Five ticks of the same intent, one hardware command.
        assert_eq!(
            motor.commands(),
            vec![MotorCommand::RunDirect { duty_cycle: -30 }]
        );

        signals
            .intent
            .publish(intent(RotationIntent::Stop, ElevationIntent::Stop));
        controller.tick().unwrap();
        assert_eq!(
            motor.commands(),
            vec![
                MotorCommand::RunDirect { duty_cycle: -30 },
                MotorCommand::RunDirect { duty_cycle: 0 },
            ]
        );
    }

    #[test]
    fn all_duty_cycles_stay_in_axis_range() {
        let rotation_duties: Vec<i32> = [
            RotationIntent::Left,
            RotationIntent::Right,
            RotationIntent::Stop,
        ]
        .into_iter()
        .map(|r| (rotation_profile().requested_duty)(intent(r, ElevationIntent::Stop)))
        .collect();
        assert_eq!(rotation_duties, vec![-30, 30, 0]);

        let elevation_duties: Vec<i32> = [
            ElevationIntent::Rise,
            ElevationIntent::Lower,
            ElevationIntent::Stop,
        ]
        .into_iter()
        .map(|e| (elevation_profile().requested_duty)(intent(RotationIntent::Stop, e)))
        .collect();
        assert_eq!(elevation_duties, vec![-30, 20, 0]);
    }

    #[test]
    fn sensor_limit_triggers_relative_recovery_and_clears_flag() {
        let motor = MockMotor::new();
        let signals = ArmSignals::new();
        let mut controller = AxisController::rotation(Box::new(motor.clone()), &signals);

        // Motor was driving right when the touch sensor tripped.
        signals
            .intent
            .publish(intent(RotationIntent::Right, ElevationIntent::Stop));
        controller.tick().unwrap();
        signals.clockwise_limit.raise();
        controller.tick().unwrap();

        assert_eq!(
            motor.commands(),
            vec![
                MotorCommand::RunDirect { duty_cycle: 30 },
                MotorCommand::RunToRelPos { offset: -350 },
                MotorCommand::RunDirect { duty_cycle: 0 },
            ]
        );
        assert!(!signals.clockwise_limit.is_set());
        assert!(!signals.correction.is_set());

        // The next tick re-applies the (still RIGHT) user intent.
        controller.tick().unwrap();
        assert_eq!(
            motor.commands().last(),
            Some(&MotorCommand::RunDirect { duty_cycle: 30 })
        );
    }

    #[test]
    fn soft_limit_triggers_absolute_recovery() {
        let motor = MockMotor::new();
        let signals = ArmSignals::new();
        let mut controller = AxisController::elevation(Box::new(motor.clone()), &signals);

        motor.set_position(ELEVATION_BOTTOM_LIMIT + 50);
        controller.tick().unwrap();

        assert_eq!(
            motor.commands(),
            vec![
                MotorCommand::RunToAbsPos { position: 0 },
                MotorCommand::RunDirect { duty_cycle: 0 },
            ]
        );
        assert_eq!(motor.state().position, 0);
        assert!(!signals.correction.is_set());
    }

    #[test]
    fn sensor_limit_wins_over_soft_limit_in_the_same_tick() {
        let motor = MockMotor::new();
        let signals = ArmSignals::new();
        let mut controller = AxisController::elevation(Box::new(motor.clone()), &signals);

        motor.set_position(ELEVATION_BOTTOM_LIMIT + 50);
        signals.top_limit.raise();
        controller.tick().unwrap();

        assert_eq!(
            motor.commands().first(),
            Some(&MotorCommand::RunToRelPos { offset: 100 })
        );
        assert!(!signals.top_limit.is_set());
    }

    #[test]
    fn rotation_stays_quiet_inside_its_travel() {
        let motor = MockMotor::new();
        let signals = ArmSignals::new();
        let mut controller = AxisController::rotation(Box::new(motor.clone()), &signals);

        motor.set_position(ROTATION_LEFT_LIMIT + 1);
        controller.tick().unwrap();
        assert!(motor.commands().is_empty());

        motor.set_position(ROTATION_LEFT_LIMIT - 1);
        controller.tick().unwrap();
        assert_eq!(
            motor.commands().first(),
            Some(&MotorCommand::RunToAbsPos { position: 0 })
        );
    }

    #[test]
    fn correction_flag_is_up_for_the_whole_recovery() {
        let motor = MockMotor::new();
        // ~80ms of simulated motion at the 1ms poll interval.
        motor.set_move_polls(80);
        let signals = ArmSignals::new();
        let mut controller = AxisController::rotation(Box::new(motor.clone()), &signals);

        signals.clockwise_limit.raise();
        let probe = signals.clone();
        let handle = spawn_rt("axis-under-test", rank::AXIS, move || {
            controller.tick().unwrap();
            controller
        })
        .unwrap();

        thread::sleep(Duration::from_millis(30));
        assert!(probe.correction.is_set());

        let controller = handle.join().unwrap();
        assert!(!probe.correction.is_set());
        drop(controller);
    }
}
