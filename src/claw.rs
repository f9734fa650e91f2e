//! The gripper controller. Toggles on the rising edge of claw intent and
//! acknowledges it back to Inactive, so one press is one toggle. Closing is
//! time-bounded rather than position-bounded: power is cut after a fixed
//! hold so the claw stalls compliantly around whatever it grabbed.

use std::thread;
use std::time::Duration;

use log::info;

use crate::arm_hal::{wait_for_motion_stop, MotorCommand, MotorHal};
use crate::axis::MOTOR_PERIOD;
use crate::periodic::run_periodic;
use crate::signals::{ArmSignals, ClawIntent};

pub const CLAW_POWER: i32 = 40;
pub const CLAW_CLOSE_HOLD: Duration = Duration::from_millis(500);

pub struct ClawController {
    motor: Box<dyn MotorHal + Send>,
    signals: ArmSignals,
    claw_open: bool,
    close_hold: Duration,
}

impl ClawController {
    pub fn new(motor: Box<dyn MotorHal + Send>, signals: &ArmSignals) -> Self {
        Self {
            motor,
            signals: signals.clone(),
            // Calibration leaves the claw open.
            claw_open: true,
            close_hold: CLAW_CLOSE_HOLD,
        }
    }

    #[cfg(test)]
    fn with_close_hold(mut self, close_hold: Duration) -> Self {
        self.close_hold = close_hold;
        self
    }

    pub fn run_loop(&mut self) -> anyhow::Result<()> {
        let shutdown = self.signals.shutdown.clone();
        run_periodic(MOTOR_PERIOD, &shutdown, || self.tick())
    }

    pub fn into_motor(self) -> Box<dyn MotorHal + Send> {
        self.motor
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        if self.signals.intent.snapshot().claw != ClawIntent::Active {
            return Ok(());
        }

        if self.claw_open {
            info!("closing claw");
            self.motor.send_command(MotorCommand::RunDirect {
                duty_cycle: -CLAW_POWER,
            })?;
            self.claw_open = false;
            thread::sleep(self.close_hold);
            self.motor
                .send_command(MotorCommand::RunDirect { duty_cycle: 0 })?;
            self.signals.claw_closed.raise();
        } else {
            info!("opening claw");
            self.motor
                .send_command(MotorCommand::RunToAbsPos { position: 0 })?;
            wait_for_motion_stop(self.motor.as_ref())?;
            self.motor
                .send_command(MotorCommand::RunDirect { duty_cycle: 0 })?;
            self.claw_open = true;
            self.signals.claw_closed.clear();
        }
        self.signals.intent.acknowledge_claw();
        Ok(())
    }
}
