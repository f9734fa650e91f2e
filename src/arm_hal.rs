use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Pause after issuing a positioned command, giving the motor driver time to
/// flip its RUNNING bit before we start polling it.
pub const SETTLE_DELAY: Duration = Duration::from_millis(2);

/// Poll interval while waiting for a positioned move to finish.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Error, Debug)]
pub enum HalError {
    #[error("device not connected: {0}")]
    DeviceNotConnected(String),
    #[error("{0}")]
    InternalError(String),
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum MotorCommand {
    RunDirect { duty_cycle: i32 },
    RunToRelPos { offset: i32 },
    RunToAbsPos { position: i32 },
    Stop,
}

/// One tacho motor as the controllers see it. Implementations fix the stop
/// action (`hold`) and the axis step speed at construction; positioned
/// commands reuse them.
pub trait MotorHal {
    fn send_command(&mut self, command: MotorCommand) -> anyhow::Result<()>;
    fn position(&self) -> anyhow::Result<i32>;
    /// Redefines the current encoder position as zero.
    fn set_position_zero(&mut self) -> anyhow::Result<()>;
    fn is_running(&self) -> anyhow::Result<bool>;
    fn is_stalled(&self) -> anyhow::Result<bool>;
    fn reset(&mut self) -> anyhow::Result<()>;
}

pub trait ReflectanceSensorHal {
    fn reflected_light(&mut self) -> anyhow::Result<i32>;
}

pub trait TouchSensorHal {
    fn is_pressed(&mut self) -> anyhow::Result<bool>;
}

#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct ButtonSnapshot {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub center: bool,
    pub back: bool,
}

pub trait ButtonsHal {
    fn read(&mut self) -> anyhow::Result<ButtonSnapshot>;
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum LedColor {
    Green,
    Red,
}

pub trait LedsHal {
    /// Full intensity on the named channel of both brick LEDs, zero on the
    /// other channel.
    fn set_both(&mut self, color: LedColor) -> anyhow::Result<()>;
}

pub trait DisplayHal {
    fn clear(&mut self);
    fn draw_text(&mut self, x: i32, y: i32, text: &str);
    fn draw_circle(&mut self, x: i32, y: i32, radius: i32, filled: bool);
    fn dimensions(&self) -> (i32, i32);
    /// Pushes the composed frame to the device.
    fn render(&mut self) -> anyhow::Result<()>;
}

/// Blocks until a positioned move reports not-RUNNING: a short settle sleep
/// so the driver registers the move, then a fine-grained poll of the state
/// bit.
pub fn wait_for_motion_stop(motor: &dyn MotorHal) -> anyhow::Result<()> {
    thread::sleep(SETTLE_DELAY);
    while motor.is_running()? {
        thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}
