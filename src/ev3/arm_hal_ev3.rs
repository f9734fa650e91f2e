use anyhow::Context;
use ev3dev_lang_rust::motors::{MotorPort, TachoMotor};
use ev3dev_lang_rust::sensors::{ColorSensor, Sensor, SensorPort, TouchSensor};
use log::debug;

use crate::arm_hal::{
    HalError, MotorCommand, MotorHal, ReflectanceSensorHal, TouchSensorHal,
};

/// One ev3dev tacho motor. Stop action and step speed are fixed here so the
/// positioned recovery moves always run at the axis speed.
pub struct Ev3Motor {
    motor: TachoMotor,
    label: &'static str,
}

impl Ev3Motor {
    pub fn new(port: MotorPort, label: &'static str, step_speed_pct: i32) -> anyhow::Result<Self> {
        let motor = TachoMotor::get(port)
            .map_err(|err| HalError::DeviceNotConnected(format!("{label} motor: {err}")))?;
        motor.reset()?;
        motor.set_stop_action(TachoMotor::STOP_ACTION_HOLD)?;
        let step_speed = motor.get_max_speed()? * step_speed_pct / 100;
        motor
            .set_speed_sp(step_speed)
            .with_context(|| format!("setting {label} step speed to {step_speed} deg/s"))?;
        Ok(Self { motor, label })
    }
}

impl MotorHal for Ev3Motor {
    fn send_command(&mut self, command: MotorCommand) -> anyhow::Result<()> {
        debug!("{} motor: {command:?}", self.label);
        match command {
            MotorCommand::RunDirect { duty_cycle } => {
                self.motor.set_duty_cycle_sp(duty_cycle)?;
                self.motor.run_direct()?;
            }
            MotorCommand::RunToRelPos { offset } => {
                self.motor.set_position_sp(offset)?;
                self.motor.run_to_rel_pos(None)?;
            }
            MotorCommand::RunToAbsPos { position } => {
                self.motor.set_position_sp(position)?;
                self.motor.run_to_abs_pos(None)?;
            }
            MotorCommand::Stop => self.motor.stop()?,
        }
        Ok(())
    }

    fn position(&self) -> anyhow::Result<i32> {
        Ok(self.motor.get_position()?)
    }

    fn set_position_zero(&mut self) -> anyhow::Result<()> {
        Ok(self.motor.set_position(0)?)
    }

    fn is_running(&self) -> anyhow::Result<bool> {
        Ok(self.motor.is_running()?)
    }

    fn is_stalled(&self) -> anyhow::Result<bool> {
        let state = self.motor.get_state()?;
        Ok(state.iter().any(|s| s == TachoMotor::STATE_STALLED))
    }

    fn reset(&mut self) -> anyhow::Result<()> {
        Ok(self.motor.reset()?)
    }
}

pub struct Ev3ReflectanceSensor {
    sensor: ColorSensor,
}

impl Ev3ReflectanceSensor {
    pub fn new(port: SensorPort) -> anyhow::Result<Self> {
        let sensor = ColorSensor::get(port)
            .map_err(|err| HalError::DeviceNotConnected(format!("color sensor: {err}")))?;
        sensor.set_mode_col_reflect()?;
        Ok(Self { sensor })
    }
}

impl ReflectanceSensorHal for Ev3ReflectanceSensor {
    fn reflected_light(&mut self) -> anyhow::Result<i32> {
        Ok(self.sensor.get_value0()?)
    }
}

pub struct Ev3TouchSensor {
    sensor: TouchSensor,
}

impl Ev3TouchSensor {
    pub fn new(port: SensorPort) -> anyhow::Result<Self> {
        let sensor = TouchSensor::get(port)
            .map_err(|err| HalError::DeviceNotConnected(format!("touch sensor: {err}")))?;
        Ok(Self { sensor })
    }
}

impl TouchSensorHal for Ev3TouchSensor {
    fn is_pressed(&mut self) -> anyhow::Result<bool> {
        Ok(self.sensor.get_pressed_state()?)
    }
}
