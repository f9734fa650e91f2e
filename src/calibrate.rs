//! One-shot startup calibration. Each motor is driven toward a physical
//! reference (touch switch, reflectance ceiling, or claw stall), backed off
//! by a fixed offset, and its encoder is zeroed there. The three motors
//! calibrate in parallel on their own real-time threads.

use std::thread::JoinHandle;

use anyhow::anyhow;
use log::info;

use crate::arm_hal::{
    wait_for_motion_stop, MotorCommand, MotorHal, ReflectanceSensorHal, TouchSensorHal,
};
use crate::axis::{
    ELEVATION_RECOVERY_UNITS, ELEVATION_UP_POWER, MOTOR_PERIOD, ROTATION_POWER,
    ROTATION_RECOVERY_UNITS,
};
use crate::claw::CLAW_POWER;
use crate::hal_factory::ArmDevices;
use crate::limits::REFLECTION_LIMIT;
use crate::periodic::{rank, spawn_rt, Ticker};

/// Back-off from the fully-closed claw to the open zero position.
pub const CLAW_INIT_UNITS: i32 = 90;

type MotorBox = Box<dyn MotorHal + Send>;

/// Runs all three calibrations in parallel and hands the devices back.
pub fn calibrate_all(devices: ArmDevices) -> anyhow::Result<ArmDevices> {
    let ArmDevices {
        rotation_motor,
        elevation_motor,
        claw_motor,
        color_sensor,
        touch_sensor,
        buttons,
        leds,
        display,
    } = devices;

    info!("calibrating all motors");
    let rotation = spawn_rt("calibrate-rotation", rank::CALIBRATE_ROTATION, move || {
        calibrate_rotation(rotation_motor, touch_sensor)
    })?;
    let elevation = spawn_rt(
        "calibrate-elevation",
        rank::CALIBRATE_ELEVATION,
        move || calibrate_elevation(elevation_motor, color_sensor),
    )?;
    let claw = spawn_rt("calibrate-claw", rank::CALIBRATE_CLAW, move || {
        calibrate_claw(claw_motor)
    })?;

    let (rotation_motor, touch_sensor) = join_calibration("rotation", rotation)?;
    let (elevation_motor, color_sensor) = join_calibration("elevation", elevation)?;
    let claw_motor = join_calibration("claw", claw)?;
    info!("calibration complete");

    Ok(ArmDevices {
        rotation_motor,
        elevation_motor,
        claw_motor,
        color_sensor,
        touch_sensor,
        buttons,
        leds,
        display,
    })
}

fn join_calibration<T>(name: &str, handle: JoinHandle<anyhow::Result<T>>) -> anyhow::Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("{name} calibration thread panicked"))?
}

/// Rotates clockwise until the end-of-travel switch closes, then backs off a
/// quarter turn and declares that spot zero.
pub fn calibrate_rotation(
    mut motor: MotorBox,
    mut touch: Box<dyn TouchSensorHal + Send>,
) -> anyhow::Result<(MotorBox, Box<dyn TouchSensorHal + Send>)> {
    motor.send_command(MotorCommand::RunDirect {
        duty_cycle: ROTATION_POWER,
    })?;
    let mut ticker = Ticker::new(MOTOR_PERIOD);
    loop {
        let pressed = touch.is_pressed()?;
        ticker.wait();
        if pressed {
            break;
        }
    }
    settle_at_zero(motor.as_mut(), ROTATION_RECOVERY_UNITS)?;
    Ok((motor, touch))
}

/// Raises the arm until the color sensor sees it, then lowers it back to the
/// working zero.
pub fn calibrate_elevation(
    mut motor: MotorBox,
    mut color: Box<dyn ReflectanceSensorHal + Send>,
) -> anyhow::Result<(MotorBox, Box<dyn ReflectanceSensorHal + Send>)> {
    motor.send_command(MotorCommand::RunDirect {
        duty_cycle: ELEVATION_UP_POWER,
    })?;
    let mut ticker = Ticker::new(MOTOR_PERIOD);
    loop {
        let reflection = color.reflected_light()?;
        ticker.wait();
        if reflection >= REFLECTION_LIMIT {
            break;
        }
    }
    settle_at_zero(motor.as_mut(), ELEVATION_RECOVERY_UNITS)?;
    Ok((motor, color))
}

/// Closes the claw until the motor stalls against itself, then opens it to
/// the zero position. Leaves the claw open.
pub fn calibrate_claw(mut motor: MotorBox) -> anyhow::Result<MotorBox> {
    motor.send_command(MotorCommand::RunDirect {
        duty_cycle: -CLAW_POWER,
    })?;
    let mut ticker = Ticker::new(MOTOR_PERIOD);
    loop {
        let limit = motor.is_running()? && motor.is_stalled()?;
        ticker.wait();
        if limit {
            break;
        }
    }
    settle_at_zero(motor.as_mut(), CLAW_INIT_UNITS)?;
    Ok(motor)
}

fn settle_at_zero(motor: &mut dyn MotorHal, offset: i32) -> anyhow::Result<()> {
    motor.send_command(MotorCommand::RunToRelPos { offset })?;
    wait_for_motion_stop(motor)?;
    motor.send_command(MotorCommand::RunDirect { duty_cycle: 0 })?;
    motor.set_position_zero()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm_hal_mock::{MockMotor, MockReflectanceSensor, MockTouchSensor};

    #[test]
    fn rotation_seeks_switch_then_backs_off() {
        let motor = MockMotor::new();
        let touch = MockTouchSensor::scripted([false, false, true], false);
        calibrate_rotation(Box::new(motor.clone()), Box::new(touch)).unwrap();

        assert_eq!(
            motor.commands(),
            vec![
                MotorCommand::RunDirect { duty_cycle: 30 },
                MotorCommand::RunToRelPos { offset: -350 },
                MotorCommand::RunDirect { duty_cycle: 0 },
            ]
        );
        assert_eq!(motor.state().position, 0);
    }

    #[test]
    fn elevation_seeks_reflection_ceiling() {
        let motor = MockMotor::new();
        let color = MockReflectanceSensor::scripted([3, 12, REFLECTION_LIMIT], 0);
        calibrate_elevation(Box::new(motor.clone()), Box::new(color)).unwrap();

        assert_eq!(
            motor.commands(),
            vec![
                MotorCommand::RunDirect { duty_cycle: -30 },
                MotorCommand::RunToRelPos { offset: 100 },
                MotorCommand::RunDirect { duty_cycle: 0 },
            ]
        );
        assert_eq!(motor.state().position, 0);
    }

    #[test]
    fn claw_closes_until_stall_then_opens() {
        let motor = MockMotor::new();
        motor.stall_after(2);
        calibrate_claw(Box::new(motor.clone())).unwrap();

        assert_eq!(
            motor.commands(),
            vec![
                MotorCommand::RunDirect { duty_cycle: -40 },
                MotorCommand::RunToRelPos { offset: 90 },
                MotorCommand::RunDirect { duty_cycle: 0 },
            ]
        );
        assert_eq!(motor.state().position, 0);
    }
}
