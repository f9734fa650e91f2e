//! Wires the calibrated devices into the eight periodic activities, waits
//! for them all to wind down, and parks the arm.

use std::thread::JoinHandle;

use anyhow::{anyhow, Context};
use log::{error, info};

use crate::arm_hal::{wait_for_motion_stop, LedColor, MotorCommand, MotorHal};
use crate::axis::AxisController;
use crate::buttons::ButtonSampler;
use crate::claw::ClawController;
use crate::display::LcdReporter;
use crate::hal_factory::ArmDevices;
use crate::leds::LedReporter;
use crate::limits::{ClockwiseLimitSampler, TopLimitSampler};
use crate::periodic::{rank, spawn_rt};
use crate::signals::ArmSignals;

/// Runs the arm until the user backs out (or a device fails). Motors come
/// back out of their controllers when the activities exit so the arm can be
/// parked at zero.
pub fn run(devices: ArmDevices) -> anyhow::Result<()> {
    let ArmDevices {
        rotation_motor,
        elevation_motor,
        claw_motor,
        color_sensor,
        touch_sensor,
        buttons,
        mut leds,
        display,
    } = devices;

    // Normal-operation green before the reporter starts watching for edges.
    leds.set_both(LedColor::Green)?;

    let signals = ArmSignals::new();
    info!("starting activities");

    let buttons_task = {
        let sampler = ButtonSampler::new(buttons, signals.clone());
        spawn_rt("buttons", rank::BUTTONS, move || sampler.run())?
    };
    let color_task = {
        let sampler = TopLimitSampler::new(color_sensor, signals.clone());
        spawn_rt("color-sensor", rank::COLOR_SENSOR, move || sampler.run())?
    };
    let touch_task = {
        let sampler = ClockwiseLimitSampler::new(touch_sensor, signals.clone());
        spawn_rt("touch-sensor", rank::TOUCH_SENSOR, move || sampler.run())?
    };
    let rotation_task = {
        let mut controller = AxisController::rotation(rotation_motor, &signals);
        spawn_rt("rotation", rank::AXIS, move || {
            let result = controller.run_loop();
            (controller.into_motor(), result)
        })?
    };
    let elevation_task = {
        let mut controller = AxisController::elevation(elevation_motor, &signals);
        spawn_rt("elevation", rank::AXIS, move || {
            let result = controller.run_loop();
            (controller.into_motor(), result)
        })?
    };
    let claw_task = {
        let mut controller = ClawController::new(claw_motor, &signals);
        spawn_rt("claw", rank::CLAW, move || {
            let result = controller.run_loop();
            (controller.into_motor(), result)
        })?
    };
    let leds_task = {
        let reporter = LedReporter::new(leds, signals.clone());
        spawn_rt("leds", rank::LEDS, move || reporter.run())?
    };
    let display_task = {
        let reporter = LcdReporter::new(display, signals.clone());
        spawn_rt("lcd", rank::LCD, move || reporter.run())?
    };

    let mut first_failure: Option<anyhow::Error> = None;
    let mut record = |name: &'static str, result: anyhow::Result<()>| {
        if let Err(err) = result {
            error!("'{name}' activity failed: {err:#}");
            if first_failure.is_none() {
                first_failure = Some(err);
            }
        }
    };

    record("buttons", join_task("buttons", buttons_task)?);
    record("color-sensor", join_task("color-sensor", color_task)?);
    record("touch-sensor", join_task("touch-sensor", touch_task)?);
    let (mut rotation_motor, result) = join_task("rotation", rotation_task)?;
    record("rotation", result);
    let (mut elevation_motor, result) = join_task("elevation", elevation_task)?;
    record("elevation", result);
    let (mut claw_motor, result) = join_task("claw", claw_task)?;
    record("claw", result);
    record("leds", join_task("leds", leds_task)?);
    record("lcd", join_task("lcd", display_task)?);
    drop(record);

    if let Some(err) = first_failure {
        return Err(err);
    }

    info!("parking motors");
    park_motor(rotation_motor.as_mut()).context("parking rotation motor")?;
    park_motor(elevation_motor.as_mut()).context("parking elevation motor")?;
    park_motor(claw_motor.as_mut()).context("parking claw motor")?;
    info!("shutdown complete");
    Ok(())
}

fn join_task<T>(name: &'static str, handle: JoinHandle<T>) -> anyhow::Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("'{name}' thread panicked"))
}

fn park_motor(motor: &mut dyn MotorHal) -> anyhow::Result<()> {
    motor.send_command(MotorCommand::RunToAbsPos { position: 0 })?;
    wait_for_motion_stop(motor)?;
    motor.reset()?;
    Ok(())
}
