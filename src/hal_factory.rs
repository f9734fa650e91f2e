use std::path::Path;

use ev3dev_lang_rust::motors::MotorPort;
use ev3dev_lang_rust::sensors::SensorPort;
use log::info;

use crate::arm_hal::{
    ButtonSnapshot, ButtonsHal, DisplayHal, LedsHal, MotorHal, ReflectanceSensorHal,
    TouchSensorHal,
};
use crate::arm_hal_mock::{
    MockButtons, MockDisplay, MockLeds, MockMotor, MockReflectanceSensor, MockTouchSensor,
};
use crate::ev3::arm_hal_ev3::{Ev3Motor, Ev3ReflectanceSensor, Ev3TouchSensor};
use crate::ev3::brick_ui_ev3::{Ev3Buttons, Ev3Display, Ev3Leds};
use crate::limits::REFLECTION_LIMIT;

/// Everything the program talks to, one boxed HAL per device. Motors travel
/// into their controllers and come back out for parking; the rest stay with
/// their single consumer for the whole run.
pub struct ArmDevices {
    pub rotation_motor: Box<dyn MotorHal + Send>,
    pub elevation_motor: Box<dyn MotorHal + Send>,
    pub claw_motor: Box<dyn MotorHal + Send>,
    pub color_sensor: Box<dyn ReflectanceSensorHal + Send>,
    pub touch_sensor: Box<dyn TouchSensorHal + Send>,
    pub buttons: Box<dyn ButtonsHal + Send>,
    pub leds: Box<dyn LedsHal + Send>,
    pub display: Box<dyn DisplayHal + Send>,
}

#[derive(Default)]
pub struct ArmHalFactory {
    force_mock: bool,
}

impl ArmHalFactory {
    const ROTATION_PORT: MotorPort = MotorPort::OutC;
    const ELEVATION_PORT: MotorPort = MotorPort::OutB;
    const CLAW_PORT: MotorPort = MotorPort::OutA;
    const COLOR_PORT: SensorPort = SensorPort::In1;
    const TOUCH_PORT: SensorPort = SensorPort::In2;

    // Positioned-move speeds, percent of each motor's max_speed.
    const STEP_ROTATION_SPEED: i32 = 40;
    const STEP_ELEVATION_SPEED: i32 = 20;
    const STEP_CLAW_SPEED: i32 = 40;

    pub fn new() -> Self {
        Default::default()
    }

    pub fn new_maybe_mock(force_mock: bool) -> Self {
        Self { force_mock }
    }

    pub fn create_devices(&self) -> anyhow::Result<ArmDevices> {
        if !self.force_mock && Path::new("/sys/class/tacho-motor").exists() {
            Ok(ArmDevices {
                rotation_motor: Box::new(Ev3Motor::new(
                    ArmHalFactory::ROTATION_PORT,
                    "rotation",
                    ArmHalFactory::STEP_ROTATION_SPEED,
                )?),
                elevation_motor: Box::new(Ev3Motor::new(
                    ArmHalFactory::ELEVATION_PORT,
                    "elevation",
                    ArmHalFactory::STEP_ELEVATION_SPEED,
                )?),
                claw_motor: Box::new(Ev3Motor::new(
                    ArmHalFactory::CLAW_PORT,
                    "claw",
                    ArmHalFactory::STEP_CLAW_SPEED,
                )?),
                color_sensor: Box::new(Ev3ReflectanceSensor::new(ArmHalFactory::COLOR_PORT)?),
                touch_sensor: Box::new(Ev3TouchSensor::new(ArmHalFactory::TOUCH_PORT)?),
                buttons: Box::new(Ev3Buttons::new()?),
                leds: Box::new(Ev3Leds::new()?),
                display: Box::new(Ev3Display::new()?),
            })
        } else {
            info!("no tacho motors found (or mock forced), using fake hardware");
            Ok(mock_devices())
        }
    }
}

/// A self-driving mock set: calibration limits trip after a few samples and
/// the "user" runs a short tour ending with Back, so `--fake-hw` exercises
/// the whole lifecycle unattended.
fn mock_devices() -> ArmDevices {
    let claw_motor = MockMotor::new();
    claw_motor.stall_after(2);

    let buttons = MockButtons::new();
    let right = ButtonSnapshot {
        right: true,
        ..Default::default()
    };
    let up = ButtonSnapshot {
        up: true,
        ..Default::default()
    };
    let center = ButtonSnapshot {
        center: true,
        ..Default::default()
    };
    let back = ButtonSnapshot {
        back: true,
        ..Default::default()
    };
    buttons.script([
        right,
        right,
        ButtonSnapshot::default(),
        up,
        up,
        ButtonSnapshot::default(),
        center,
        ButtonSnapshot::default(),
        center,
        ButtonSnapshot::default(),
        back,
    ]);

    ArmDevices {
        rotation_motor: Box::new(MockMotor::new()),
        elevation_motor: Box::new(MockMotor::new()),
        claw_motor: Box::new(claw_motor),
        color_sensor: Box::new(MockReflectanceSensor::scripted(
            [5, 10, REFLECTION_LIMIT + 5],
            5,
        )),
        touch_sensor: Box::new(MockTouchSensor::scripted([false, false, true], false)),
        buttons: Box::new(buttons),
        leds: Box::new(MockLeds::new()),
        display: Box::new(MockDisplay::new()),
    }
}
