//! Interactive controller for the LEGO robotic arm: calibrates the three
//! motors against their physical references, then drives them from the brick
//! keypad until Back is pressed, honoring the travel limits the hardware
//! cannot enforce on its own.

use clap::Parser;

use ev3_robot_arm::calibrate::calibrate_all;
use ev3_robot_arm::hal_factory::ArmHalFactory;
use ev3_robot_arm::runner;

#[derive(Parser, Debug)]
#[clap(name = "arm")]
struct Opts {
    /// Use mock hardware even when real motors are present.
    #[clap(long)]
    fake_hw: bool,

    /// Calibrate the motors and exit.
    #[clap(long)]
    calibrate_only: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts: Opts = Opts::parse();

    let devices = ArmHalFactory::new_maybe_mock(opts.fake_hw).create_devices()?;
    let devices = calibrate_all(devices)?;
    if opts.calibrate_only {
        return Ok(());
    }
    runner::run(devices)
}
