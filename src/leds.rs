//! Correction indicator: both brick LEDs go red while any axis is running a
//! recovery move, green otherwise. Writes only on transitions; the LEDs are
//! already green before this activity starts.

use std::time::Duration;

use crate::arm_hal::{LedColor, LedsHal};
use crate::periodic::run_periodic;
use crate::signals::ArmSignals;

pub const LED_PERIOD: Duration = Duration::from_millis(40);

pub struct LedReporter {
    hal: Box<dyn LedsHal + Send>,
    signals: ArmSignals,
    previous: bool,
}

impl LedReporter {
    pub fn new(hal: Box<dyn LedsHal + Send>, signals: ArmSignals) -> Self {
        Self {
            hal,
            signals,
            previous: false,
        }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        let shutdown = self.signals.shutdown.clone();
        run_periodic(LED_PERIOD, &shutdown, || self.tick())
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        let correcting = self.signals.correction.is_set();
        if correcting && !self.previous {
            self.hal.set_both(LedColor::Red)?;
            self.previous = true;
        } else if !correcting && self.previous {
            self.hal.set_both(LedColor::Green)?;
            self.previous = false;
        }
        Ok(())
    }
}
