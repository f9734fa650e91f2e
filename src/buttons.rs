//! The keypad sampler, highest-priority activity: every tick it turns the
//! five directional keys into a fresh Intent and latches shutdown on Back.

use std::time::Duration;

use log::info;

use crate::arm_hal::{ButtonSnapshot, ButtonsHal};
use crate::periodic::run_periodic;
use crate::signals::{ArmSignals, ClawIntent, ElevationIntent, Intent, RotationIntent};

pub const BUTTON_PERIOD: Duration = Duration::from_millis(180);

pub struct ButtonSampler {
    hal: Box<dyn ButtonsHal + Send>,
    signals: ArmSignals,
}

impl ButtonSampler {
    pub fn new(hal: Box<dyn ButtonsHal + Send>, signals: ArmSignals) -> Self {
        Self { hal, signals }
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        let shutdown = self.signals.shutdown.clone();
        run_periodic(BUTTON_PERIOD, &shutdown, || self.tick())
    }

    fn tick(&mut self) -> anyhow::Result<()> {
        let keys = self.hal.read()?;
        self.signals.intent.publish(intent_from(keys));
        if keys.back {
            info!("back pressed, shutting down");
            self.signals.shutdown.raise();
        }
        Ok(())
    }
}

/// Chorded opposite keys cancel to STOP so the user can kill a motion
/// without a particular release order.
fn intent_from(keys: ButtonSnapshot) -> Intent {
    let rotation = match (keys.left, keys.right) {
        (true, false) => RotationIntent::Left,
        (false, true) => RotationIntent::Right,
        _ => RotationIntent::Stop,
    };
    let elevation = match (keys.up, keys.down) {
        (true, false) => ElevationIntent::Rise,
        (false, true) => ElevationIntent::Lower,
        _ => ElevationIntent::Stop,
    };
    let claw = if keys.center {
        ClawIntent::Active
    } else {
        ClawIntent::Inactive
    };
    Intent {
        rotation,
        elevation,
        claw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm_hal_mock::MockButtons;

    fn sample(keys: ButtonSnapshot) -> (Intent, bool) {
        let buttons = MockButtons::new();
        buttons.press(keys);
        let signals = ArmSignals::new();
        let mut sampler = ButtonSampler::new(Box::new(buttons), signals.clone());
        sampler.tick().unwrap();
        (signals.intent.snapshot(), signals.shutdown.is_set())
    }

    #[test]
    fn single_keys_map_to_directions() {
        let (intent, _) = sample(ButtonSnapshot {
            left: true,
            up: true,
            ..Default::default()
        });
        assert_eq!(intent.rotation, RotationIntent::Left);
        assert_eq!(intent.elevation, ElevationIntent::Rise);
        assert_eq!(intent.claw, ClawIntent::Inactive);

        let (intent, _) = sample(ButtonSnapshot {
            right: true,
            down: true,
            center: true,
            ..Default::default()
        });
        assert_eq!(intent.rotation, RotationIntent::Right);
        assert_eq!(intent.elevation, ElevationIntent::Lower);
        assert_eq!(intent.claw, ClawIntent::Active);
    }

    #[test]
    fn chorded_opposites_cancel_to_stop() {
        let (intent, _) = sample(ButtonSnapshot {
            left: true,
            right: true,
            up: true,
            down: true,
            ..Default::default()
        });
        assert_eq!(intent.rotation, RotationIntent::Stop);
        assert_eq!(intent.elevation, ElevationIntent::Stop);
    }

    #[test]
    fn no_keys_means_all_stop() {
        let (intent, shutdown) = sample(ButtonSnapshot::default());
        assert_eq!(intent, Intent::default());
        assert!(!shutdown);
    }

    #[test]
    fn back_latches_shutdown() {
        let (_, shutdown) = sample(ButtonSnapshot {
            back: true,
            ..Default::default()
        });
        assert!(shutdown);
    }

    #[test]
    fn held_release_overwrites_previous_intent() {
        let buttons = MockButtons::new();
        buttons.press(ButtonSnapshot {
            left: true,
            ..Default::default()
        });
        buttons.press(ButtonSnapshot::default());
        let signals = ArmSignals::new();
        let mut sampler = ButtonSampler::new(Box::new(buttons), signals.clone());
        sampler.tick().unwrap();
        assert_eq!(signals.intent.snapshot().rotation, RotationIntent::Left);
        sampler.tick().unwrap();
        assert_eq!(signals.intent.snapshot().rotation, RotationIntent::Stop);
    }
}
