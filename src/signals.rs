//! The shared observables connecting samplers to controllers and reporters.
//!
//! Each observable is one record behind its own mutex; no activity ever holds
//! two at once, and none is held across a sleep or a device command.

use std::sync::{Arc, Mutex};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum RotationIntent {
    Left,
    Right,
    Stop,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ElevationIntent {
    Rise,
    Lower,
    Stop,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ClawIntent {
    Active,
    Inactive,
}

/// The most recent desired action triple, as published by the button sampler.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Intent {
    pub rotation: RotationIntent,
    pub elevation: ElevationIntent,
    pub claw: ClawIntent,
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            rotation: RotationIntent::Stop,
            elevation: ElevationIntent::Stop,
            claw: ClawIntent::Inactive,
        }
    }
}

/// Single-slot intent cell. The newest sample overwrites the previous one;
/// all three fields change under one lock acquisition.
#[derive(Clone, Default)]
pub struct IntentCell {
    inner: Arc<Mutex<Intent>>,
}

impl IntentCell {
    pub fn publish(&self, intent: Intent) {
        *self.inner.lock().unwrap() = intent;
    }

    pub fn snapshot(&self) -> Intent {
        *self.inner.lock().unwrap()
    }

    /// Consumer acknowledgement from the claw controller: a toggle has been
    /// performed, so the claw field drops back to Inactive until the sampler
    /// raises it again.
    pub fn acknowledge_claw(&self) {
        self.inner.lock().unwrap().claw = ClawIntent::Inactive;
    }
}

/// A boolean observable with one writer side and any number of readers.
#[derive(Clone, Default)]
pub struct SharedFlag {
    inner: Arc<Mutex<bool>>,
}

impl SharedFlag {
    pub fn raise(&self) {
        *self.inner.lock().unwrap() = true;
    }

    pub fn clear(&self) {
        *self.inner.lock().unwrap() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.inner.lock().unwrap()
    }
}

/// The full observable set, created once in `runner` before any activity
/// starts and cloned into each of them.
#[derive(Clone, Default)]
pub struct ArmSignals {
    pub intent: IntentCell,
    /// Raised by the color sampler, cleared by the elevation controller.
    pub top_limit: SharedFlag,
    /// Raised by the touch sampler, cleared by the rotation controller.
    pub clockwise_limit: SharedFlag,
    /// True while an axis controller is inside a recovery move.
    pub correction: SharedFlag,
    /// True while the claw is gripping.
    pub claw_closed: SharedFlag,
    /// Latching termination signal: Back button or a fatal device error.
    pub shutdown: SharedFlag,
}

impl ArmSignals {
    pub fn new() -> Self {
        Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_defaults_to_all_stop() {
        let cell = IntentCell::default();
        assert_eq!(cell.snapshot(), Intent::default());
        assert_eq!(cell.snapshot().rotation, RotationIntent::Stop);
        assert_eq!(cell.snapshot().claw, ClawIntent::Inactive);
    }

    #[test]
    fn newest_intent_overwrites() {
        let cell = IntentCell::default();
        cell.publish(Intent {
            rotation: RotationIntent::Left,
            elevation: ElevationIntent::Rise,
            claw: ClawIntent::Active,
        });
        cell.publish(Intent {
            rotation: RotationIntent::Right,
            ..Default::default()
        });
        assert_eq!(cell.snapshot().rotation, RotationIntent::Right);
        assert_eq!(cell.snapshot().claw, ClawIntent::Inactive);
    }

    #[test]
    fn claw_acknowledge_clears_only_claw() {
        let cell = IntentCell::default();
        cell.publish(Intent {
            rotation: RotationIntent::Left,
            elevation: ElevationIntent::Lower,
            claw: ClawIntent::Active,
        });
        cell.acknowledge_claw();
        let intent = cell.snapshot();
        assert_eq!(intent.claw, ClawIntent::Inactive);
        assert_eq!(intent.rotation, RotationIntent::Left);
        assert_eq!(intent.elevation, ElevationIntent::Lower);
    }

    #[test]
    fn flag_raise_and_clear() {
        let flag = SharedFlag::default();
        assert!(!flag.is_set());
        flag.raise();
        flag.raise();
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }
}
