//! Scriptable stand-ins for every HAL trait. Each mock keeps its state
//! behind a shared handle so a test (or the demo factory) can keep a clone
//! for scripting and inspection after the activity takes ownership of the
//! boxed trait object.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::arm_hal::{
    ButtonSnapshot, ButtonsHal, DisplayHal, LedColor, LedsHal, MotorCommand, MotorHal,
    ReflectanceSensorHal, TouchSensorHal,
};

const MOCK_DISPLAY_WIDTH: i32 = 178;
const MOCK_DISPLAY_HEIGHT: i32 = 128;

#[derive(Debug, Default)]
pub struct MockMotorState {
    pub commands: Vec<MotorCommand>,
    pub position: i32,
    pub duty_cycle: i32,
    /// Remaining `is_running()` polls reporting true for the current
    /// positioned move.
    pub running_polls: u32,
    /// How long each positioned move reports RUNNING before it completes.
    pub move_polls: u32,
    /// When set, `is_stalled()` flips true after this many polls.
    pub stall_after_polls: Option<u32>,
}

/// A motor that records every command and simulates just enough motion for
/// the controllers: positioned moves land instantly (or after a configured
/// number of RUNNING polls) and direct drive holds its duty cycle until
/// replaced.
#[derive(Clone, Default)]
pub struct MockMotor {
    inner: Arc<Mutex<MockMotorState>>,
}

impl MockMotor {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockMotorState> {
        self.inner.lock().unwrap()
    }

    pub fn commands(&self) -> Vec<MotorCommand> {
        self.state().commands.clone()
    }

    pub fn set_position(&self, position: i32) {
        self.state().position = position;
    }

    pub fn set_move_polls(&self, polls: u32) {
        self.state().move_polls = polls;
    }

    pub fn stall_after(&self, polls: u32) {
        self.state().stall_after_polls = Some(polls);
    }
}

impl MotorHal for MockMotor {
    fn send_command(&mut self, command: MotorCommand) -> anyhow::Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.commands.push(command);
        match command {
            MotorCommand::RunDirect { duty_cycle } => state.duty_cycle = duty_cycle,
            MotorCommand::RunToRelPos { offset } => {
                state.position += offset;
                state.running_polls = state.move_polls;
                state.duty_cycle = 0;
            }
            MotorCommand::RunToAbsPos { position } => {
                state.position = position;
                state.running_polls = state.move_polls;
                state.duty_cycle = 0;
            }
            MotorCommand::Stop => {
                state.duty_cycle = 0;
                state.running_polls = 0;
            }
        }
        Ok(())
    }

    fn position(&self) -> anyhow::Result<i32> {
        Ok(self.inner.lock().unwrap().position)
    }

    fn set_position_zero(&mut self) -> anyhow::Result<()> {
        self.inner.lock().unwrap().position = 0;
        Ok(())
    }

    fn is_running(&self) -> anyhow::Result<bool> {
        let mut state = self.inner.lock().unwrap();
        if state.running_polls > 0 {
            state.running_polls -= 1;
            return Ok(true);
        }
        Ok(state.duty_cycle != 0)
    }

    fn is_stalled(&self) -> anyhow::Result<bool> {
        let mut state = self.inner.lock().unwrap();
        match state.stall_after_polls {
            Some(0) => Ok(true),
            Some(polls) => {
                state.stall_after_polls = Some(polls - 1);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn reset(&mut self) -> anyhow::Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.position = 0;
        state.duty_cycle = 0;
        state.running_polls = 0;
        Ok(())
    }
}

/// Buttons that replay a scripted sequence of snapshots, then report all
/// keys released once the script runs out.
#[derive(Clone, Default)]
pub struct MockButtons {
    inner: Arc<Mutex<VecDeque<ButtonSnapshot>>>,
}

impl MockButtons {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn script<I>(&self, snapshots: I)
    where
        I: IntoIterator<Item = ButtonSnapshot>,
    {
        self.inner.lock().unwrap().extend(snapshots);
    }

    pub fn press(&self, snapshot: ButtonSnapshot) {
        self.inner.lock().unwrap().push_back(snapshot);
    }
}

impl ButtonsHal for MockButtons {
    fn read(&mut self) -> anyhow::Result<ButtonSnapshot> {
        Ok(self.inner.lock().unwrap().pop_front().unwrap_or_default())
    }
}

struct Script<T> {
    queue: VecDeque<T>,
    fallback: T,
}

impl<T: Copy> Script<T> {
    fn next(&mut self) -> T {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

#[derive(Clone)]
pub struct MockReflectanceSensor {
    inner: Arc<Mutex<Script<i32>>>,
}

impl MockReflectanceSensor {
    pub fn steady(value: i32) -> Self {
        Self::scripted([], value)
    }

    pub fn scripted<I>(values: I, fallback: i32) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        Self {
            inner: Arc::new(Mutex::new(Script {
                queue: values.into_iter().collect(),
                fallback,
            })),
        }
    }

    pub fn push(&self, value: i32) {
        self.inner.lock().unwrap().queue.push_back(value);
    }
}

impl ReflectanceSensorHal for MockReflectanceSensor {
    fn reflected_light(&mut self) -> anyhow::Result<i32> {
        Ok(self.inner.lock().unwrap().next())
    }
}

#[derive(Clone)]
pub struct MockTouchSensor {
    inner: Arc<Mutex<Script<bool>>>,
}

impl MockTouchSensor {
    pub fn steady(pressed: bool) -> Self {
        Self::scripted([], pressed)
    }

    pub fn scripted<I>(values: I, fallback: bool) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self {
            inner: Arc::new(Mutex::new(Script {
                queue: values.into_iter().collect(),
                fallback,
            })),
        }
    }

    pub fn push(&self, pressed: bool) {
        self.inner.lock().unwrap().queue.push_back(pressed);
    }
}

impl TouchSensorHal for MockTouchSensor {
    fn is_pressed(&mut self) -> anyhow::Result<bool> {
        Ok(self.inner.lock().unwrap().next())
    }
}

#[derive(Clone, Default)]
pub struct MockLeds {
    history: Arc<Mutex<Vec<LedColor>>>,
}

impl MockLeds {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn history(&self) -> Vec<LedColor> {
        self.history.lock().unwrap().clone()
    }
}

impl LedsHal for MockLeds {
    fn set_both(&mut self, color: LedColor) -> anyhow::Result<()> {
        self.history.lock().unwrap().push(color);
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DisplayOp {
    Clear,
    Text { x: i32, y: i32, text: String },
    Circle { x: i32, y: i32, radius: i32, filled: bool },
    Render,
}

#[derive(Clone, Default)]
pub struct MockDisplay {
    ops: Arc<Mutex<Vec<DisplayOp>>>,
}

impl MockDisplay {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn ops(&self) -> Vec<DisplayOp> {
        self.ops.lock().unwrap().clone()
    }
}

impl DisplayHal for MockDisplay {
    fn clear(&mut self) {
        self.ops.lock().unwrap().push(DisplayOp::Clear);
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        self.ops.lock().unwrap().push(DisplayOp::Text {
            x,
            y,
            text: text.to_owned(),
        });
    }

    fn draw_circle(&mut self, x: i32, y: i32, radius: i32, filled: bool) {
        self.ops.lock().unwrap().push(DisplayOp::Circle {
            x,
            y,
            radius,
            filled,
        });
    }

    fn dimensions(&self) -> (i32, i32) {
        (MOCK_DISPLAY_WIDTH, MOCK_DISPLAY_HEIGHT)
    }

    fn render(&mut self) -> anyhow::Result<()> {
        self.ops.lock().unwrap().push(DisplayOp::Render);
        Ok(())
    }
}
