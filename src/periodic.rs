//! Periodic execution scaffolding: a drift-free ticker, the common activity
//! loop, and real-time thread spawning.

use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use log::warn;
use thread_priority::{
    RealtimeThreadSchedulePolicy, ThreadBuilder, ThreadPriority, ThreadPriorityValue,
    ThreadSchedulePolicy,
};

use crate::signals::SharedFlag;

/// SCHED_FIFO priority slots, expressed as offsets from the Linux FIFO
/// maximum of 99. Observation outranks actuation, actuation outranks
/// reporting.
pub mod rank {
    pub const BUTTONS: u8 = 94; // max - 5
    pub const COLOR_SENSOR: u8 = 89; // max - 10
    pub const TOUCH_SENSOR: u8 = 84; // max - 15
    pub const AXIS: u8 = 79; // max - 20
    pub const CLAW: u8 = 74; // max - 25
    pub const LEDS: u8 = 69; // max - 30
    pub const LCD: u8 = 64; // max - 35

    pub const CALIBRATE_ELEVATION: u8 = 94;
    pub const CALIBRATE_ROTATION: u8 = 89;
    pub const CALIBRATE_CLAW: u8 = 84;
}

/// Fixed-period pacing against the monotonic clock. Every deadline is
/// computed from the previous deadline, never from "now", so a late tick
/// does not push back the ones after it.
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now(),
        }
    }

    /// Sleeps until the next deadline. Returns immediately when the deadline
    /// has already passed.
    pub fn wait(&mut self) {
        self.next += self.period;
        let remaining = self.next.saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}

/// The loop every activity runs: tick, then sleep to the next deadline,
/// until the shutdown flag is observed. A tick error is fatal for the whole
/// program: the shutdown flag is raised so the other activities wind down,
/// and the error surfaces through the thread join.
pub fn run_periodic<F>(period: Duration, shutdown: &SharedFlag, mut tick: F) -> anyhow::Result<()>
where
    F: FnMut() -> anyhow::Result<()>,
{
    let mut ticker = Ticker::new(period);
    while !shutdown.is_set() {
        if let Err(err) = tick() {
            shutdown.raise();
            return Err(err);
        }
        ticker.wait();
    }
    Ok(())
}

/// Spawns a named thread under SCHED_FIFO at the given priority. Without RT
/// privileges the thread still starts at normal priority; worst-case latency
/// suffers but behavior does not.
pub fn spawn_rt<F, T>(name: &str, priority: u8, f: F) -> anyhow::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let value = ThreadPriorityValue::try_from(priority)
        .map_err(|err| anyhow!("invalid priority {priority} for thread '{name}': {err}"))?;
    let log_name = name.to_owned();
    let handle = ThreadBuilder::default()
        .name(name)
        .policy(ThreadSchedulePolicy::Realtime(
            RealtimeThreadSchedulePolicy::Fifo,
        ))
        .priority(ThreadPriority::Crossplatform(value))
        .spawn(move |applied| {
            if let Err(err) = applied {
                warn!("'{log_name}': real-time priority unavailable, running best-effort: {err:?}");
            }
            f()
        })?;
    Ok(handle)
}
