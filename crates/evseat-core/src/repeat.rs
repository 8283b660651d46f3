// Evseat Keyboard Repeat
// Seat-wide autorepeat with an initial delay and a steady interval

use serde::{Deserialize, Serialize};

use crate::event::KeyState;
use crate::input::DeviceId;
use crate::timer::{ms_to_us, SeatTimer, TimerId, TimerQueue};
use crate::Key;

/// Keyboard repeat configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatConfig {
    pub enabled: bool,
    /// Milliseconds before the first repeat
    pub delay_ms: u32,
    /// Milliseconds between repeats
    pub interval_ms: u32,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 250,
            interval_ms: 33,
        }
    }
}

/// The single repeat timer of a seat
#[derive(Debug, Default)]
pub struct RepeatScheduler {
    config: RepeatConfig,
    count: u32,
    key: Option<Key>,
    device: Option<DeviceId>,
    timer: Option<TimerId>,
}

impl RepeatScheduler {
    pub fn new(config: RepeatConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> RepeatConfig {
        self.config
    }

    /// Replace the configuration. A running repeat picks it up at its
    /// next rescheduling.
    pub fn set_config(&mut self, timers: &mut TimerQueue<SeatTimer>, config: RepeatConfig) {
        self.config = config;
        if !config.enabled {
            self.clear(timers);
        }
    }

    /// Update the schedule after a key event was emitted.
    ///
    /// Releases, disabled repeat and keys that do not repeat clear the
    /// timer. A fresh press restarts the count; the first event waits
    /// the delay, the second the interval, later ones leave the running
    /// timer alone.
    pub fn on_key(
        &mut self,
        timers: &mut TimerQueue<SeatTimer>,
        device: DeviceId,
        key: Key,
        state: KeyState,
        repeats: bool,
        time_us: u64,
    ) {
        if state == KeyState::Released || !self.config.enabled || !repeats {
            self.clear(timers);
            return;
        }

        if state == KeyState::Pressed {
            self.count = 0;
        }
        self.count += 1;
        self.key = Some(key);

        if self.count <= 2 {
            self.clear(timers);
            self.device = Some(device);

            let interval = if self.count == 1 {
                self.config.delay_ms
            } else {
                self.config.interval_ms
            };
            self.timer = Some(timers.schedule(time_us + ms_to_us(interval), SeatTimer::KeyRepeat));
        }
    }

    /// Stop repeating and drop the repeat device
    pub fn clear(&mut self, timers: &mut TimerQueue<SeatTimer>) {
        timers.cancel(&mut self.timer);
        self.device = None;
    }

    /// Claim a fired repeat timer. Returns the device and key to repeat,
    /// or `None` when the timer was not ours.
    pub fn fire(&mut self, id: TimerId) -> Option<(DeviceId, Key)> {
        if self.timer != Some(id) {
            return None;
        }
        self.timer = None;
        Some((self.device?, self.key?))
    }

    /// Re-arm after a fired repeat was re-dispatched, if the dispatch
    /// itself did not schedule or clear anything
    pub fn rearm(&mut self, timers: &mut TimerQueue<SeatTimer>, deadline_us: u64) {
        if self.timer.is_none() && self.device.is_some() {
            self.timer = Some(timers.schedule(
                deadline_us + ms_to_us(self.config.interval_ms),
                SeatTimer::KeyRepeat,
            ));
        }
    }

    pub fn device(&self) -> Option<DeviceId> {
        self.device
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_some()
    }
}
