// Evseat Device Backends - Scripted
// In-memory backend fed by hand, for replays and tests

use std::collections::VecDeque;
use std::os::unix::io::RawFd;

use super::{BackendResult, DeviceBackend, PressCounter};
use crate::event::raw::{DeviceDescription, DeviceHandle, RawEvent, RawEventKind};
use crate::modifier::Leds;
use crate::Key;

/// Backend whose events are queued by the caller.
///
/// Key and button helpers fill in the seat-wide count the way the
/// kernel backend does.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    queue: VecDeque<RawEvent>,
    counts: PressCounter,
    leds: Vec<Leds>,
    suspended: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw event as is
    pub fn push(&mut self, event: RawEvent) {
        self.queue.push_back(event);
    }

    pub fn add_device(&mut self, handle: u64, time_us: u64, desc: DeviceDescription) {
        self.push(RawEvent::new(
            DeviceHandle(handle),
            time_us,
            RawEventKind::DeviceAdded(desc),
        ));
    }

    pub fn remove_device(&mut self, handle: u64, time_us: u64) {
        self.push(RawEvent::new(
            DeviceHandle(handle),
            time_us,
            RawEventKind::DeviceRemoved,
        ));
    }

    pub fn key(&mut self, handle: u64, time_us: u64, key: Key, pressed: bool) {
        let seat_count = self.counts.update(key, pressed);
        self.push(RawEvent::new(
            DeviceHandle(handle),
            time_us,
            RawEventKind::Key {
                key,
                pressed,
                seat_count,
            },
        ));
    }

    /// Press and release a key `hold_us` apart
    pub fn tap_key(&mut self, handle: u64, time_us: u64, key: Key, hold_us: u64) {
        self.key(handle, time_us, key, true);
        self.key(handle, time_us + hold_us, key, false);
    }

    pub fn button(&mut self, handle: u64, time_us: u64, button: Key, pressed: bool) {
        let seat_count = self.counts.update(button, pressed);
        self.push(RawEvent::new(
            DeviceHandle(handle),
            time_us,
            RawEventKind::PointerButton {
                button,
                pressed,
                seat_count,
            },
        ));
    }

    pub fn motion(&mut self, handle: u64, time_us: u64, dx: f64, dy: f64) {
        self.push(RawEvent::new(
            DeviceHandle(handle),
            time_us,
            RawEventKind::PointerMotion {
                dx,
                dy,
                dx_unaccel: dx,
                dy_unaccel: dy,
            },
        ));
    }

    /// Events not yet handed out
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Every LED state pushed so far, oldest first
    pub fn leds(&self) -> &[Leds] {
        &self.leds
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}

impl DeviceBackend for ScriptedBackend {
    fn poll_fds(&self) -> Vec<RawFd> {
        Vec::new()
    }

    fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    fn dispatch(&mut self) -> BackendResult<Vec<RawEvent>> {
        Ok(self.queue.drain(..).collect())
    }

    fn update_leds(&mut self, leds: Leds) -> BackendResult<()> {
        self.leds.push(leds);
        Ok(())
    }

    fn suspend(&mut self) -> BackendResult<()> {
        self.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> BackendResult<()> {
        self.suspended = false;
        Ok(())
    }
}
