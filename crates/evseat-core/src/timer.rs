// Evseat Timers
// Seat-owned timer table polled from the dispatch loop

use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::input::DeviceId;
use crate::Key;

/// Microseconds per millisecond
pub const US_PER_MS: u64 = 1_000;

pub fn ms_to_us(ms: u32) -> u64 {
    u64::from(ms) * US_PER_MS
}

/// Source of monotonic microsecond timestamps
pub trait Clock: Send {
    fn now_us(&self) -> u64;
}

/// Wall clock anchored at construction
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock for replays and tests. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_us)),
        }
    }

    pub fn set(&self, now_us: u64) {
        self.now.store(now_us, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_us: u64) {
        self.now.fetch_add(delta_us, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Every timer a seat can arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatTimer {
    KeyRepeat,
    SlowKey { device: DeviceId, key: Key },
    BounceKeys { device: DeviceId },
    ToggleSlowKeys { device: DeviceId },
    MouseKeysMove { device: DeviceId },
    SecondaryClick,
    Dwell,
    DwellGesture,
    ClearDwellGesture,
    DwellPosition,
}

/// Table of pending timers keyed by id.
///
/// Firing order is by deadline, then by scheduling order.
#[derive(Debug)]
pub struct TimerQueue<K> {
    next_id: u64,
    timers: IndexMap<TimerId, (u64, K)>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            next_id: 1,
            timers: IndexMap::new(),
        }
    }
}

impl<K: Copy> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer
    pub fn schedule(&mut self, deadline_us: u64, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, (deadline_us, kind));
        id
    }

    /// Cancel the timer held in `slot`, if any, and clear the slot.
    /// Cancelling an empty slot is a no-op.
    pub fn cancel(&mut self, slot: &mut Option<TimerId>) {
        if let Some(id) = slot.take() {
            self.timers.shift_remove(&id);
        }
    }

    pub fn remove(&mut self, id: TimerId) -> Option<K> {
        self.timers.shift_remove(&id).map(|(_, kind)| kind)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn deadline(&self, id: TimerId) -> Option<u64> {
        self.timers.get(&id).map(|(deadline, _)| *deadline)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.values().map(|(deadline, _)| *deadline).min()
    }

    /// Remove and return the earliest timer due at or before `now_us`
    pub fn pop_due(&mut self, now_us: u64) -> Option<(TimerId, u64, K)> {
        let (index, _) = self
            .timers
            .values()
            .enumerate()
            .filter(|(_, (deadline, _))| *deadline <= now_us)
            .min_by_key(|(index, (deadline, _))| (*deadline, *index))?;
        let (id, (deadline, kind)) = self.timers.shift_remove_index(index)?;
        Some((id, deadline, kind))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}
