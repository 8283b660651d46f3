// Evseat Device Backends
// Sources of raw events: the kernel evdev backend and a scripted one

#[cfg(feature = "pure-rust")]
pub mod kernel;
pub mod scripted;

use std::os::unix::io::RawFd;

use crate::event::raw::RawEvent;
use crate::key::KEY_CNT;
use crate::modifier::Leds;
use crate::Key;

#[cfg(feature = "pure-rust")]
pub use kernel::{DeviceInfo, EvdevBackend, EvdevOptions};
pub use scripted::ScriptedBackend;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur in a device backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event device error: {0}")]
    Evdev(String),

    #[error("udev error: {0}")]
    Udev(String),
}

/// A producer of raw input events.
///
/// The dispatch loop polls `poll_fds` for readability and then calls
/// `dispatch`, which returns every event the backend has ready.
pub trait DeviceBackend {
    /// File descriptors to wait on. Empty for backends that never block.
    fn poll_fds(&self) -> Vec<RawFd>;

    /// Events are ready without waiting on a descriptor
    fn has_pending(&self) -> bool {
        false
    }

    /// Drain everything ready, in order
    fn dispatch(&mut self) -> BackendResult<Vec<RawEvent>>;

    /// Push lock LED state to every keyboard
    fn update_leds(&mut self, leds: Leds) -> BackendResult<()>;

    /// Stop reading devices (VT switch away)
    fn suspend(&mut self) -> BackendResult<()>;

    /// Start reading devices again
    fn resume(&mut self) -> BackendResult<()>;
}

/// Seat-wide press counts across every device a backend reads.
///
/// The count reported with an event is the number of devices holding
/// the code after the event was applied.
#[derive(Debug, Clone)]
pub struct PressCounter {
    counts: Vec<u32>,
}

impl Default for PressCounter {
    fn default() -> Self {
        Self {
            counts: vec![0; KEY_CNT],
        }
    }
}

impl PressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, code: Key, pressed: bool) -> u32 {
        let Some(count) = self.counts.get_mut(usize::from(code.0)) else {
            return u32::from(pressed);
        };
        if pressed {
            *count += 1;
        } else {
            *count = count.saturating_sub(1);
        }
        *count
    }

    pub fn count(&self, code: Key) -> u32 {
        self.counts.get(usize::from(code.0)).copied().unwrap_or(0)
    }

    /// Forget a device's held codes when it goes away
    pub fn release_all(&mut self, held: impl IntoIterator<Item = Key>) {
        for code in held {
            self.update(code, false);
        }
    }

    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }
}
