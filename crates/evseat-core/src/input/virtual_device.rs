// Evseat Input Layer - Virtual Devices
// Press bookkeeping for seat-created injection devices

use std::collections::BTreeMap;

use crate::key::CodeKind;
use crate::Key;

/// Result type for virtual device operations
pub type VirtualDeviceResult<T> = Result<T, VirtualDeviceError>;

/// Errors returned by the injection API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualDeviceError {
    #[error("Unknown virtual device: {0}")]
    UnknownDevice(String),

    #[error("Code {0:#x} cannot be emitted as a {1}")]
    InvalidCode(u16, &'static str),

    #[error("No evdev code for button {0}")]
    InvalidButton(u32),

    #[error("{0} is already {1}")]
    Unbalanced(Key, &'static str),
}

/// Translate a stage button number (1 primary, 2 middle, 3 secondary,
/// 8 and up extra buttons) into the evdev code a virtual device emits.
/// Button 0 and numbers past the evdev code range have no code.
pub fn button_to_evdev(button: u32) -> VirtualDeviceResult<Key> {
    match button {
        0 => Err(VirtualDeviceError::InvalidButton(button)),
        1 => Ok(Key::BTN_LEFT),
        2 => Ok(Key::BTN_MIDDLE),
        3 => Ok(Key::BTN_RIGHT),
        n => n
            .checked_add(u32::from(Key::BTN_LEFT.0) - 1 - 4)
            .and_then(|code| u16::try_from(code).ok())
            .map(Key)
            .ok_or(VirtualDeviceError::InvalidButton(button)),
    }
}

/// Per-code press counters of a virtual device.
///
/// Each counter must stay in `0..=1`; a press of an already pressed code
/// or a release of a released one is refused and the counter left as it
/// was.
#[derive(Debug, Clone, Default)]
pub struct VirtualInputDevice {
    counts: BTreeMap<u16, i32>,
}

impl VirtualInputDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press/release after checking the code is a key
    pub fn update_key(&mut self, key: Key, pressed: bool) -> VirtualDeviceResult<()> {
        if key.kind() != CodeKind::Key {
            return Err(VirtualDeviceError::InvalidCode(key.0, "key"));
        }
        self.update(key, pressed)
    }

    /// Record a button press/release after checking the code is a button
    pub fn update_button(&mut self, code: Key, pressed: bool) -> VirtualDeviceResult<()> {
        if code.kind() != CodeKind::Button {
            return Err(VirtualDeviceError::InvalidCode(code.0, "button"));
        }
        self.update(code, pressed)
    }

    fn update(&mut self, code: Key, pressed: bool) -> VirtualDeviceResult<()> {
        let count = self.counts.entry(code.0).or_insert(0);
        let next = if pressed { *count + 1 } else { *count - 1 };
        if !(0..=1).contains(&next) {
            let state = if pressed { "pressed" } else { "released" };
            log::warn!("{} is already {}", code, state);
            return Err(VirtualDeviceError::Unbalanced(code, state));
        }
        *count = next;
        Ok(())
    }

    pub fn is_pressed(&self, code: Key) -> bool {
        self.counts.get(&code.0).copied().unwrap_or(0) > 0
    }

    /// Codes still held down, lowest first
    pub fn pressed_codes(&self) -> Vec<Key> {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(code, _)| Key(*code))
            .collect()
    }
}
