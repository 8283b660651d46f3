// Evseat Key Type
// Evdev key/button codes and their classification

use std::fmt;
use std::str::FromStr;

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

/// Number of evdev key/button codes (KEY_CNT)
pub const KEY_CNT: usize = 0x300;

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    generated_key_name(code).unwrap_or("UNKNOWN")
}

/// Look up a key code by its display name (case-insensitive)
pub fn key_from_name(name: &str) -> Option<Key> {
    generated_key_from_name(&name.to_ascii_uppercase())
}

/// How a virtual device may emit a given code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// Keyboard key (KEY_*)
    Key,
    /// Pointer or gamepad button (BTN_*)
    Button,
    /// Tool and touch codes, never emitted directly
    None,
}

impl Key {
    /// Classify a code into key, button or neither.
    ///
    /// Tool selectors and BTN_TOUCH are reported by tablets and touch
    /// devices themselves and cannot be injected.
    pub fn kind(self) -> CodeKind {
        let code = self.0;
        // BTN_TOOL_PEN..=BTN_TOOL_QUINTTAP, BTN_TOUCH, BTN_TOOL_DOUBLETAP..=BTN_TOOL_QUADTAP
        if matches!(code, 0x140..=0x148 | 0x14a | 0x14d..=0x14f) {
            return CodeKind::None;
        }

        if (Key::ESC.0..=Key::MICMUTE.0).contains(&code) {
            return CodeKind::Key;
        }
        if (Key::BTN_MISC.0..=Key::BTN_GEAR_UP.0).contains(&code) {
            return CodeKind::Button;
        }
        if (Key::KEY_OK.0..=Key::KEY_LIGHTS_TOGGLE.0).contains(&code) {
            return CodeKind::Key;
        }
        if (Key::BTN_DPAD_UP.0..=Key::BTN_DPAD_RIGHT.0).contains(&code) {
            return CodeKind::Button;
        }
        if (Key::KEY_ALS_TOGGLE.0..=Key::KEY_KBDINPUTASSIST_CANCEL.0).contains(&code) {
            return CodeKind::Key;
        }
        if (Key::BTN_TRIGGER_HAPPY.0..=Key::BTN_TRIGGER_HAPPY40.0).contains(&code) {
            return CodeKind::Button;
        }
        CodeKind::None
    }

    /// Whether the code is a numeric keypad key
    pub fn is_keypad(self) -> bool {
        matches!(
            self,
            Key::KP7
                | Key::KP8
                | Key::KP9
                | Key::KPMINUS
                | Key::KP4
                | Key::KP5
                | Key::KP6
                | Key::KPPLUS
                | Key::KP1
                | Key::KP2
                | Key::KP3
                | Key::KP0
                | Key::KPDOT
                | Key::KPASTERISK
                | Key::KPSLASH
        )
    }

    /// Whether the code is one of the two shift keys
    pub fn is_shift(self) -> bool {
        matches!(self, Key::LEFT_SHIFT | Key::RIGHT_SHIFT)
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match generated_key_name(self.0) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{:#x}", self.0),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        key_from_name(s).ok_or_else(|| format!("Unknown key: {}", s))
    }
}
