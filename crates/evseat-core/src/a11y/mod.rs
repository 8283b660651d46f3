// Evseat Accessibility
// Keyboard and pointer accessibility state machines and their settings

mod keyboard;
mod mousekeys;
mod pointer;

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use strum_macros::{Display, EnumString};

use crate::event::Event;
use crate::input::DeviceId;
use crate::modifier::{KeyboardState, ModifierMask};
use crate::notify::SeatNotification;
use crate::timer::{SeatTimer, TimerQueue};

pub use keyboard::{KeyRoute, KeyboardA11yState, MouseKeysTransition};
pub use mousekeys::{MouseKeys, MOUSEKEYS_MOVE_INTERVAL_MS};
pub use pointer::{dwell_direction, PointerA11yState, DWELL_POSITION_DELAY_MS};

/// Keyboard accessibility feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KbdA11yFlags(pub u32);

impl KbdA11yFlags {
    pub const NONE: KbdA11yFlags = KbdA11yFlags(0);
    /// Master switch, nothing below runs without it
    pub const KEYBOARD_ENABLED: KbdA11yFlags = KbdA11yFlags(1 << 0);
    pub const TIMEOUT_ENABLED: KbdA11yFlags = KbdA11yFlags(1 << 1);
    pub const MOUSE_KEYS_ENABLED: KbdA11yFlags = KbdA11yFlags(1 << 2);
    pub const SLOW_KEYS_ENABLED: KbdA11yFlags = KbdA11yFlags(1 << 3);
    pub const SLOW_KEYS_BEEP_PRESS: KbdA11yFlags = KbdA11yFlags(1 << 4);
    pub const SLOW_KEYS_BEEP_ACCEPT: KbdA11yFlags = KbdA11yFlags(1 << 5);
    pub const SLOW_KEYS_BEEP_REJECT: KbdA11yFlags = KbdA11yFlags(1 << 6);
    pub const BOUNCE_KEYS_ENABLED: KbdA11yFlags = KbdA11yFlags(1 << 7);
    pub const BOUNCE_KEYS_BEEP_REJECT: KbdA11yFlags = KbdA11yFlags(1 << 8);
    /// Shift-tap gestures toggle sticky and slow keys
    pub const TOGGLE_KEYS_ENABLED: KbdA11yFlags = KbdA11yFlags(1 << 9);
    pub const STICKY_KEYS_ENABLED: KbdA11yFlags = KbdA11yFlags(1 << 10);
    pub const STICKY_KEYS_TWO_KEY_OFF: KbdA11yFlags = KbdA11yFlags(1 << 11);
    pub const STICKY_KEYS_BEEP: KbdA11yFlags = KbdA11yFlags(1 << 12);
    pub const FEATURE_STATE_CHANGE_BEEP: KbdA11yFlags = KbdA11yFlags(1 << 13);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: KbdA11yFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: KbdA11yFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: KbdA11yFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: KbdA11yFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: KbdA11yFlags, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for KbdA11yFlags {
    type Output = KbdA11yFlags;
    fn bitor(self, rhs: KbdA11yFlags) -> KbdA11yFlags {
        KbdA11yFlags(self.0 | rhs.0)
    }
}

impl BitAnd for KbdA11yFlags {
    type Output = KbdA11yFlags;
    fn bitand(self, rhs: KbdA11yFlags) -> KbdA11yFlags {
        KbdA11yFlags(self.0 & rhs.0)
    }
}

impl BitXor for KbdA11yFlags {
    type Output = KbdA11yFlags;
    fn bitxor(self, rhs: KbdA11yFlags) -> KbdA11yFlags {
        KbdA11yFlags(self.0 ^ rhs.0)
    }
}

impl Not for KbdA11yFlags {
    type Output = KbdA11yFlags;
    fn not(self) -> KbdA11yFlags {
        KbdA11yFlags(!self.0)
    }
}

impl fmt::Display for KbdA11yFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Keyboard accessibility settings. Delays are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KbdA11ySettings {
    pub controls: KbdA11yFlags,
    /// Zero disables slow keys
    pub slowkeys_delay: u32,
    /// Zero disables bounce keys
    pub debounce_delay: u32,
    pub timeout_delay: u32,
    pub mousekeys_init_delay: u32,
    /// Pixels per second at full speed
    pub mousekeys_max_speed: u32,
    /// Milliseconds to reach full speed
    pub mousekeys_accel_time: u32,
}

impl Default for KbdA11ySettings {
    fn default() -> Self {
        Self {
            controls: KbdA11yFlags::NONE,
            slowkeys_delay: 300,
            debounce_delay: 300,
            timeout_delay: 0,
            mousekeys_init_delay: 300,
            mousekeys_max_speed: 10,
            mousekeys_accel_time: 300,
        }
    }
}

/// Dwell click behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DwellMode {
    /// Click with the configured click type
    #[default]
    Window,
    /// Pick the click type from a pointer gesture after the dwell
    Gesture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DwellClickType {
    None,
    #[default]
    Primary,
    Secondary,
    Middle,
    Double,
    Drag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DwellDirection {
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
}

/// Pointer accessibility settings. Delays are in milliseconds,
/// the threshold in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerA11ySettings {
    pub secondary_click_enabled: bool,
    pub dwell_enabled: bool,
    pub secondary_click_delay: u32,
    pub dwell_delay: u32,
    pub dwell_threshold: u32,
    pub dwell_mode: DwellMode,
    pub dwell_click_type: DwellClickType,
    pub dwell_gesture_single: DwellDirection,
    pub dwell_gesture_double: DwellDirection,
    pub dwell_gesture_drag: DwellDirection,
    pub dwell_gesture_secondary: DwellDirection,
}

impl PointerA11ySettings {
    /// Pointer accessibility runs when either feature is on
    pub fn is_enabled(&self) -> bool {
        self.secondary_click_enabled || self.dwell_enabled
    }

    /// Click type assigned to a gesture direction
    pub fn click_type_for_direction(&self, direction: DwellDirection) -> DwellClickType {
        if direction == self.dwell_gesture_single {
            DwellClickType::Primary
        } else if direction == self.dwell_gesture_double {
            DwellClickType::Double
        } else if direction == self.dwell_gesture_drag {
            DwellClickType::Drag
        } else if direction == self.dwell_gesture_secondary {
            DwellClickType::Secondary
        } else {
            DwellClickType::None
        }
    }
}

impl Default for PointerA11ySettings {
    fn default() -> Self {
        Self {
            secondary_click_enabled: false,
            dwell_enabled: false,
            secondary_click_delay: 1200,
            dwell_delay: 1200,
            dwell_threshold: 10,
            dwell_mode: DwellMode::Window,
            dwell_click_type: DwellClickType::Primary,
            dwell_gesture_single: DwellDirection::Left,
            dwell_gesture_double: DwellDirection::Up,
            dwell_gesture_drag: DwellDirection::Down,
            dwell_gesture_secondary: DwellDirection::Right,
        }
    }
}

/// Side effects requested by an accessibility state machine, applied by
/// the seat in order once the state machine returns.
#[derive(Debug, Clone, PartialEq)]
pub enum A11yEffect {
    /// Key event to queue for delivery
    Deliver(Event),
    Notify(SeatNotification),
    /// Button on an accessibility virtual pointer, stage button numbering
    VirtualButton {
        device: DeviceId,
        button: u32,
        pressed: bool,
        time_us: u64,
    },
    VirtualMotion {
        device: DeviceId,
        dx: f64,
        dy: f64,
        time_us: u64,
    },
    VirtualAbsolute {
        device: DeviceId,
        x: f32,
        y: f32,
        time_us: u64,
    },
    /// Keyboard flags toggled from inside the pipeline, to be written
    /// back into the seat settings
    FlagsToggled(KbdA11yFlags),
    /// Dwell click type demoted after a click
    DwellClickTypeChanged(DwellClickType),
}

/// Seat state an accessibility state machine may touch
pub struct A11yContext<'a> {
    pub timers: &'a mut TimerQueue<SeatTimer>,
    /// Seat-wide keyboard state
    pub keyboard: &'a mut KeyboardState,
    /// Pointer buttons currently down
    pub button_state: ModifierMask,
    pub effects: &'a mut Vec<A11yEffect>,
}

impl A11yContext<'_> {
    pub(crate) fn push(&mut self, effect: A11yEffect) {
        self.effects.push(effect);
    }

    pub(crate) fn notify(&mut self, notification: SeatNotification) {
        self.effects.push(A11yEffect::Notify(notification));
    }

    pub(crate) fn bell(&mut self) {
        self.notify(SeatNotification::Bell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_ops() {
        let mut flags = KbdA11yFlags::KEYBOARD_ENABLED | KbdA11yFlags::SLOW_KEYS_ENABLED;
        assert!(flags.contains(KbdA11yFlags::KEYBOARD_ENABLED));
        assert!(!flags.contains(KbdA11yFlags::STICKY_KEYS_ENABLED));

        flags.set(KbdA11yFlags::STICKY_KEYS_ENABLED, true);
        flags.remove(KbdA11yFlags::SLOW_KEYS_ENABLED);
        let changed = flags ^ KbdA11yFlags::KEYBOARD_ENABLED;
        assert_eq!(changed, KbdA11yFlags::STICKY_KEYS_ENABLED);
        assert_eq!(flags.to_string(), "0x0401");
    }

    #[test]
    fn test_gesture_direction_mapping() {
        let settings = PointerA11ySettings::default();
        assert_eq!(
            settings.click_type_for_direction(DwellDirection::Left),
            DwellClickType::Primary
        );
        assert_eq!(
            settings.click_type_for_direction(DwellDirection::Up),
            DwellClickType::Double
        );
        assert_eq!(
            settings.click_type_for_direction(DwellDirection::Down),
            DwellClickType::Drag
        );
        assert_eq!(
            settings.click_type_for_direction(DwellDirection::Right),
            DwellClickType::Secondary
        );
        assert_eq!(
            settings.click_type_for_direction(DwellDirection::None),
            DwellClickType::None
        );
    }

    #[test]
    fn test_enum_names() {
        assert_eq!("gesture".parse::<DwellMode>(), Ok(DwellMode::Gesture));
        assert_eq!(DwellClickType::Double.to_string(), "double");
        assert!("sideways".parse::<DwellDirection>().is_err());
    }
}
