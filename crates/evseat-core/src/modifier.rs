// Evseat Modifier State
// Modifier masks, lock LEDs and the seat-wide keyboard state

use smallvec::SmallVec;
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use crate::key::CodeKind;
use crate::Key;

/// Modifier and pointer button mask carried on every normalized event.
///
/// The low byte holds the eight keyboard modifiers, bits 8..=12 hold the
/// five legacy pointer button masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierMask(pub u32);

impl ModifierMask {
    pub const NONE: ModifierMask = ModifierMask(0);
    pub const SHIFT: ModifierMask = ModifierMask(1 << 0);
    /// Caps lock
    pub const LOCK: ModifierMask = ModifierMask(1 << 1);
    pub const CONTROL: ModifierMask = ModifierMask(1 << 2);
    /// Alt
    pub const MOD1: ModifierMask = ModifierMask(1 << 3);
    /// Num lock
    pub const MOD2: ModifierMask = ModifierMask(1 << 4);
    pub const MOD3: ModifierMask = ModifierMask(1 << 5);
    /// Super / Meta
    pub const MOD4: ModifierMask = ModifierMask(1 << 6);
    pub const MOD5: ModifierMask = ModifierMask(1 << 7);
    pub const BUTTON1: ModifierMask = ModifierMask(1 << 8);
    pub const BUTTON2: ModifierMask = ModifierMask(1 << 9);
    pub const BUTTON3: ModifierMask = ModifierMask(1 << 10);
    pub const BUTTON4: ModifierMask = ModifierMask(1 << 11);
    pub const BUTTON5: ModifierMask = ModifierMask(1 << 12);

    /// Raw bit value
    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set
    pub fn contains(self, other: ModifierMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set
    pub fn intersects(self, other: ModifierMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Mask for a stage button number (1..=5), none for higher buttons
    pub fn for_button(button: u32) -> ModifierMask {
        match button {
            1 => ModifierMask::BUTTON1,
            2 => ModifierMask::BUTTON2,
            3 => ModifierMask::BUTTON3,
            4 => ModifierMask::BUTTON4,
            5 => ModifierMask::BUTTON5,
            _ => ModifierMask::NONE,
        }
    }
}

impl BitOr for ModifierMask {
    type Output = ModifierMask;
    fn bitor(self, rhs: ModifierMask) -> ModifierMask {
        ModifierMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModifierMask {
    fn bitor_assign(&mut self, rhs: ModifierMask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ModifierMask {
    type Output = ModifierMask;
    fn bitand(self, rhs: ModifierMask) -> ModifierMask {
        ModifierMask(self.0 & rhs.0)
    }
}

impl BitAndAssign for ModifierMask {
    fn bitand_assign(&mut self, rhs: ModifierMask) {
        self.0 &= rhs.0;
    }
}

impl Not for ModifierMask {
    type Output = ModifierMask;
    fn not(self) -> ModifierMask {
        ModifierMask(!self.0)
    }
}

impl fmt::Display for ModifierMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ModifierMask, &str); 13] = [
            (ModifierMask::SHIFT, "Shift"),
            (ModifierMask::LOCK, "Lock"),
            (ModifierMask::CONTROL, "Control"),
            (ModifierMask::MOD1, "Mod1"),
            (ModifierMask::MOD2, "Mod2"),
            (ModifierMask::MOD3, "Mod3"),
            (ModifierMask::MOD4, "Mod4"),
            (ModifierMask::MOD5, "Mod5"),
            (ModifierMask::BUTTON1, "Button1"),
            (ModifierMask::BUTTON2, "Button2"),
            (ModifierMask::BUTTON3, "Button3"),
            (ModifierMask::BUTTON4, "Button4"),
            (ModifierMask::BUTTON5, "Button5"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}

/// Lock-key LED state pushed to keyboard devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Leds {
    pub caps_lock: bool,
    pub num_lock: bool,
    pub scroll_lock: bool,
}

/// What changed after feeding a key into [`KeyboardState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateChange {
    pub modifiers: bool,
    pub leds: bool,
}

/// Modifier bit a key sets while held, if it is a plain modifier
pub fn modifier_for_key(key: Key) -> Option<ModifierMask> {
    match key {
        Key::LEFT_SHIFT | Key::RIGHT_SHIFT => Some(ModifierMask::SHIFT),
        Key::LEFT_CTRL | Key::RIGHT_CTRL => Some(ModifierMask::CONTROL),
        Key::LEFT_ALT | Key::RIGHT_ALT => Some(ModifierMask::MOD1),
        Key::LEFT_META | Key::RIGHT_META => Some(ModifierMask::MOD4),
        _ => None,
    }
}

/// Modifier bit a lock key toggles in the locked set
fn lock_for_key(key: Key) -> Option<ModifierMask> {
    match key {
        Key::CAPSLOCK => Some(ModifierMask::LOCK),
        Key::NUMLOCK => Some(ModifierMask::MOD2),
        _ => None,
    }
}

/// Keys that take part in sticky keys: plain modifiers plus Caps Lock,
/// which may be remapped to a latchable modifier.
pub fn is_sticky_modifier(key: Key) -> bool {
    modifier_for_key(key).is_some() || key == Key::CAPSLOCK
}

/// Whether holding the key produces autorepeat
pub fn key_repeats(key: Key) -> bool {
    key.kind() == CodeKind::Key
        && modifier_for_key(key).is_none()
        && lock_for_key(key).is_none()
        && key != Key::SCROLLLOCK
}

/// Seat-wide keyboard modifier state.
///
/// Tracks depressed modifiers from held keys, latched and locked masks
/// (also written directly by sticky keys) and the scroll lock toggle.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: SmallVec<[Key; 8]>,
    depressed: ModifierMask,
    latched: ModifierMask,
    locked: ModifierMask,
    scroll_lock: bool,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a key transition (never an autorepeat) into the state
    pub fn update_key(&mut self, key: Key, pressed: bool) -> StateChange {
        let mods_before = (self.depressed, self.latched, self.locked);
        let leds_before = self.leds();

        let held_mask = modifier_for_key(key).or_else(|| lock_for_key(key));
        if let Some(mask) = held_mask {
            if pressed {
                if !self.held.contains(&key) {
                    self.held.push(key);
                }
            } else {
                self.held.retain(|k| *k != key);
            }

            if pressed {
                if let Some(lock) = lock_for_key(key) {
                    self.locked = ModifierMask(self.locked.0 ^ lock.0);
                }
            }
            log::trace!("modifier {} {}", mask, if pressed { "down" } else { "up" });
        } else if key == Key::SCROLLLOCK && pressed {
            self.scroll_lock = !self.scroll_lock;
        }

        self.depressed = self.held_mask();

        StateChange {
            modifiers: mods_before != (self.depressed, self.latched, self.locked),
            leds: leds_before != self.leds(),
        }
    }

    fn held_mask(&self) -> ModifierMask {
        self.held
            .iter()
            .filter_map(|k| modifier_for_key(*k).or_else(|| lock_for_key(*k)))
            .fold(ModifierMask::NONE, |acc, m| acc | m)
    }

    /// Overwrite the three modifier components
    pub fn update_mask(
        &mut self,
        depressed: ModifierMask,
        latched: ModifierMask,
        locked: ModifierMask,
    ) {
        self.depressed = depressed;
        self.latched = latched;
        self.locked = locked;
    }

    pub fn depressed(&self) -> ModifierMask {
        self.depressed
    }

    pub fn latched(&self) -> ModifierMask {
        self.latched
    }

    pub fn locked(&self) -> ModifierMask {
        self.locked
    }

    /// Depressed | latched | locked
    pub fn effective(&self) -> ModifierMask {
        self.depressed | self.latched | self.locked
    }

    pub fn num_lock_active(&self) -> bool {
        self.locked.contains(ModifierMask::MOD2)
    }

    pub fn leds(&self) -> Leds {
        Leds {
            caps_lock: self.locked.contains(ModifierMask::LOCK),
            num_lock: self.locked.contains(ModifierMask::MOD2),
            scroll_lock: self.scroll_lock,
        }
    }

    /// Rebuild after a session resume: nothing is held any more, latched
    /// and locked modifiers survive.
    pub fn rebuild_keeping_locks(&mut self) {
        self.held.clear();
        self.depressed = ModifierMask::NONE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_depressed_while_held() {
        let mut state = KeyboardState::new();
        let change = state.update_key(Key::LEFT_SHIFT, true);
        assert!(change.modifiers);
        assert!(!change.leds);
        assert_eq!(state.depressed(), ModifierMask::SHIFT);

        // Second shift keeps the bit, releasing one leaves it set
        state.update_key(Key::RIGHT_SHIFT, true);
        state.update_key(Key::LEFT_SHIFT, false);
        assert_eq!(state.depressed(), ModifierMask::SHIFT);

        state.update_key(Key::RIGHT_SHIFT, false);
        assert!(state.depressed().is_empty());
    }

    #[test]
    fn test_caps_lock_toggles_led() {
        let mut state = KeyboardState::new();
        let change = state.update_key(Key::CAPSLOCK, true);
        assert!(change.leds);
        state.update_key(Key::CAPSLOCK, false);
        assert!(state.leds().caps_lock);
        assert_eq!(state.locked(), ModifierMask::LOCK);

        state.update_key(Key::CAPSLOCK, true);
        state.update_key(Key::CAPSLOCK, false);
        assert!(!state.leds().caps_lock);
    }

    #[test]
    fn test_num_and_scroll_lock() {
        let mut state = KeyboardState::new();
        state.update_key(Key::NUMLOCK, true);
        state.update_key(Key::NUMLOCK, false);
        assert!(state.num_lock_active());

        let change = state.update_key(Key::SCROLLLOCK, true);
        assert!(change.leds);
        assert!(state.leds().scroll_lock);
    }

    #[test]
    fn test_plain_key_changes_nothing() {
        let mut state = KeyboardState::new();
        let change = state.update_key(Key::from(30), true); // A
        assert_eq!(change, StateChange::default());
    }

    #[test]
    fn test_effective_combines_components() {
        let mut state = KeyboardState::new();
        state.update_mask(
            ModifierMask::SHIFT,
            ModifierMask::CONTROL,
            ModifierMask::MOD2,
        );
        assert_eq!(
            state.effective(),
            ModifierMask::SHIFT | ModifierMask::CONTROL | ModifierMask::MOD2
        );
    }

    #[test]
    fn test_rebuild_keeps_latched_and_locked() {
        let mut state = KeyboardState::new();
        state.update_key(Key::LEFT_CTRL, true);
        state.update_mask(state.depressed(), ModifierMask::SHIFT, ModifierMask::LOCK);
        state.rebuild_keeping_locks();
        assert!(state.depressed().is_empty());
        assert_eq!(state.latched(), ModifierMask::SHIFT);
        assert_eq!(state.locked(), ModifierMask::LOCK);
    }

    #[test]
    fn test_key_repeats() {
        assert!(key_repeats(Key::A));
        assert!(!key_repeats(Key::LEFT_SHIFT));
        assert!(!key_repeats(Key::CAPSLOCK));
        assert!(!key_repeats(Key::BTN_LEFT));
    }

    #[test]
    fn test_mask_display() {
        assert_eq!(ModifierMask::NONE.to_string(), "none");
        assert_eq!(
            (ModifierMask::SHIFT | ModifierMask::BUTTON1).to_string(),
            "Shift+Button1"
        );
    }
}
