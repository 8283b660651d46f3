// Evseat Accessibility - Keyboard
// Sticky, slow, bounce and toggle keys plus the mouse keys hook

use smallvec::SmallVec;

use super::mousekeys::MouseKeys;
use super::{A11yContext, A11yEffect, KbdA11yFlags, KbdA11ySettings};
use crate::event::Event;
use crate::input::DeviceId;
use crate::modifier::{is_sticky_modifier, ModifierMask};
use crate::notify::SeatNotification;
use crate::timer::{ms_to_us, SeatTimer, TimerId};
use crate::Key;

/// Watchdog after the first Shift tap; toggles slow keys when it fires
const TOGGLE_SLOWKEYS_DELAY_MS: u32 = 8_000;
/// Shift taps further apart than this restart the count
const SHIFT_TAP_WINDOW_US: u64 = 15_000_000;
/// Shift taps that toggle sticky keys
const SHIFT_TAPS_FOR_STICKY: u32 = 5;

/// Outcome of routing one key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRoute {
    /// Queued for delivery, possibly with rewritten modifiers
    Delivered,
    /// Consumed by mouse keys
    Swallowed,
    /// Dropped by bounce or slow keys
    Rejected,
    /// Held by slow keys until its timer fires
    Delayed,
}

/// Mouse keys change the seat has to act on after applying settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKeysTransition {
    Unchanged,
    /// A virtual pointer is needed if the state has none
    Enabled,
    /// The returned virtual pointer, if any, must be removed
    Disabled(Option<DeviceId>),
}

#[derive(Debug)]
struct PendingSlowKey {
    key: Key,
    event: Event,
    timer: TimerId,
}

/// Keyboard accessibility state of one keyboard device
#[derive(Debug)]
pub struct KeyboardA11yState {
    device: DeviceId,
    flags: KbdA11yFlags,
    slowkeys_delay: u32,
    debounce_delay: u32,

    slow_keys: SmallVec<[PendingSlowKey; 4]>,

    debounce_key: Option<Key>,
    debounce_timer: Option<TimerId>,

    sticky_depressed: ModifierMask,
    sticky_latched: ModifierMask,
    sticky_locked: ModifierMask,

    toggle_slowkeys_timer: Option<TimerId>,
    shift_count: u32,
    last_shift_time_us: u64,

    mousekeys: MouseKeys,
}

impl KeyboardA11yState {
    pub fn new(device: DeviceId) -> Self {
        let defaults = KbdA11ySettings::default();
        Self {
            device,
            flags: KbdA11yFlags::NONE,
            slowkeys_delay: defaults.slowkeys_delay,
            debounce_delay: defaults.debounce_delay,
            slow_keys: SmallVec::new(),
            debounce_key: None,
            debounce_timer: None,
            sticky_depressed: ModifierMask::NONE,
            sticky_latched: ModifierMask::NONE,
            sticky_locked: ModifierMask::NONE,
            toggle_slowkeys_timer: None,
            shift_count: 0,
            last_shift_time_us: 0,
            mousekeys: MouseKeys::new(device),
        }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn flags(&self) -> KbdA11yFlags {
        self.flags
    }

    pub fn sticky_latched(&self) -> ModifierMask {
        self.sticky_latched
    }

    pub fn sticky_locked(&self) -> ModifierMask {
        self.sticky_locked
    }

    pub fn pending_slow_keys(&self) -> usize {
        self.slow_keys.len()
    }

    pub fn debounce_key(&self) -> Option<Key> {
        self.debounce_key
    }

    pub fn shift_count(&self) -> u32 {
        self.shift_count
    }

    pub fn mousekeys(&self) -> &MouseKeys {
        &self.mousekeys
    }

    pub fn mousekeys_mut(&mut self) -> &mut MouseKeys {
        &mut self.mousekeys
    }

    fn enabled(&self, feature: KbdA11yFlags) -> bool {
        self.flags.contains(feature)
    }

    /// Apply new settings. Features that change state have their state
    /// cleared; the mouse keys transition is returned for the seat.
    pub fn apply_settings(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &KbdA11ySettings,
        time_us: u64,
    ) -> MouseKeysTransition {
        let changed = self.flags ^ settings.controls;
        let touched = |feature: KbdA11yFlags| {
            changed.intersects(KbdA11yFlags::KEYBOARD_ENABLED | feature)
        };

        self.slowkeys_delay = settings.slowkeys_delay;
        self.debounce_delay = settings.debounce_delay;

        if touched(KbdA11yFlags::SLOW_KEYS_ENABLED) {
            self.clear_slow_keys(ctx);
        }

        if touched(KbdA11yFlags::BOUNCE_KEYS_ENABLED) {
            self.debounce_key = None;
        }

        if touched(KbdA11yFlags::STICKY_KEYS_ENABLED) {
            self.sticky_depressed = ModifierMask::NONE;
            self.update_internal_state(ctx, ModifierMask::NONE, ModifierMask::NONE);
        }

        if touched(KbdA11yFlags::TOGGLE_KEYS_ENABLED) {
            ctx.timers.cancel(&mut self.toggle_slowkeys_timer);
            self.shift_count = 0;
            self.last_shift_time_us = 0;
        }

        let mut transition = MouseKeysTransition::Unchanged;
        if touched(KbdA11yFlags::MOUSE_KEYS_ENABLED) {
            let wanted = KbdA11yFlags::KEYBOARD_ENABLED | KbdA11yFlags::MOUSE_KEYS_ENABLED;
            transition = if settings.controls.contains(wanted) {
                self.mousekeys.enable();
                MouseKeysTransition::Enabled
            } else {
                MouseKeysTransition::Disabled(self.mousekeys.disable(ctx, time_us))
            };
        }
        self.mousekeys.update_params(settings);

        self.flags = settings.controls;
        transition
    }

    /// Route one key event through the enabled features. Delivered
    /// events are pushed as `A11yEffect::Deliver`.
    pub fn process_key(&mut self, ctx: &mut A11yContext<'_>, mut event: Event) -> KeyRoute {
        let Some((key, pressed)) = event.key() else {
            ctx.push(A11yEffect::Deliver(event));
            return KeyRoute::Delivered;
        };

        if event.flags.input_method || !self.enabled(KbdA11yFlags::KEYBOARD_ENABLED) {
            ctx.push(A11yEffect::Deliver(event));
            return KeyRoute::Delivered;
        }

        if self.enabled(KbdA11yFlags::TOGGLE_KEYS_ENABLED) {
            if pressed {
                self.handle_togglekeys_press(ctx, key, event.time_us);
            } else {
                self.handle_togglekeys_release(ctx, key);
            }
        }

        if self.enabled(KbdA11yFlags::MOUSE_KEYS_ENABLED) {
            let swallowed = if pressed {
                self.mousekeys.handle_press(ctx, &event)
            } else {
                self.mousekeys.handle_release(ctx, &event)
            };
            if swallowed {
                return KeyRoute::Swallowed;
            }
        }

        if self.enabled(KbdA11yFlags::BOUNCE_KEYS_ENABLED) && self.debounce_delay != 0 {
            if pressed && self.debounce_key == Some(key) {
                log::debug!("bounce keys rejected {} on {}", key, self.device);
                if self.enabled(KbdA11yFlags::BOUNCE_KEYS_BEEP_REJECT) {
                    ctx.bell();
                }
                return KeyRoute::Rejected;
            } else if !pressed {
                self.start_bounce_keys(ctx, key, event.time_us);
            }
        }

        if self.enabled(KbdA11yFlags::SLOW_KEYS_ENABLED) && self.slowkeys_delay != 0 {
            return if pressed {
                self.start_slow_keys(ctx, event)
            } else {
                self.stop_slow_keys(ctx, event)
            };
        }

        if self.enabled(KbdA11yFlags::STICKY_KEYS_ENABLED) {
            if pressed {
                self.handle_stickykeys_press(ctx, &mut event, key);
            } else {
                self.handle_stickykeys_release(ctx, &mut event, key);
            }
        }

        ctx.push(A11yEffect::Deliver(event));
        KeyRoute::Delivered
    }

    /// Handle one of this keyboard's timers
    pub fn fire_timer(
        &mut self,
        ctx: &mut A11yContext<'_>,
        id: TimerId,
        kind: SeatTimer,
        now_us: u64,
    ) {
        match kind {
            SeatTimer::SlowKey { .. } => self.trigger_slow_key(ctx, id, now_us),
            SeatTimer::BounceKeys { .. } => {
                if self.debounce_timer == Some(id) {
                    self.debounce_timer = None;
                    self.debounce_key = None;
                }
            }
            SeatTimer::ToggleSlowKeys { .. } => {
                if self.toggle_slowkeys_timer == Some(id) {
                    self.toggle_slowkeys_timer = None;
                    self.trigger_toggle_slowkeys(ctx);
                }
            }
            SeatTimer::MouseKeysMove { .. } => self.mousekeys.fire(ctx, id, now_us),
            other => log::warn!("keyboard {} got foreign timer {:?}", self.device, other),
        }
    }

    /// Cancel every timer and release mouse keys buttons. Returns the
    /// mouse keys virtual pointer to remove, if any.
    pub fn teardown(&mut self, ctx: &mut A11yContext<'_>, time_us: u64) -> Option<DeviceId> {
        self.clear_slow_keys(ctx);
        ctx.timers.cancel(&mut self.debounce_timer);
        ctx.timers.cancel(&mut self.toggle_slowkeys_timer);
        self.mousekeys.disable(ctx, time_us)
    }

    fn notify_flags(&mut self, ctx: &mut A11yContext<'_>, changed: KbdA11yFlags) {
        ctx.notify(SeatNotification::KbdA11yFlagsChanged {
            flags: self.flags,
            changed,
        });
        ctx.push(A11yEffect::FlagsToggled(self.flags));
    }

    // Slow keys

    fn clear_slow_keys(&mut self, ctx: &mut A11yContext<'_>) {
        for pending in self.slow_keys.drain(..) {
            ctx.timers.remove(pending.timer);
        }
    }

    fn start_slow_keys(&mut self, ctx: &mut A11yContext<'_>, event: Event) -> KeyRoute {
        // Autorepeat of a held slow key is dropped
        if event.flags.repeated {
            return KeyRoute::Rejected;
        }
        let Some((key, _)) = event.key() else {
            return KeyRoute::Rejected;
        };

        let timer = ctx.timers.schedule(
            event.time_us + ms_to_us(self.slowkeys_delay),
            SeatTimer::SlowKey {
                device: self.device,
                key,
            },
        );
        self.slow_keys.push(PendingSlowKey { key, event, timer });

        if self.enabled(KbdA11yFlags::SLOW_KEYS_BEEP_PRESS) {
            ctx.bell();
        }
        KeyRoute::Delayed
    }

    fn stop_slow_keys(&mut self, ctx: &mut A11yContext<'_>, event: Event) -> KeyRoute {
        let Some((key, _)) = event.key() else {
            return KeyRoute::Rejected;
        };

        if let Some(index) = self.slow_keys.iter().position(|p| p.key == key) {
            let pending = self.slow_keys.remove(index);
            ctx.timers.remove(pending.timer);
            log::debug!("slow keys rejected {} on {}", key, self.device);

            if self.enabled(KbdA11yFlags::SLOW_KEYS_BEEP_REJECT) {
                ctx.bell();
            }
            return KeyRoute::Rejected;
        }

        ctx.push(A11yEffect::Deliver(event));
        KeyRoute::Delivered
    }

    fn trigger_slow_key(&mut self, ctx: &mut A11yContext<'_>, id: TimerId, now_us: u64) {
        let Some(index) = self.slow_keys.iter().position(|p| p.timer == id) else {
            return;
        };
        let mut pending = self.slow_keys.remove(index);

        pending.event.time_us = now_us;
        ctx.push(A11yEffect::Deliver(pending.event));

        if self.enabled(KbdA11yFlags::SLOW_KEYS_BEEP_ACCEPT) {
            ctx.bell();
        }
    }

    // Bounce keys

    fn start_bounce_keys(&mut self, ctx: &mut A11yContext<'_>, key: Key, time_us: u64) {
        ctx.timers.cancel(&mut self.debounce_timer);

        self.debounce_key = Some(key);
        self.debounce_timer = Some(ctx.timers.schedule(
            time_us + ms_to_us(self.debounce_delay),
            SeatTimer::BounceKeys {
                device: self.device,
            },
        ));
    }

    // Toggle keys

    fn handle_togglekeys_press(&mut self, ctx: &mut A11yContext<'_>, key: Key, time_us: u64) {
        if key.is_shift() {
            if self.toggle_slowkeys_timer.is_none() {
                self.toggle_slowkeys_timer = Some(ctx.timers.schedule(
                    time_us + ms_to_us(TOGGLE_SLOWKEYS_DELAY_MS),
                    SeatTimer::ToggleSlowKeys {
                        device: self.device,
                    },
                ));
            }

            if time_us > self.last_shift_time_us + SHIFT_TAP_WINDOW_US {
                self.shift_count = 1;
            } else {
                self.shift_count += 1;
            }
            self.last_shift_time_us = time_us;
        } else {
            self.shift_count = 0;
            ctx.timers.cancel(&mut self.toggle_slowkeys_timer);
        }
    }

    fn handle_togglekeys_release(&mut self, ctx: &mut A11yContext<'_>, key: Key) {
        if !key.is_shift() {
            return;
        }

        ctx.timers.cancel(&mut self.toggle_slowkeys_timer);
        if self.shift_count >= SHIFT_TAPS_FOR_STICKY {
            self.shift_count = 0;

            if self.enabled(KbdA11yFlags::FEATURE_STATE_CHANGE_BEEP) {
                ctx.bell();
            }

            let on = !self.enabled(KbdA11yFlags::STICKY_KEYS_ENABLED);
            self.set_stickykeys(ctx, on);
        }
    }

    fn trigger_toggle_slowkeys(&mut self, ctx: &mut A11yContext<'_>) {
        if self.enabled(KbdA11yFlags::FEATURE_STATE_CHANGE_BEEP) {
            ctx.bell();
        }

        let on = !self.enabled(KbdA11yFlags::SLOW_KEYS_ENABLED);
        self.flags.set(KbdA11yFlags::SLOW_KEYS_ENABLED, on);
        log::debug!("slow keys {} on {}", if on { "on" } else { "off" }, self.device);
        self.notify_flags(ctx, KbdA11yFlags::SLOW_KEYS_ENABLED);
    }

    // Sticky keys

    fn set_stickykeys(&mut self, ctx: &mut A11yContext<'_>, on: bool) {
        self.flags.set(KbdA11yFlags::STICKY_KEYS_ENABLED, on);
        log::debug!("sticky keys {} on {}", if on { "on" } else { "off" }, self.device);

        self.sticky_depressed = ModifierMask::NONE;
        self.update_internal_state(ctx, ModifierMask::NONE, ModifierMask::NONE);
        self.notify_flags(ctx, KbdA11yFlags::STICKY_KEYS_ENABLED);
    }

    /// Swap this keyboard's sticky masks inside the seat keyboard state
    fn update_internal_state(
        &mut self,
        ctx: &mut A11yContext<'_>,
        latched: ModifierMask,
        locked: ModifierMask,
    ) {
        let keyboard = &mut *ctx.keyboard;
        let latched_mods = (keyboard.latched() & !self.sticky_latched) | latched;
        let locked_mods = (keyboard.locked() & !self.sticky_locked) | locked;

        self.sticky_latched = latched;
        self.sticky_locked = locked;

        keyboard.update_mask(keyboard.depressed(), latched_mods, locked_mods);
        ctx.notify(SeatNotification::KbdA11yModsStateChanged { latched, locked });
    }

    fn update_event(
        &mut self,
        ctx: &mut A11yContext<'_>,
        event: &mut Event,
        latched: ModifierMask,
        locked: ModifierMask,
    ) {
        self.update_internal_state(ctx, latched, locked);
        event.modifiers = ctx.keyboard.effective() | ctx.button_state;
    }

    fn handle_stickykeys_press(&mut self, ctx: &mut A11yContext<'_>, event: &mut Event, key: Key) {
        // Two keys down at once turn sticky keys off
        if !self.sticky_depressed.is_empty()
            && self.enabled(KbdA11yFlags::STICKY_KEYS_TWO_KEY_OFF)
        {
            self.set_stickykeys(ctx, false);
            self.update_event(ctx, event, ModifierMask::NONE, ModifierMask::NONE);
            return;
        }

        if !is_sticky_modifier(key) {
            return;
        }

        // Caps lock takes part as a key, but the lock bit never sticks
        let depressed = ctx.keyboard.depressed() & !ModifierMask::LOCK;
        let mut latched = self.sticky_latched;
        let mut locked = self.sticky_locked;

        self.sticky_depressed = depressed;

        if locked.intersects(depressed) {
            locked &= !depressed;
        } else if latched.intersects(depressed) {
            locked |= depressed;
            latched &= !depressed;
        } else {
            latched |= depressed;
        }

        self.update_event(ctx, event, latched, locked);
    }

    fn handle_stickykeys_release(
        &mut self,
        ctx: &mut A11yContext<'_>,
        event: &mut Event,
        key: Key,
    ) {
        self.sticky_depressed = ctx.keyboard.depressed();

        if is_sticky_modifier(key) {
            if self.enabled(KbdA11yFlags::STICKY_KEYS_BEEP) {
                ctx.bell();
            }
            return;
        }

        if self.sticky_latched.is_empty() {
            return;
        }

        let locked = self.sticky_locked;
        self.update_event(ctx, event, ModifierMask::NONE, locked);
    }
}
