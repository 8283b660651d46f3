// Evseat Seat - Keyboard
// Key events, autorepeat, lock LEDs and keyboard accessibility plumbing

use super::Seat;
use crate::a11y::{A11yContext, A11yEffect, KbdA11ySettings, MouseKeysTransition};
use crate::event::{Event, EventFlags, EventKind, KeyState};
use crate::input::{DeviceId, DeviceType};
use crate::modifier::{key_repeats, StateChange};
use crate::notify::SeatNotification;
use crate::timer::{SeatTimer, TimerId};
use crate::Key;

impl Seat {
    /// Emit a key event for `device`.
    ///
    /// Presses and releases are de-duplicated seat-wide; autorepeats are
    /// not counted. The modifier snapshot on the event is taken before
    /// the key itself updates the keyboard state.
    pub(crate) fn notify_key(
        &mut self,
        device: DeviceId,
        time_us: u64,
        key: Key,
        state: KeyState,
        update_keys: bool,
    ) {
        if state != KeyState::Repeat && !self.update_button_count(key, state.is_down()) {
            log::trace!("dropping repeated {} {} from {}", key, state, device);
            return;
        }

        if !self.has_stage(device) {
            self.repeat.clear(&mut self.timers);
            return;
        }

        let flags = EventFlags {
            synthetic: self.is_synthetic(device),
            repeated: state == KeyState::Repeat,
            ..Default::default()
        };
        let event = Event::new(
            time_us,
            self.core_keyboard,
            device,
            EventKind::Key {
                key,
                pressed: state.is_down(),
            },
        )
        .with_modifiers(self.keyboard.effective() | self.button_state)
        .with_flags(flags);

        let change = if state != KeyState::Repeat && update_keys {
            self.keyboard.update_key(key, state.is_down())
        } else {
            StateChange::default()
        };

        self.route_key_event(device, event);

        if change.leds {
            let leds = self.keyboard.leds();
            log::debug!(
                "lock leds: caps {} num {} scroll {}",
                leds.caps_lock,
                leds.num_lock,
                leds.scroll_lock
            );
            self.pending_leds = Some(leds);
            self.notifications.push(SeatNotification::LedsChanged(leds));
        }

        self.repeat
            .on_key(&mut self.timers, device, key, state, key_repeats(key), time_us);
    }

    /// Hand a key event to the device's keyboard accessibility, or
    /// straight to the queue for devices without one
    fn route_key_event(&mut self, device: DeviceId, event: Event) {
        let mut effects = Vec::new();
        match self
            .devices
            .get_mut(&device)
            .and_then(|d| d.kbd_a11y.as_mut())
        {
            Some(a11y) => {
                let mut ctx = A11yContext {
                    timers: &mut self.timers,
                    keyboard: &mut self.keyboard,
                    button_state: self.button_state,
                    effects: &mut effects,
                };
                let route = a11y.process_key(&mut ctx, event);
                log::trace!("key on {} routed: {:?}", device, route);
            }
            None => effects.push(A11yEffect::Deliver(event)),
        }
        self.apply_effects(effects);
    }

    pub(super) fn fire_repeat(&mut self, id: TimerId, deadline: u64) {
        let Some((device, key)) = self.repeat.fire(id) else {
            return;
        };
        self.notify_key(device, deadline, key, KeyState::Repeat, false);
        self.repeat.rearm(&mut self.timers, deadline);
    }

    /// Replace the keyboard accessibility settings and apply them to
    /// every keyboard
    pub fn set_kbd_a11y_settings(&mut self, settings: KbdA11ySettings) {
        self.kbd_a11y_settings = settings;
        let time_us = self.time_us;
        let keyboards: Vec<DeviceId> = self
            .devices
            .values()
            .filter(|d| d.kbd_a11y.is_some())
            .map(|d| d.id)
            .collect();
        for id in keyboards {
            self.apply_kbd_a11y_to(id, &settings, time_us);
        }
    }

    pub(super) fn apply_kbd_a11y_to(
        &mut self,
        id: DeviceId,
        settings: &KbdA11ySettings,
        time_us: u64,
    ) {
        let mut effects = Vec::new();
        let Some(a11y) = self.devices.get_mut(&id).and_then(|d| d.kbd_a11y.as_mut()) else {
            return;
        };
        let mut ctx = A11yContext {
            timers: &mut self.timers,
            keyboard: &mut self.keyboard,
            button_state: self.button_state,
            effects: &mut effects,
        };
        let transition = a11y.apply_settings(&mut ctx, settings, time_us);
        let has_pointer = a11y.mousekeys().virtual_device().is_some();
        self.apply_effects(effects);

        match transition {
            MouseKeysTransition::Enabled if !has_pointer => {
                let pointer = self.create_virtual_device(DeviceType::Pointer);
                log::debug!("mouse keys on {} through {}", id, pointer);
                if let Some(a11y) = self.devices.get_mut(&id).and_then(|d| d.kbd_a11y.as_mut()) {
                    a11y.mousekeys_mut().set_virtual_device(pointer);
                }
            }
            MouseKeysTransition::Disabled(Some(pointer)) => {
                if let Err(e) = self.destroy_virtual_device(pointer) {
                    log::warn!("removing mouse keys pointer {}: {}", pointer, e);
                }
            }
            _ => {}
        }
    }

    pub(super) fn fire_kbd_a11y_timer(
        &mut self,
        device: DeviceId,
        id: TimerId,
        kind: SeatTimer,
        now_us: u64,
    ) {
        let mut effects = Vec::new();
        match self
            .devices
            .get_mut(&device)
            .and_then(|d| d.kbd_a11y.as_mut())
        {
            Some(a11y) => {
                let mut ctx = A11yContext {
                    timers: &mut self.timers,
                    keyboard: &mut self.keyboard,
                    button_state: self.button_state,
                    effects: &mut effects,
                };
                a11y.fire_timer(&mut ctx, id, kind, now_us);
            }
            None => log::debug!("timer {:?} for gone keyboard {}", kind, device),
        }
        self.apply_effects(effects);
    }

    /// Drop a keyboard's accessibility state, releasing whatever mouse
    /// keys still holds and removing its virtual pointer
    pub(super) fn teardown_kbd_a11y(&mut self, id: DeviceId, time_us: u64) {
        let Some(mut a11y) = self.devices.get_mut(&id).and_then(|d| d.kbd_a11y.take()) else {
            return;
        };

        let mut effects = Vec::new();
        let mut ctx = A11yContext {
            timers: &mut self.timers,
            keyboard: &mut self.keyboard,
            button_state: self.button_state,
            effects: &mut effects,
        };
        let pointer = a11y.teardown(&mut ctx, time_us);
        self.apply_effects(effects);

        if let Some(pointer) = pointer {
            if let Err(e) = self.destroy_virtual_device(pointer) {
                log::warn!("removing mouse keys pointer {}: {}", pointer, e);
            }
        }
    }
}
