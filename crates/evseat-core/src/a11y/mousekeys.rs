// Evseat Accessibility - Mouse Keys
// Keypad driven pointer emulation through a virtual pointer

use super::{A11yContext, A11yEffect, KbdA11ySettings};
use crate::event::Event;
use crate::input::DeviceId;
use crate::timer::{ms_to_us, SeatTimer, TimerId, US_PER_MS};
use crate::Key;

/// Milliseconds between movement steps once moving
pub const MOUSEKEYS_MOVE_INTERVAL_MS: u32 = 100;

const MOUSEKEYS_CURVE: f64 = 1.0 + 50.0 * 0.001;

/// Buttons mouse keys can drive, in stage button numbering
const BUTTONS: [u32; 3] = [1, 2, 3];

fn button_index(button: u32) -> usize {
    match button {
        2 => 1,
        3 => 2,
        _ => 0,
    }
}

/// Unit motion for a direction key
fn direction_for_key(key: Key) -> Option<(i32, i32)> {
    let dy = match key {
        Key::KP7 | Key::KP8 | Key::KP9 => -1,
        Key::KP1 | Key::KP2 | Key::KP3 => 1,
        _ => 0,
    };
    let dx = match key {
        Key::KP7 | Key::KP4 | Key::KP1 => -1,
        Key::KP9 | Key::KP6 | Key::KP3 => 1,
        _ => 0,
    };
    if dx == 0 && dy == 0 {
        None
    } else {
        Some((dx, dy))
    }
}

/// Mouse keys state of one keyboard
#[derive(Debug)]
pub struct MouseKeys {
    device: DeviceId,
    virtual_device: Option<DeviceId>,
    /// Button the click keys act on
    button: u32,
    pressed: [bool; 3],
    timer: Option<TimerId>,
    first_motion_ms: Option<u64>,
    last_motion_ms: u64,
    last_key: Option<Key>,
    max_speed: u32,
    accel_time: u32,
    init_delay: u32,
    curve_factor: f64,
}

impl MouseKeys {
    pub fn new(device: DeviceId) -> Self {
        let mut mousekeys = Self {
            device,
            virtual_device: None,
            button: 1,
            pressed: [false; 3],
            timer: None,
            first_motion_ms: None,
            last_motion_ms: 0,
            last_key: None,
            max_speed: 1,
            accel_time: 1,
            init_delay: 0,
            curve_factor: 1.0,
        };
        mousekeys.update_params(&KbdA11ySettings::default());
        mousekeys
    }

    /// Take the tuning from settings, clamped to sane values
    pub fn update_params(&mut self, settings: &KbdA11ySettings) {
        self.max_speed = settings.mousekeys_max_speed.max(1);
        self.accel_time = settings.mousekeys_accel_time.max(1);
        self.init_delay = settings.mousekeys_init_delay;

        self.curve_factor =
            f64::from(self.max_speed) / f64::from(self.accel_time).powf(MOUSEKEYS_CURVE);
    }

    /// Reset to the left button with no movement in progress
    pub fn enable(&mut self) {
        self.button = 1;
        self.timer = None;
        self.first_motion_ms = None;
        self.last_motion_ms = 0;
        self.last_key = None;
    }

    pub fn set_virtual_device(&mut self, device: DeviceId) {
        self.virtual_device = Some(device);
    }

    pub fn virtual_device(&self) -> Option<DeviceId> {
        self.virtual_device
    }

    /// Stop moving, release every button still down and hand back the
    /// virtual pointer for removal
    pub fn disable(&mut self, ctx: &mut A11yContext<'_>, time_us: u64) -> Option<DeviceId> {
        self.stop_move(ctx);

        for button in BUTTONS {
            if self.pressed[button_index(button)] {
                self.button = button;
                self.emulate_button(ctx, false, time_us);
            }
        }

        self.virtual_device.take()
    }

    pub fn is_button_pressed(&self, button: u32) -> bool {
        self.pressed[button_index(button)]
    }

    pub fn button(&self) -> u32 {
        self.button
    }

    pub fn is_moving(&self) -> bool {
        self.timer.is_some()
    }

    fn emulate_button(&mut self, ctx: &mut A11yContext<'_>, pressed: bool, time_us: u64) {
        let index = button_index(self.button);
        if self.pressed[index] == pressed {
            return;
        }

        match self.virtual_device {
            Some(device) => ctx.push(A11yEffect::VirtualButton {
                device,
                button: self.button,
                pressed,
                time_us,
            }),
            None => log::debug!("mouse keys on {} has no virtual pointer", self.device),
        }
        self.pressed[index] = pressed;
    }

    fn emulate_click(&mut self, ctx: &mut A11yContext<'_>, time_us: u64) {
        self.emulate_button(ctx, true, time_us);
        self.emulate_button(ctx, false, time_us);
    }

    /// Acceleration factor for a movement step at `time_us`.
    ///
    /// The first step moves one unit and starts the acceleration clock
    /// after the initial delay; later steps grow along the curve until
    /// the configured time, then stay at the maximum speed.
    pub fn speed_factor(&mut self, time_us: u64) -> f64 {
        let time = time_us / US_PER_MS;

        let Some(first) = self.first_motion_ms else {
            let first = time + u64::from(self.init_delay);
            self.first_motion_ms = Some(first);
            self.last_motion_ms = first;
            return 1.0;
        };

        let init_time = time as i64 - first as i64;
        let delta_t = time as i64 - self.last_motion_ms as i64;

        if delta_t < 0 {
            return 0.0;
        }

        let speed = if init_time < i64::from(self.accel_time) {
            self.curve_factor * (init_time as f64).powf(MOUSEKEYS_CURVE) * delta_t as f64
                / 1000.0
        } else {
            f64::from(self.max_speed) * delta_t as f64 / 1000.0
        };

        self.last_motion_ms = time;
        speed
    }

    fn emulate_motion(&mut self, ctx: &mut A11yContext<'_>, dx: i32, dy: i32, time_us: u64) {
        let speed = self.speed_factor(time_us);

        let scale = |unit: i32| {
            let value = f64::from(unit) * speed;
            if unit < 0 {
                value.floor()
            } else {
                value.ceil()
            }
        };

        match self.virtual_device {
            Some(device) => ctx.push(A11yEffect::VirtualMotion {
                device,
                dx: scale(dx),
                dy: scale(dy),
                time_us,
            }),
            None => log::debug!("mouse keys on {} has no virtual pointer", self.device),
        }
    }

    /// One movement step: reschedule, then move by the held direction
    fn trigger_move(&mut self, ctx: &mut A11yContext<'_>, now_us: u64) {
        let delay = if self.first_motion_ms.is_none() {
            self.init_delay
        } else {
            MOUSEKEYS_MOVE_INTERVAL_MS
        };
        self.timer = Some(ctx.timers.schedule(
            now_us + ms_to_us(delay),
            SeatTimer::MouseKeysMove {
                device: self.device,
            },
        ));

        if let Some((dx, dy)) = self.last_key.and_then(direction_for_key) {
            self.emulate_motion(ctx, dx, dy, now_us);
        }
    }

    fn start_move(&mut self, ctx: &mut A11yContext<'_>, key: Key, time_us: u64) {
        self.last_key = Some(key);
        if self.timer.is_none() {
            self.trigger_move(ctx, time_us);
        }
    }

    pub fn stop_move(&mut self, ctx: &mut A11yContext<'_>) {
        self.first_motion_ms = None;
        self.last_motion_ms = 0;
        ctx.timers.cancel(&mut self.timer);
    }

    /// Movement timer fired
    pub fn fire(&mut self, ctx: &mut A11yContext<'_>, id: TimerId, now_us: u64) {
        if self.timer != Some(id) {
            return;
        }
        self.timer = None;
        self.trigger_move(ctx, now_us);
    }

    /// Key press; true when mouse keys consumed it
    pub fn handle_press(&mut self, ctx: &mut A11yContext<'_>, event: &Event) -> bool {
        let Some((key, _)) = event.key() else {
            return false;
        };

        if !event.flags.repeated {
            self.stop_move(ctx);
        }

        if ctx.keyboard.num_lock_active() {
            return false;
        }

        match key {
            Key::KPSLASH => {
                self.button = 1;
                true
            }
            Key::KPASTERISK => {
                self.button = 2;
                true
            }
            Key::KPMINUS => {
                self.button = 3;
                true
            }
            Key::KP5 => {
                self.emulate_click(ctx, event.time_us);
                true
            }
            Key::KP0 => {
                self.emulate_button(ctx, true, event.time_us);
                true
            }
            Key::KPDOT => {
                self.emulate_button(ctx, false, event.time_us);
                true
            }
            Key::KPPLUS => {
                self.emulate_click(ctx, event.time_us);
                self.emulate_click(ctx, event.time_us);
                true
            }
            _ if direction_for_key(key).is_some() => {
                self.start_move(ctx, key, event.time_us);
                true
            }
            _ => false,
        }
    }

    /// Key release; true when mouse keys consumed it
    pub fn handle_release(&mut self, ctx: &mut A11yContext<'_>, event: &Event) -> bool {
        let Some((key, _)) = event.key() else {
            return false;
        };

        if ctx.keyboard.num_lock_active() {
            return false;
        }

        if key.is_keypad() {
            self.stop_move(ctx);
            return true;
        }

        false
    }
}
