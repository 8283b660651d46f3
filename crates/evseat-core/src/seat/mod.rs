// Evseat Seat
// Device registry, core devices and raw event normalization

mod keyboard;
mod pointer;
mod tablet;
mod touch;
mod virtual_input;

use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

use crate::a11y::{
    A11yContext, A11yEffect, KbdA11ySettings, KeyboardA11yState, PointerA11ySettings,
    PointerA11yState,
};
use crate::coords::StageSize;
use crate::event::raw::{DeviceDescription, DeviceHandle, RawEvent, RawEventKind};
use crate::event::{Event, EventKind, KeyState};
use crate::input::{DeviceId, DeviceIdAllocator, DeviceMode, DeviceType, InputDevice};
use crate::key::KEY_CNT;
use crate::modifier::{KeyboardState, Leds, ModifierMask};
use crate::notify::SeatNotification;
use crate::repeat::{RepeatConfig, RepeatScheduler};
use crate::scroll::ScrollAccumulator;
use crate::timer::{SeatTimer, TimerId, TimerQueue};
use crate::touch::TouchSlotPool;

/// Pointer position new seats start at
pub const INITIAL_POINTER_POSITION: (f32, f32) = (16.0, 16.0);

/// Result type for seat operations
pub type SeatResult<T> = Result<T, SeatError>;

/// Errors returned by the public seat API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatError {
    #[error("Unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("Device {0} is not a virtual device")]
    NotVirtual(DeviceId),

    #[error("Device {0} belongs to the seat's accessibility emulation")]
    SeatOwned(DeviceId),
}

/// Replaces the default stage clamp: `(device, time_us, current, proposed)`
/// to the position the pointer may move to
pub type PointerConstraint =
    Box<dyn Fn(DeviceId, u64, (f32, f32), (f32, f32)) -> (f32, f32) + Send>;

/// Rewrites relative motion: `(device, position, dx, dy)` to new deltas
pub type MotionFilter = Box<dyn Fn(DeviceId, (f32, f32), f64, f64) -> (f64, f64) + Send>;

/// Raw event hook run before normalization
pub type EventFilter = Box<dyn FnMut(&RawEvent) -> FilterDecision + Send>;

/// What a raw event filter wants done with the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Continue,
    /// Consume the event
    Stop,
}

/// Handle returned by `Seat::add_event_filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

/// Everything a seat is configured with at construction
pub struct SeatConfig {
    pub name: String,
    pub stage: Option<StageSize>,
    pub repeat: RepeatConfig,
    pub kbd_a11y: KbdA11ySettings,
    pub pointer_a11y: PointerA11ySettings,
    pub constrain_pointer: Option<PointerConstraint>,
    pub motion_filter: Option<MotionFilter>,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            name: "seat0".to_string(),
            stage: None,
            repeat: RepeatConfig::default(),
            kbd_a11y: KbdA11ySettings::default(),
            pointer_a11y: PointerA11ySettings::default(),
            constrain_pointer: None,
            motion_filter: None,
        }
    }
}

/// One seat: a core pointer, a core keyboard and every device attached
/// to them.
///
/// Raw events go in through [`Seat::process_raw`], timers are driven by
/// [`Seat::run_timers`] and normalized events come out of
/// [`Seat::next_event`] in order.
pub struct Seat {
    name: String,
    devices: IndexMap<DeviceId, InputDevice>,
    handles: HashMap<DeviceHandle, DeviceId>,
    ids: DeviceIdAllocator,
    core_pointer: DeviceId,
    core_keyboard: DeviceId,

    stage: Option<StageSize>,
    pointer: (f32, f32),
    keyboard: KeyboardState,
    button_state: ModifierMask,
    button_count: Vec<u32>,

    touch_slots: TouchSlotPool,
    scroll: ScrollAccumulator,
    repeat: RepeatScheduler,
    timers: TimerQueue<SeatTimer>,

    kbd_a11y_settings: KbdA11ySettings,
    pointer_a11y_settings: PointerA11ySettings,

    queue: VecDeque<Event>,
    notifications: Vec<SeatNotification>,
    pending_leds: Option<Leds>,

    filters: Vec<(FilterId, EventFilter)>,
    next_filter_id: u64,
    constrain_pointer: Option<PointerConstraint>,
    motion_filter: Option<MotionFilter>,

    released: bool,
    time_us: u64,
}

impl Seat {
    pub fn new(config: SeatConfig) -> Self {
        let mut ids = DeviceIdAllocator::new();
        let core_pointer = ids.acquire();
        let core_keyboard = ids.acquire();
        let a11y_pointer = ids.acquire();
        let has_stage = config.stage.is_some();

        let mut pointer = InputDevice::new_core(core_pointer, DeviceType::Pointer);
        pointer.pointer_a11y = Some(PointerA11yState::new(core_pointer, a11y_pointer));
        let keyboard = InputDevice::new_core(core_keyboard, DeviceType::Keyboard);
        let mut a11y_device = InputDevice::new_virtual(a11y_pointer, DeviceType::Pointer);
        a11y_device.master = Some(core_pointer);

        let mut devices = IndexMap::new();
        for mut device in [pointer, keyboard, a11y_device] {
            device.has_stage = has_stage;
            devices.insert(device.id, device);
        }

        log::debug!(
            "seat {}: core pointer {}, core keyboard {}",
            config.name,
            core_pointer,
            core_keyboard
        );

        Self {
            name: config.name,
            devices,
            handles: HashMap::new(),
            ids,
            core_pointer,
            core_keyboard,
            stage: config.stage,
            pointer: INITIAL_POINTER_POSITION,
            keyboard: KeyboardState::new(),
            button_state: ModifierMask::NONE,
            button_count: vec![0; KEY_CNT],
            touch_slots: TouchSlotPool::new(),
            scroll: ScrollAccumulator::new(),
            repeat: RepeatScheduler::new(config.repeat),
            timers: TimerQueue::new(),
            kbd_a11y_settings: config.kbd_a11y,
            pointer_a11y_settings: config.pointer_a11y,
            queue: VecDeque::new(),
            notifications: Vec::new(),
            pending_leds: None,
            filters: Vec::new(),
            next_filter_id: 1,
            constrain_pointer: config.constrain_pointer,
            motion_filter: config.motion_filter,
            released: false,
            time_us: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core_pointer(&self) -> DeviceId {
        self.core_pointer
    }

    pub fn core_keyboard(&self) -> DeviceId {
        self.core_keyboard
    }

    /// Virtual pointer the pointer accessibility clicks through
    pub fn a11y_virtual_pointer(&self) -> Option<DeviceId> {
        self.devices
            .get(&self.core_pointer)
            .and_then(|d| d.pointer_a11y.as_ref())
            .map(|a11y| a11y.virtual_device())
    }

    pub fn device(&self, id: DeviceId) -> Option<&InputDevice> {
        self.devices.get(&id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut InputDevice> {
        self.devices.get_mut(&id)
    }

    /// Every registered device in registration order
    pub fn devices(&self) -> impl Iterator<Item = &InputDevice> {
        self.devices.values()
    }

    /// Device registered for a backend handle
    pub fn device_for_handle(&self, handle: DeviceHandle) -> Option<DeviceId> {
        self.handles.get(&handle).copied()
    }

    pub fn stage(&self) -> Option<StageSize> {
        self.stage
    }

    /// Attach the seat to a stage, or detach it with `None`. Events are
    /// dropped while no stage is set.
    pub fn set_stage(&mut self, stage: Option<StageSize>) {
        self.stage = stage;
        for device in self.devices.values_mut() {
            device.has_stage = stage.is_some();
        }
        if let Some(stage) = stage {
            let (x, y) = self.pointer;
            self.pointer = stage.clamp(x, y);
        }
    }

    pub fn pointer_position(&self) -> (f32, f32) {
        self.pointer
    }

    pub fn keyboard_state(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Pointer buttons currently down
    pub fn button_state(&self) -> ModifierMask {
        self.button_state
    }

    /// Seat-wide press count of a key or button code
    pub fn press_count(&self, code: crate::Key) -> u32 {
        self.button_count
            .get(usize::from(code.0))
            .copied()
            .unwrap_or(0)
    }

    pub fn touch_slots(&self) -> &TouchSlotPool {
        &self.touch_slots
    }

    pub fn scroll_accumulated(&self) -> (f64, f64) {
        self.scroll.accumulated()
    }

    pub fn repeat(&self) -> &RepeatScheduler {
        &self.repeat
    }

    pub fn set_repeat(&mut self, config: RepeatConfig) {
        self.repeat.set_config(&mut self.timers, config);
    }

    pub fn kbd_a11y_settings(&self) -> KbdA11ySettings {
        self.kbd_a11y_settings
    }

    pub fn pointer_a11y_settings(&self) -> PointerA11ySettings {
        self.pointer_a11y_settings
    }

    /// Replace the pointer accessibility settings. Turning both features
    /// off stops every pointer accessibility timer.
    pub fn set_pointer_a11y_settings(&mut self, settings: PointerA11ySettings) {
        let was_enabled = self.pointer_a11y_settings.is_enabled();
        self.pointer_a11y_settings = settings;

        if was_enabled && !settings.is_enabled() {
            let time_us = self.time_us;
            let mut effects = Vec::new();
            if let Some(a11y) = self
                .devices
                .get_mut(&self.core_pointer)
                .and_then(|d| d.pointer_a11y.as_mut())
            {
                let mut ctx = A11yContext {
                    timers: &mut self.timers,
                    keyboard: &mut self.keyboard,
                    button_state: self.button_state,
                    effects: &mut effects,
                };
                a11y.teardown(&mut ctx, time_us);
            }
            self.apply_effects(effects);
        }
    }

    /// Whether devices are released to another session
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Latest time the seat has seen, from raw events or timers
    pub fn time_us(&self) -> u64 {
        self.time_us
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Normalized events waiting to be dispatched
    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }

    pub fn take_notifications(&mut self) -> Vec<SeatNotification> {
        std::mem::take(&mut self.notifications)
    }

    /// Lock LED state to push to keyboards, if it changed
    pub fn take_pending_leds(&mut self) -> Option<Leds> {
        self.pending_leds.take()
    }

    pub fn add_event_filter(&mut self, filter: EventFilter) -> FilterId {
        let id = FilterId(self.next_filter_id);
        self.next_filter_id += 1;
        self.filters.push((id, filter));
        id
    }

    /// Returns false when the filter was not installed
    pub fn remove_event_filter(&mut self, id: FilterId) -> bool {
        let before = self.filters.len();
        self.filters.retain(|(filter_id, _)| *filter_id != id);
        self.filters.len() != before
    }

    fn run_filters(&mut self, raw: &RawEvent) -> FilterDecision {
        for (_, filter) in self.filters.iter_mut() {
            if filter(raw) == FilterDecision::Stop {
                return FilterDecision::Stop;
            }
        }
        FilterDecision::Continue
    }

    /// Normalize one raw event. Timers due at or before its timestamp
    /// fire first.
    pub fn process_raw(&mut self, raw: RawEvent) {
        self.run_timers(raw.time_us);
        self.time_us = self.time_us.max(raw.time_us);

        if self.run_filters(&raw) == FilterDecision::Stop {
            log::trace!("{} consumed by a filter", raw.kind.name());
            return;
        }

        let time_us = raw.time_us;
        if let RawEventKind::DeviceAdded(desc) = &raw.kind {
            self.add_device(raw.device, desc, time_us);
            return;
        }

        let Some(id) = self.handles.get(&raw.device).copied() else {
            log::debug!("{} from unknown device {:?}", raw.kind.name(), raw.device);
            return;
        };

        if self.released && raw.kind != RawEventKind::DeviceRemoved {
            log::trace!("discarding {} while released", raw.kind.name());
            return;
        }

        match raw.kind {
            RawEventKind::DeviceAdded(_) => {}
            RawEventKind::DeviceRemoved => self.remove_device(id, time_us),
            RawEventKind::Key {
                key,
                pressed,
                seat_count,
            } => {
                if is_duplicate(pressed, seat_count) {
                    log::trace!("dropping duplicate {} from {}", key, id);
                    return;
                }
                let state = if pressed {
                    KeyState::Pressed
                } else {
                    KeyState::Released
                };
                self.notify_key(id, time_us, key, state, true);
            }
            RawEventKind::PointerMotion {
                dx,
                dy,
                dx_unaccel,
                dy_unaccel,
            } => self.notify_relative_motion(id, time_us, dx, dy, dx_unaccel, dy_unaccel),
            RawEventKind::PointerMotionAbsolute { x, y } => {
                self.process_absolute_motion(id, time_us, x, y)
            }
            RawEventKind::PointerButton {
                button,
                pressed,
                seat_count,
            } => {
                if is_duplicate(pressed, seat_count) {
                    log::trace!("dropping duplicate {} from {}", button, id);
                    return;
                }
                self.notify_button(id, time_us, button, pressed);
            }
            RawEventKind::PointerAxis {
                source,
                horizontal,
                vertical,
                discrete_horizontal,
                discrete_vertical,
            } => self.process_axis(
                id,
                time_us,
                source,
                (horizontal, vertical),
                (discrete_horizontal, discrete_vertical),
            ),
            RawEventKind::TouchDown { slot, x, y } => self.process_touch_down(id, time_us, slot, x, y),
            RawEventKind::TouchMotion { slot, x, y } => {
                self.process_touch_motion(id, time_us, slot, x, y)
            }
            RawEventKind::TouchUp { slot } => self.process_touch_up(id, time_us, slot),
            RawEventKind::TouchCancel { slot } => self.process_touch_cancel(id, time_us, slot),
            RawEventKind::TouchFrame => {}
            RawEventKind::TabletToolProximity { sample, entering } => {
                self.process_tool_proximity(id, time_us, &sample, entering)
            }
            RawEventKind::TabletToolAxis { sample } => self.process_tool_axis(id, time_us, &sample),
            RawEventKind::TabletToolTip { sample, down } => {
                self.process_tool_tip(id, time_us, &sample, down)
            }
            RawEventKind::TabletToolButton {
                sample,
                button,
                pressed,
                seat_count,
            } => {
                if is_duplicate(pressed, seat_count) {
                    log::trace!("dropping duplicate {} from {}", button, id);
                    return;
                }
                self.process_tool_button(id, time_us, &sample, button, pressed)
            }
            RawEventKind::TabletPadButton {
                button,
                pressed,
                group,
                mode,
            } => self.notify_pad(
                id,
                time_us,
                EventKind::PadButton {
                    button,
                    pressed,
                    group,
                    mode,
                },
            ),
            RawEventKind::TabletPadRing {
                ring,
                angle,
                source,
                group,
                mode,
            } => self.notify_pad(
                id,
                time_us,
                EventKind::PadRing {
                    ring,
                    angle,
                    source,
                    group,
                    mode,
                },
            ),
            RawEventKind::TabletPadStrip {
                strip,
                position,
                source,
                group,
                mode,
            } => self.notify_pad(
                id,
                time_us,
                EventKind::PadStrip {
                    strip,
                    value: position,
                    source,
                    group,
                    mode,
                },
            ),
            RawEventKind::GesturePinch {
                phase,
                fingers,
                dx,
                dy,
                angle_delta,
                scale,
            } => self.notify_pinch(id, time_us, phase, fingers, (dx, dy), angle_delta, scale),
            RawEventKind::GestureSwipe {
                phase,
                fingers,
                dx,
                dy,
            } => self.notify_swipe(id, time_us, phase, fingers, (dx, dy)),
            RawEventKind::Switch { switch, on } => self.notify_switch(id, time_us, switch, on),
        }
    }

    /// Fire every timer due at or before `now_us`, in deadline order.
    /// Each timer runs with its deadline as the current time.
    pub fn run_timers(&mut self, now_us: u64) {
        while let Some((id, deadline, kind)) = self.timers.pop_due(now_us) {
            self.time_us = self.time_us.max(deadline);
            self.fire_timer(id, deadline, kind);
        }
        self.time_us = self.time_us.max(now_us);
    }

    fn fire_timer(&mut self, id: TimerId, deadline: u64, kind: SeatTimer) {
        log::trace!("timer {:?} fired at {}", kind, deadline);
        match kind {
            SeatTimer::KeyRepeat => self.fire_repeat(id, deadline),
            SeatTimer::SlowKey { device, .. }
            | SeatTimer::BounceKeys { device }
            | SeatTimer::ToggleSlowKeys { device }
            | SeatTimer::MouseKeysMove { device } => {
                self.fire_kbd_a11y_timer(device, id, kind, deadline)
            }
            SeatTimer::SecondaryClick
            | SeatTimer::Dwell
            | SeatTimer::DwellGesture
            | SeatTimer::ClearDwellGesture
            | SeatTimer::DwellPosition => self.fire_pointer_a11y_timer(id, kind, deadline),
        }
    }

    fn fire_pointer_a11y_timer(&mut self, id: TimerId, kind: SeatTimer, now_us: u64) {
        let settings = self.pointer_a11y_settings;
        let mut effects = Vec::new();
        if let Some(a11y) = self
            .devices
            .get_mut(&self.core_pointer)
            .and_then(|d| d.pointer_a11y.as_mut())
        {
            let mut ctx = A11yContext {
                timers: &mut self.timers,
                keyboard: &mut self.keyboard,
                button_state: self.button_state,
                effects: &mut effects,
            };
            a11y.fire_timer(&mut ctx, &settings, id, kind, now_us);
        }
        self.apply_effects(effects);
    }

    /// Apply what an accessibility state machine asked for, in order
    pub(crate) fn apply_effects(&mut self, effects: Vec<A11yEffect>) {
        for effect in effects {
            match effect {
                A11yEffect::Deliver(event) => self.queue.push_back(event),
                A11yEffect::Notify(notification) => self.notifications.push(notification),
                A11yEffect::VirtualButton {
                    device,
                    button,
                    pressed,
                    time_us,
                } => {
                    if let Err(e) = self.virtual_notify_button(device, time_us, button, pressed) {
                        log::warn!("accessibility button {} on {}: {}", button, device, e);
                    }
                }
                A11yEffect::VirtualMotion {
                    device,
                    dx,
                    dy,
                    time_us,
                } => {
                    if let Err(e) = self.virtual_notify_relative_motion(device, time_us, dx, dy) {
                        log::warn!("accessibility motion on {}: {}", device, e);
                    }
                }
                A11yEffect::VirtualAbsolute {
                    device,
                    x,
                    y,
                    time_us,
                } => {
                    if let Err(e) = self.virtual_notify_absolute_motion(device, time_us, x, y) {
                        log::warn!("accessibility warp on {}: {}", device, e);
                    }
                }
                A11yEffect::FlagsToggled(flags) => {
                    let mut settings = self.kbd_a11y_settings;
                    settings.controls = flags;
                    self.set_kbd_a11y_settings(settings);
                }
                A11yEffect::DwellClickTypeChanged(click_type) => {
                    self.pointer_a11y_settings.dwell_click_type = click_type;
                    self.notifications
                        .push(SeatNotification::PtrA11yDwellClickTypeChanged(click_type));
                }
            }
        }
    }

    fn add_device(&mut self, handle: DeviceHandle, desc: &DeviceDescription, time_us: u64) {
        if let Some(existing) = self.handles.get(&handle) {
            log::warn!("device {:?} already registered as {}", handle, existing);
            return;
        }

        let id = self.ids.acquire();
        let mut device = InputDevice::new_physical(id, handle, desc);
        device.has_stage = self.stage.is_some();
        device.master = if device.device_type == DeviceType::Keyboard {
            Some(self.core_keyboard)
        } else if device.device_type.is_pointer_like() {
            Some(self.core_pointer)
        } else {
            None
        };
        if device.master.is_none() {
            device.mode = DeviceMode::Floating;
        }
        let is_keyboard = device.device_type == DeviceType::Keyboard;

        log::info!(
            "added {} device {} \"{}\" ({}:{})",
            device.device_type,
            id,
            device.name,
            device.vendor_id,
            device.product_id
        );

        self.devices.insert(id, device);
        self.handles.insert(handle, id);

        if is_keyboard {
            if let Some(device) = self.devices.get_mut(&id) {
                device.kbd_a11y = Some(KeyboardA11yState::new(id));
            }
            let settings = self.kbd_a11y_settings;
            self.apply_kbd_a11y_to(id, &settings, time_us);
        }

        self.queue
            .push_back(Event::new(time_us, id, id, EventKind::DeviceAdded));
    }

    fn remove_device(&mut self, id: DeviceId, time_us: u64) {
        self.release_touch_slots(id, time_us);
        self.teardown_kbd_a11y(id, time_us);

        if self.repeat.device() == Some(id) {
            self.repeat.clear(&mut self.timers);
        }

        if let Some(device) = self.devices.shift_remove(&id) {
            if let Some(handle) = device.handle() {
                self.handles.remove(&handle);
            }
            log::info!("removed {} device {} \"{}\"", device.device_type, id, device.name);
        }
        self.ids.release(id);

        self.queue
            .push_back(Event::new(time_us, id, id, EventKind::DeviceRemoved));
    }

    /// Hand the devices over to another session. Queued events are
    /// discarded and only hotplug is processed until reclaimed.
    pub fn release_devices(&mut self) -> bool {
        if self.released {
            log::warn!("seat {} devices are already released", self.name);
            return false;
        }

        let dropped = self.queue.len();
        self.queue.retain(|e| {
            matches!(e.kind, EventKind::DeviceAdded | EventKind::DeviceRemoved)
        });
        log::debug!(
            "seat {} released, {} queued events discarded",
            self.name,
            dropped - self.queue.len()
        );

        self.repeat.clear(&mut self.timers);
        self.released = true;
        true
    }

    /// Take the devices back after `release_devices`. Keys held before
    /// the switch are forgotten; latched and locked modifiers survive and
    /// the lock LEDs are resynced.
    pub fn reclaim_devices(&mut self) -> bool {
        if !self.released {
            log::warn!("seat {} devices are not released", self.name);
            return false;
        }

        self.keyboard.rebuild_keeping_locks();
        self.button_count.iter_mut().for_each(|count| *count = 0);
        self.button_state = ModifierMask::NONE;

        let leds = self.keyboard.leds();
        self.pending_leds = Some(leds);
        self.notifications.push(SeatNotification::LedsChanged(leds));

        self.released = false;
        log::debug!("seat {} reclaimed", self.name);
        true
    }

    /// Pop the next normalized event for the stage, recording the
    /// resulting state on the core devices. Events raised while no stage
    /// is attached are dropped, hotplug events excepted.
    pub fn next_event(&mut self) -> Option<Event> {
        while let Some(event) = self.queue.pop_front() {
            let hotplug = matches!(event.kind, EventKind::DeviceAdded | EventKind::DeviceRemoved);
            if !hotplug && self.stage.is_none() {
                log::trace!("dropping {} without a stage", event.name());
                continue;
            }

            let state = self.button_state | self.keyboard.effective();
            for id in [self.core_pointer, self.core_keyboard] {
                if let Some(device) = self.devices.get_mut(&id) {
                    device.state = state;
                }
            }
            return Some(event);
        }
        None
    }

    fn has_stage(&self, id: DeviceId) -> bool {
        self.devices.get(&id).is_some_and(|d| d.has_stage)
    }

    fn is_synthetic(&self, id: DeviceId) -> bool {
        self.devices.get(&id).is_some_and(InputDevice::is_virtual)
    }

    /// Count a press or release of `code` seat-wide. Returns whether the
    /// transition is the first press or the last release; a release with
    /// nothing pressed is let through and the count stays at zero.
    fn update_button_count(&mut self, code: crate::Key, pressed: bool) -> bool {
        let Some(count) = self.button_count.get_mut(usize::from(code.0)) else {
            log::warn!("code {:#x} out of range", code.0);
            return false;
        };

        if pressed {
            *count += 1;
            *count == 1
        } else if *count == 0 {
            log::debug!("release of {} with nothing pressed", code);
            true
        } else {
            *count -= 1;
            *count == 0
        }
    }
}

/// A press must be the first seat-wide, a release the last
fn is_duplicate(pressed: bool, seat_count: u32) -> bool {
    if pressed {
        seat_count != 1
    } else {
        seat_count != 0
    }
}
