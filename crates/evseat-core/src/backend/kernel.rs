// Evseat Device Backends - Kernel
// Direct evdev device access with udev hotplug

use evdev::{
    AbsoluteAxisType, Device, EventType, InputEvent, InputEventKind, LedType, MiscType,
    RelativeAxisType, SwitchType, Synchronization,
};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use super::{BackendError, BackendResult, DeviceBackend, PressCounter};
use crate::event::raw::{DeviceDescription, DeviceHandle, RawEvent, RawEventKind, ToolSample};
use crate::event::{PadSource, SwitchKind};
use crate::input::{
    is_keyboard, matches_device_filter, DeviceCapabilities, DeviceType, TabletAxes,
    ToolDescriptor, ToolType,
};
use crate::key::CodeKind;
use crate::modifier::Leds;
use crate::scroll::ScrollSource;
use crate::timer::{Clock, MonotonicClock};
use crate::Key;

/// Smooth scroll distance of one wheel click
const WHEEL_CLICK_DISTANCE: f64 = 10.0;

/// Pointer units a touchpad finger travels across the full pad width
const TOUCHPAD_TRAVEL: f64 = 1000.0;

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub path: Option<String>,
    pub device_type: DeviceType,
}

/// How the kernel backend picks and opens devices
#[derive(Debug, Clone, Default)]
pub struct EvdevOptions {
    /// Device names or node paths to use; empty means every usable device
    pub filter: Vec<String>,
    /// Take exclusive access to the opened devices
    pub grab: bool,
    /// Watch udev for devices coming and going
    pub hotplug: bool,
}

/// Axis range reported by the kernel
#[derive(Debug, Clone, Copy, Default)]
struct AxisRange {
    minimum: i32,
    maximum: i32,
    resolution: i32,
}

impl AxisRange {
    fn normalize(&self, value: i32) -> f64 {
        let span = f64::from(self.maximum) - f64::from(self.minimum);
        if span <= 0.0 {
            return 0.0;
        }
        ((f64::from(value) - f64::from(self.minimum)) / span).clamp(0.0, 1.0)
    }

    fn span(&self) -> f64 {
        (f64::from(self.maximum) - f64::from(self.minimum)).max(1.0)
    }

    /// Physical length in millimetres, when the resolution is known
    fn length_mm(&self) -> Option<f64> {
        (self.resolution > 0).then(|| self.span() / f64::from(self.resolution))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AxisRanges {
    x: AxisRange,
    y: AxisRange,
    mt_x: AxisRange,
    mt_y: AxisRange,
    pressure: AxisRange,
    distance: AxisRange,
    wheel: AxisRange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum SlotChange {
    #[default]
    None,
    Down,
    Motion,
    Up,
}

#[derive(Debug, Clone, Copy, Default)]
struct TouchSlot {
    active: bool,
    x: i32,
    y: i32,
    change: SlotChange,
}

/// State accumulated between two SYN_REPORTs
#[derive(Debug, Default)]
struct Frame {
    rel: (i32, i32),
    wheel: (i32, i32),
    abs_moved: bool,
    keys: Vec<(Key, bool)>,
    switches: Vec<(SwitchKind, bool)>,
    proximity: Option<bool>,
    tip: Option<bool>,
    axes_moved: bool,
    ring: Option<i32>,
}

/// One opened kernel device
struct OpenDevice {
    handle: DeviceHandle,
    device: Device,
    path: PathBuf,
    device_type: DeviceType,
    ranges: AxisRanges,
    frame: Frame,
    abs: (i32, i32),
    slot: usize,
    slots: Vec<TouchSlot>,
    /// Last first-finger position on a touchpad
    finger: (i32, i32),
    tool: Option<ToolType>,
    tool_serial: u64,
    axes: TabletAxes,
    /// Codes this device holds down
    held: BTreeSet<u16>,
}

impl OpenDevice {
    fn open(path: &Path, handle: DeviceHandle) -> io::Result<(Self, DeviceDescription)> {
        let device = Device::open(path)?;
        let desc = describe(&device, path);
        let device_type = DeviceType::determine(&desc.capabilities);
        let ranges = axis_ranges(&device);
        Ok((
            Self {
                handle,
                device,
                path: path.to_path_buf(),
                device_type,
                ranges,
                frame: Frame::default(),
                abs: (0, 0),
                slot: 0,
                slots: vec![TouchSlot::default(); 10],
                finger: (0, 0),
                tool: None,
                tool_serial: 0,
                axes: TabletAxes::default(),
                held: BTreeSet::new(),
            },
            desc,
        ))
    }

    fn name(&self) -> &str {
        self.device.name().unwrap_or("Unknown")
    }

    fn raw(&self, time_us: u64, kind: RawEventKind) -> RawEvent {
        RawEvent::new(self.handle, time_us, kind)
    }

    fn process(&mut self, event: InputEvent, counts: &mut PressCounter, time_us: u64, out: &mut Vec<RawEvent>) {
        let value = event.value();
        match event.kind() {
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) => {
                self.flush(counts, time_us, out)
            }
            InputEventKind::Synchronization(Synchronization::SYN_DROPPED) => {
                log::warn!("{}: kernel dropped events, discarding frame", self.name());
                self.frame = Frame::default();
            }
            InputEventKind::Key(code) => self.on_key(Key(code.code()), value),
            InputEventKind::RelAxis(axis) => match axis {
                RelativeAxisType::REL_X => self.frame.rel.0 += value,
                RelativeAxisType::REL_Y => self.frame.rel.1 += value,
                RelativeAxisType::REL_HWHEEL => self.frame.wheel.0 += value,
                RelativeAxisType::REL_WHEEL => self.frame.wheel.1 += value,
                _ => {}
            },
            InputEventKind::AbsAxis(axis) => self.on_abs(axis, value),
            InputEventKind::Switch(switch) => {
                let kind = match switch {
                    SwitchType::SW_LID => SwitchKind::Lid,
                    SwitchType::SW_TABLET_MODE => SwitchKind::TabletMode,
                    _ => return,
                };
                self.frame.switches.push((kind, value != 0));
            }
            InputEventKind::Misc(MiscType::MSC_SERIAL) => self.tool_serial = value as u32 as u64,
            _ => {}
        }
    }

    fn on_key(&mut self, key: Key, value: i32) {
        // Kernel autorepeat; the seat repeats keys itself
        if value == 2 {
            return;
        }
        let pressed = value != 0;

        if self.device_type == DeviceType::Tablet {
            if let Some(tool) = tool_type(key) {
                self.frame.proximity = Some(pressed);
                if pressed {
                    self.tool = Some(tool);
                }
                return;
            }
            if key == Key::BTN_TOUCH {
                self.frame.tip = Some(pressed);
                return;
            }
        }

        if matches!(self.device_type, DeviceType::Touchscreen | DeviceType::Touchpad)
            && (key == Key::BTN_TOUCH || key.kind() == CodeKind::None)
        {
            return;
        }

        self.frame.keys.push((key, pressed));
    }

    fn on_abs(&mut self, axis: AbsoluteAxisType, value: i32) {
        match axis {
            AbsoluteAxisType::ABS_X => {
                self.abs.0 = value;
                self.frame.abs_moved = true;
            }
            AbsoluteAxisType::ABS_Y => {
                self.abs.1 = value;
                self.frame.abs_moved = true;
            }
            AbsoluteAxisType::ABS_PRESSURE => {
                self.axes.pressure = Some(self.ranges.pressure.normalize(value));
                self.frame.axes_moved = true;
            }
            AbsoluteAxisType::ABS_DISTANCE => {
                self.axes.distance = Some(self.ranges.distance.normalize(value));
                self.frame.axes_moved = true;
            }
            AbsoluteAxisType::ABS_TILT_X => {
                let (_, y) = self.axes.tilt.unwrap_or_default();
                self.axes.tilt = Some((f64::from(value), y));
                self.frame.axes_moved = true;
            }
            AbsoluteAxisType::ABS_TILT_Y => {
                let (x, _) = self.axes.tilt.unwrap_or_default();
                self.axes.tilt = Some((x, f64::from(value)));
                self.frame.axes_moved = true;
            }
            AbsoluteAxisType::ABS_WHEEL => self.frame.ring = Some(value),
            AbsoluteAxisType::ABS_MT_SLOT => {
                self.slot = usize::try_from(value).unwrap_or(0);
                if self.slot >= self.slots.len() {
                    self.slots.resize(self.slot + 1, TouchSlot::default());
                }
            }
            AbsoluteAxisType::ABS_MT_TRACKING_ID => {
                let slot = &mut self.slots[self.slot];
                if value < 0 {
                    slot.change = if slot.change == SlotChange::Down {
                        SlotChange::None
                    } else {
                        SlotChange::Up
                    };
                    slot.active = false;
                } else {
                    slot.active = true;
                    slot.change = SlotChange::Down;
                }
            }
            AbsoluteAxisType::ABS_MT_POSITION_X | AbsoluteAxisType::ABS_MT_POSITION_Y => {
                let slot = &mut self.slots[self.slot];
                if axis == AbsoluteAxisType::ABS_MT_POSITION_X {
                    slot.x = value;
                } else {
                    slot.y = value;
                }
                if slot.change == SlotChange::None {
                    slot.change = SlotChange::Motion;
                }
            }
            _ => {}
        }
    }

    fn flush(&mut self, counts: &mut PressCounter, time_us: u64, out: &mut Vec<RawEvent>) {
        let frame = std::mem::take(&mut self.frame);
        match self.device_type {
            DeviceType::Tablet => self.flush_tablet(&frame, counts, time_us, out),
            DeviceType::Pad => self.flush_pad(&frame, time_us, out),
            DeviceType::Touchscreen => self.flush_touch(time_us, out),
            DeviceType::Touchpad => self.flush_touchpad(time_us, out),
            _ => self.flush_pointer(&frame, time_us, out),
        }

        if self.device_type != DeviceType::Tablet && self.device_type != DeviceType::Pad {
            for &(key, pressed) in &frame.keys {
                let kind = self.key_event(key, pressed, counts);
                out.push(self.raw(time_us, kind));
            }
            if frame.wheel != (0, 0) {
                // REL_WHEEL counts away from the user
                let h = f64::from(frame.wheel.0);
                let v = -f64::from(frame.wheel.1);
                out.push(self.raw(
                    time_us,
                    RawEventKind::PointerAxis {
                        source: ScrollSource::Wheel,
                        horizontal: (frame.wheel.0 != 0).then_some(h * WHEEL_CLICK_DISTANCE),
                        vertical: (frame.wheel.1 != 0).then_some(v * WHEEL_CLICK_DISTANCE),
                        discrete_horizontal: (frame.wheel.0 != 0).then_some(h),
                        discrete_vertical: (frame.wheel.1 != 0).then_some(v),
                    },
                ));
            }
        }

        for &(switch, on) in &frame.switches {
            out.push(self.raw(time_us, RawEventKind::Switch { switch, on }));
        }
    }

    /// Key or button event, with the seat-wide count updated
    fn key_event(&mut self, key: Key, pressed: bool, counts: &mut PressCounter) -> RawEventKind {
        if pressed {
            self.held.insert(key.0);
        } else {
            self.held.remove(&key.0);
        }
        let seat_count = counts.update(key, pressed);
        if key.kind() == CodeKind::Button {
            RawEventKind::PointerButton {
                button: key,
                pressed,
                seat_count,
            }
        } else {
            RawEventKind::Key {
                key,
                pressed,
                seat_count,
            }
        }
    }

    fn flush_pointer(&mut self, frame: &Frame, time_us: u64, out: &mut Vec<RawEvent>) {
        if frame.rel != (0, 0) {
            let dx = f64::from(frame.rel.0);
            let dy = f64::from(frame.rel.1);
            out.push(self.raw(
                time_us,
                RawEventKind::PointerMotion {
                    dx,
                    dy,
                    dx_unaccel: dx,
                    dy_unaccel: dy,
                },
            ));
        }
        if frame.abs_moved {
            out.push(self.raw(
                time_us,
                RawEventKind::PointerMotionAbsolute {
                    x: self.ranges.x.normalize(self.abs.0),
                    y: self.ranges.y.normalize(self.abs.1),
                },
            ));
        }
    }

    fn flush_touch(&mut self, time_us: u64, out: &mut Vec<RawEvent>) {
        let mut any = false;
        for index in 0..self.slots.len() {
            let slot = self.slots[index];
            let x = self.ranges.mt_x.normalize(slot.x);
            let y = self.ranges.mt_y.normalize(slot.y);
            let slot_id = index as i32;
            let kind = match slot.change {
                SlotChange::None => continue,
                SlotChange::Down => RawEventKind::TouchDown { slot: slot_id, x, y },
                SlotChange::Motion if slot.active => RawEventKind::TouchMotion { slot: slot_id, x, y },
                SlotChange::Motion => continue,
                SlotChange::Up => RawEventKind::TouchUp { slot: slot_id },
            };
            self.slots[index].change = SlotChange::None;
            out.push(self.raw(time_us, kind));
            any = true;
        }
        if any {
            out.push(self.raw(time_us, RawEventKind::TouchFrame));
        }
    }

    /// Touchpads move the pointer with their first finger
    fn flush_touchpad(&mut self, time_us: u64, out: &mut Vec<RawEvent>) {
        let scale = TOUCHPAD_TRAVEL / self.ranges.mt_x.span();
        let first = &mut self.slots[0];
        let change = std::mem::take(&mut first.change);
        let (x, y) = (first.x, first.y);
        let previous = self.finger;
        self.finger = (x, y);
        for slot in self.slots.iter_mut() {
            slot.change = SlotChange::None;
        }

        if change == SlotChange::Motion {
            let dx = f64::from(x - previous.0) * scale;
            let dy = f64::from(y - previous.1) * scale;
            out.push(self.raw(
                time_us,
                RawEventKind::PointerMotion {
                    dx,
                    dy,
                    dx_unaccel: dx,
                    dy_unaccel: dy,
                },
            ));
        }
    }

    fn tool_sample(&self, frame: &Frame) -> Option<ToolSample> {
        let tool_type = self.tool?;
        Some(ToolSample {
            tool: ToolDescriptor {
                serial: self.tool_serial,
                tool_type,
            },
            x: self.ranges.x.normalize(self.abs.0),
            y: self.ranges.y.normalize(self.abs.1),
            dx: f64::from(frame.rel.0),
            dy: f64::from(frame.rel.1),
            axes: self.axes,
        })
    }

    fn flush_tablet(&mut self, frame: &Frame, counts: &mut PressCounter, time_us: u64, out: &mut Vec<RawEvent>) {
        let Some(sample) = self.tool_sample(frame) else {
            return;
        };

        if frame.proximity == Some(true) {
            out.push(self.raw(
                time_us,
                RawEventKind::TabletToolProximity {
                    sample,
                    entering: true,
                },
            ));
        } else if frame.abs_moved || frame.axes_moved || frame.rel != (0, 0) {
            out.push(self.raw(time_us, RawEventKind::TabletToolAxis { sample }));
        }

        if let Some(down) = frame.tip {
            self.key_event(Key::BTN_TOUCH, down, counts);
            out.push(self.raw(time_us, RawEventKind::TabletToolTip { sample, down }));
        }

        for &(button, pressed) in &frame.keys {
            self.key_event(button, pressed, counts);
            out.push(self.raw(
                time_us,
                RawEventKind::TabletToolButton {
                    sample,
                    button,
                    pressed,
                    seat_count: counts.count(button),
                },
            ));
        }

        if frame.proximity == Some(false) {
            out.push(self.raw(
                time_us,
                RawEventKind::TabletToolProximity {
                    sample,
                    entering: false,
                },
            ));
            self.tool = None;
            self.axes = TabletAxes::default();
        }
    }

    fn flush_pad(&mut self, frame: &Frame, time_us: u64, out: &mut Vec<RawEvent>) {
        for &(key, pressed) in &frame.keys {
            let Some(button) = key.0.checked_sub(Key::BTN_MISC.0) else {
                continue;
            };
            out.push(self.raw(
                time_us,
                RawEventKind::TabletPadButton {
                    button: u32::from(button),
                    pressed,
                    group: 0,
                    mode: 0,
                },
            ));
        }
        if let Some(ring) = frame.ring {
            out.push(self.raw(
                time_us,
                RawEventKind::TabletPadRing {
                    ring: 0,
                    angle: self.ranges.wheel.normalize(ring) * 360.0,
                    source: PadSource::Finger,
                    group: 0,
                    mode: 0,
                },
            ));
        }
    }

    /// Release events for everything still held, as when the device goes away
    fn release_held(&mut self, counts: &mut PressCounter, time_us: u64, out: &mut Vec<RawEvent>) {
        let held: Vec<u16> = self.held.iter().copied().collect();
        for code in held {
            let kind = self.key_event(Key(code), false, counts);
            out.push(self.raw(time_us, kind));
        }
    }

    fn set_leds(&mut self, leds: Leds) -> io::Result<()> {
        let supported = match self.device.supported_leds() {
            Some(supported) => supported,
            None => return Ok(()),
        };
        let mut events = Vec::new();
        for (led, on) in [
            (LedType::LED_CAPSL, leds.caps_lock),
            (LedType::LED_NUML, leds.num_lock),
            (LedType::LED_SCROLLL, leds.scroll_lock),
        ] {
            if supported.contains(led) {
                events.push(InputEvent::new(EventType::LED, led.0, i32::from(on)));
            }
        }
        if events.is_empty() {
            return Ok(());
        }
        events.push(InputEvent::new(EventType::SYNCHRONIZATION, 0, 0));
        self.device.send_events(&events)
    }
}

fn tool_type(key: Key) -> Option<ToolType> {
    Some(match key {
        Key::BTN_TOOL_PEN => ToolType::Pen,
        Key::BTN_TOOL_RUBBER => ToolType::Eraser,
        Key::BTN_TOOL_BRUSH => ToolType::Brush,
        Key::BTN_TOOL_PENCIL => ToolType::Pencil,
        Key::BTN_TOOL_AIRBRUSH => ToolType::Airbrush,
        Key::BTN_TOOL_MOUSE => ToolType::Mouse,
        Key::BTN_TOOL_LENS => ToolType::Lens,
        _ => return None,
    })
}

fn axis_ranges(device: &Device) -> AxisRanges {
    let Ok(state) = device.get_abs_state() else {
        return AxisRanges::default();
    };
    let range = |axis: AbsoluteAxisType| {
        let info = state[usize::from(axis.0)];
        AxisRange {
            minimum: info.minimum,
            maximum: info.maximum,
            resolution: info.resolution,
        }
    };
    AxisRanges {
        x: range(AbsoluteAxisType::ABS_X),
        y: range(AbsoluteAxisType::ABS_Y),
        mt_x: range(AbsoluteAxisType::ABS_MT_POSITION_X),
        mt_y: range(AbsoluteAxisType::ABS_MT_POSITION_Y),
        pressure: range(AbsoluteAxisType::ABS_PRESSURE),
        distance: range(AbsoluteAxisType::ABS_DISTANCE),
        wheel: range(AbsoluteAxisType::ABS_WHEEL),
    }
}

/// Build the hotplug description of a kernel device from what it reports
fn describe(device: &Device, path: &Path) -> DeviceDescription {
    let supported_keys: Vec<u16> = device
        .supported_keys()
        .map(|keys| keys.iter().map(|k| k.code()).collect())
        .unwrap_or_default();
    let has_key = |key: Key| supported_keys.contains(&key.0);

    let rel = device.supported_relative_axes();
    let has_rel = |axis: RelativeAxisType| rel.is_some_and(|set| set.contains(axis));
    let abs = device.supported_absolute_axes();
    let has_abs = |axis: AbsoluteAxisType| abs.is_some_and(|set| set.contains(axis));
    let switches = device.supported_switches();

    let multitouch = has_abs(AbsoluteAxisType::ABS_MT_POSITION_X);
    let touchpad = multitouch && has_key(Key::BTN_TOOL_FINGER);
    let tablet_tool = has_key(Key::BTN_TOOL_PEN) && has_abs(AbsoluteAxisType::ABS_X);
    let tablet_pad = !tablet_tool && has_key(Key::BTN_MISC) && has_abs(AbsoluteAxisType::ABS_X);

    let tap_finger_count = if touchpad {
        [
            (Key::BTN_TOOL_QUINTTAP, 5),
            (Key::BTN_TOOL_QUADTAP, 4),
            (Key::BTN_TOOL_TRIPLETAP, 3),
            (Key::BTN_TOOL_DOUBLETAP, 2),
        ]
        .iter()
        .find(|(key, _)| has_key(*key))
        .map_or(1, |(_, count)| *count)
    } else {
        0
    };

    let pointer = (has_rel(RelativeAxisType::REL_X) && has_rel(RelativeAxisType::REL_Y))
        || (!multitouch && !tablet_tool && !tablet_pad
            && has_abs(AbsoluteAxisType::ABS_X)
            && has_key(Key::BTN_LEFT));

    let capabilities = DeviceCapabilities {
        keyboard: is_keyboard(&supported_keys),
        pointer,
        touch: multitouch && !touchpad,
        tablet_tool,
        tablet_pad,
        gesture: touchpad,
        switch: switches.is_some_and(|set| {
            set.contains(SwitchType::SW_LID) || set.contains(SwitchType::SW_TABLET_MODE)
        }),
        tap_finger_count,
        supported_keys,
    };

    let ranges = axis_ranges(device);
    let size_mm = ranges.x.length_mm().zip(ranges.y.length_mm());
    let id = device.input_id();

    DeviceDescription {
        name: device.name().unwrap_or("Unknown").to_string(),
        node: path.to_str().map(str::to_string),
        vendor_id: id.vendor(),
        product_id: id.product(),
        capabilities,
        size_mm,
        pad: Default::default(),
    }
}

/// Whether the seat has anything to do with a device
fn is_usable(desc: &DeviceDescription) -> bool {
    DeviceType::determine(&desc.capabilities) != DeviceType::Extension || desc.capabilities.switch
}

/// Kernel backend reading `/dev/input/event*` directly.
///
/// Devices are ungrabbed when the backend is dropped.
pub struct EvdevBackend {
    options: EvdevOptions,
    devices: IndexMap<DeviceHandle, OpenDevice>,
    monitor: Option<udev::MonitorSocket>,
    counts: PressCounter,
    pending: Vec<RawEvent>,
    next_handle: u64,
    clock: MonotonicClock,
    grabbed: bool,
    suspended: bool,
}

impl EvdevBackend {
    /// Open every matching device. Hotplug events for them are queued
    /// for the first dispatch.
    pub fn new(options: EvdevOptions, clock: MonotonicClock) -> BackendResult<Self> {
        let monitor = if options.hotplug {
            let socket = udev::MonitorBuilder::new()
                .and_then(|builder| builder.match_subsystem("input"))
                .and_then(|builder| builder.listen())
                .map_err(|e| BackendError::Udev(e.to_string()))?;
            Some(socket)
        } else {
            None
        };

        let mut backend = Self {
            options,
            devices: IndexMap::new(),
            monitor,
            counts: PressCounter::new(),
            pending: Vec::new(),
            next_handle: 1,
            clock,
            grabbed: false,
            suspended: false,
        };

        let mut paths: Vec<PathBuf> = evdev::enumerate().map(|(path, _)| path).collect();
        paths.sort();
        let time_us = backend.clock.now_us();
        for path in paths {
            backend.open_device(&path, time_us);
        }

        if backend.devices.is_empty() && backend.monitor.is_none() {
            return Err(BackendError::DeviceNotFound(
                "No usable input devices found".to_string(),
            ));
        }
        backend.grabbed = backend.options.grab;
        Ok(backend)
    }

    /// List every usable device without opening it for the seat
    pub fn list_devices() -> BackendResult<Vec<DeviceInfo>> {
        let mut devices_info = Vec::new();
        for (path, device) in evdev::enumerate() {
            let desc = describe(&device, &path);
            if !is_usable(&desc) {
                continue;
            }
            devices_info.push(DeviceInfo {
                index: devices_info.len(),
                name: desc.name,
                path: desc.node,
                device_type: DeviceType::determine(&desc.capabilities),
            });
        }

        if devices_info.is_empty() {
            return Err(BackendError::DeviceNotFound(
                "No usable input devices found".to_string(),
            ));
        }
        Ok(devices_info)
    }

    fn open_device(&mut self, path: &Path, time_us: u64) {
        if self.devices.values().any(|d| d.path == path) {
            return;
        }
        let handle = DeviceHandle(self.next_handle);
        let (mut device, desc) = match OpenDevice::open(path, handle) {
            Ok(opened) => opened,
            Err(e) => {
                log::debug!("cannot open {}: {}", path.display(), e);
                return;
            }
        };

        let node = path.to_str().unwrap_or_default();
        if !matches_device_filter(&desc.name, node, &self.options.filter, is_usable(&desc)) {
            return;
        }

        if self.options.grab {
            let _ = device.device.ungrab();
            if let Err(e) = device.device.grab() {
                log::warn!("cannot grab {}: {}", desc.name, e);
            }
        }

        log::info!("opened {} ({})", desc.name, node);
        self.next_handle += 1;
        self.pending
            .push(RawEvent::new(handle, time_us, RawEventKind::DeviceAdded(desc)));
        self.devices.insert(handle, device);
    }

    fn close_device(&mut self, handle: DeviceHandle, time_us: u64, out: &mut Vec<RawEvent>) {
        let Some(mut device) = self.devices.shift_remove(&handle) else {
            return;
        };
        log::info!("closed {} ({})", device.name(), device.path.display());
        device.release_held(&mut self.counts, time_us, out);
        if self.grabbed {
            let _ = device.device.ungrab();
        }
        out.push(RawEvent::new(handle, time_us, RawEventKind::DeviceRemoved));
    }

    fn process_hotplug(&mut self, time_us: u64, out: &mut Vec<RawEvent>) {
        let Some(monitor) = &self.monitor else {
            return;
        };
        let changes: Vec<(udev::EventType, PathBuf)> = monitor
            .iter()
            .filter_map(|event| {
                let node = event.devnode()?.to_path_buf();
                let is_event_node = node
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("event"));
                is_event_node.then(|| (event.event_type(), node))
            })
            .collect();

        for (event_type, node) in changes {
            match event_type {
                udev::EventType::Add => {
                    self.open_device(&node, time_us);
                    out.append(&mut self.pending);
                }
                udev::EventType::Remove => {
                    let handle = self
                        .devices
                        .values()
                        .find(|d| d.path == node)
                        .map(|d| d.handle);
                    if let Some(handle) = handle {
                        self.close_device(handle, time_us, out);
                    }
                }
                _ => {}
            }
        }
    }

    /// Descriptors with data, by poll index. Interruptions read as nothing ready.
    fn poll_ready(&self) -> BackendResult<Vec<bool>> {
        let mut poll_fds: Vec<libc::pollfd> = self
            .poll_fds()
            .into_iter()
            .map(|fd| libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let result = unsafe {
            libc::poll(
                poll_fds.as_mut_ptr(),
                poll_fds.len() as libc::nfds_t,
                0,
            )
        };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(vec![false; poll_fds.len()]);
            }
            return Err(BackendError::Io(err));
        }
        Ok(poll_fds
            .iter()
            .map(|p| p.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
            .collect())
    }

    /// Ungrab all devices
    pub fn ungrab_all(&mut self) {
        if self.grabbed {
            for device in self.devices.values_mut() {
                let _ = device.device.ungrab();
            }
            self.grabbed = false;
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl DeviceBackend for EvdevBackend {
    /// Device descriptors in handle order, then the udev monitor
    fn poll_fds(&self) -> Vec<RawFd> {
        let mut fds: Vec<RawFd> = self
            .devices
            .values()
            .map(|d| d.device.as_raw_fd())
            .collect();
        if let Some(monitor) = &self.monitor {
            fds.push(monitor.as_raw_fd());
        }
        fds
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn dispatch(&mut self) -> BackendResult<Vec<RawEvent>> {
        let mut out = std::mem::take(&mut self.pending);
        let ready = self.poll_ready()?;
        let time_us = self.clock.now_us();

        let readable: Vec<DeviceHandle> = self
            .devices
            .keys()
            .zip(ready.iter())
            .filter(|(_, ready)| **ready)
            .map(|(handle, _)| *handle)
            .collect();
        let monitor_ready = self.monitor.is_some() && ready.last().copied().unwrap_or(false);

        let mut gone = Vec::new();
        for handle in readable {
            let Some(device) = self.devices.get_mut(&handle) else {
                continue;
            };
            let fetched = device.device.fetch_events().map(|events| events.collect());
            let events: Vec<InputEvent> = match fetched {
                Ok(events) => events,
                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                    gone.push(handle);
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    log::warn!("reading {}: {}", device.name(), e);
                    continue;
                }
            };
            if self.suspended {
                continue;
            }
            for event in events {
                device.process(event, &mut self.counts, time_us, &mut out);
            }
        }

        for handle in gone {
            self.close_device(handle, time_us, &mut out);
        }
        if monitor_ready {
            self.process_hotplug(time_us, &mut out);
        }
        Ok(out)
    }

    fn update_leds(&mut self, leds: Leds) -> BackendResult<()> {
        for device in self.devices.values_mut() {
            if device.device_type != DeviceType::Keyboard {
                continue;
            }
            if let Err(e) = device.set_leds(leds) {
                log::debug!("setting LEDs on {}: {}", device.name(), e);
            }
        }
        Ok(())
    }

    fn suspend(&mut self) -> BackendResult<()> {
        if self.suspended {
            log::warn!("backend already suspended");
            return Ok(());
        }
        self.ungrab_all();
        for device in self.devices.values_mut() {
            device.held.clear();
            device.frame = Frame::default();
        }
        self.counts.clear();
        self.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> BackendResult<()> {
        if !self.suspended {
            log::warn!("backend not suspended");
            return Ok(());
        }
        if self.options.grab {
            for device in self.devices.values_mut() {
                if let Err(e) = device.device.grab() {
                    log::warn!("cannot grab {}: {}", device.name(), e);
                }
            }
            self.grabbed = true;
        }
        self.suspended = false;
        Ok(())
    }
}

impl Drop for EvdevBackend {
    fn drop(&mut self) {
        self.ungrab_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_normalize() {
        let range = AxisRange {
            minimum: 0,
            maximum: 200,
            resolution: 10,
        };
        assert_eq!(range.normalize(50), 0.25);
        assert_eq!(range.normalize(-10), 0.0);
        assert_eq!(range.normalize(400), 1.0);
        assert_eq!(range.length_mm(), Some(20.0));

        let empty = AxisRange::default();
        assert_eq!(empty.normalize(5), 0.0);
        assert_eq!(empty.length_mm(), None);
    }

    #[test]
    fn test_tool_codes() {
        assert_eq!(tool_type(Key::BTN_TOOL_RUBBER), Some(ToolType::Eraser));
        assert_eq!(tool_type(Key::BTN_TOOL_LENS), Some(ToolType::Lens));
        assert_eq!(tool_type(Key::BTN_TOOL_FINGER), None);
    }

    #[test]
    fn test_list_devices() {
        match EvdevBackend::list_devices() {
            Ok(devices) => {
                for device in &devices {
                    println!("  {}: {} ({:?})", device.index, device.name, device.path);
                }
            }
            Err(BackendError::DeviceNotFound(_)) => {
                println!("Skipping test: no input devices found");
            }
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
}
