// Evseat Raw Events
// Events as delivered by a device backend, before normalization

use crate::input::{DeviceCapabilities, PadLayout, TabletAxes, ToolDescriptor};
use crate::scroll::ScrollSource;
use crate::Key;

use super::{GesturePhase, PadSource, SwitchKind};

/// Backend-side identifier of a hardware device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub u64);

/// Static description of a device, delivered with its hotplug event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceDescription {
    pub name: String,
    pub node: Option<String>,
    pub vendor_id: u16,
    pub product_id: u16,
    pub capabilities: DeviceCapabilities,
    /// Physical size in millimetres, when known
    pub size_mm: Option<(f64, f64)>,
    pub pad: PadLayout,
}

/// One raw event from a backend
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub device: DeviceHandle,
    /// Monotonic timestamp in microseconds
    pub time_us: u64,
    pub kind: RawEventKind,
}

impl RawEvent {
    pub fn new(device: DeviceHandle, time_us: u64, kind: RawEventKind) -> Self {
        Self {
            device,
            time_us,
            kind,
        }
    }
}

/// Tablet tool event payload shared by proximity, axis, tip and button
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSample {
    pub tool: ToolDescriptor,
    /// Position normalized to `0.0..=1.0` of the tablet area
    pub x: f64,
    pub y: f64,
    /// Relative motion in pointer units, used in relative mapping
    pub dx: f64,
    pub dy: f64,
    pub axes: TabletAxes,
}

/// Raw event payloads.
///
/// Key and button events carry the seat-wide press count the backend
/// computed across every device that reports the same code.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEventKind {
    DeviceAdded(DeviceDescription),
    DeviceRemoved,
    Key {
        key: Key,
        pressed: bool,
        seat_count: u32,
    },
    PointerMotion {
        dx: f64,
        dy: f64,
        dx_unaccel: f64,
        dy_unaccel: f64,
    },
    /// Position normalized to `0.0..=1.0`
    PointerMotionAbsolute {
        x: f64,
        y: f64,
    },
    PointerButton {
        button: Key,
        pressed: bool,
        seat_count: u32,
    },
    /// Axis values are `None` when the axis is not part of the event.
    /// Wheel sources fill the discrete values as well.
    PointerAxis {
        source: ScrollSource,
        horizontal: Option<f64>,
        vertical: Option<f64>,
        discrete_horizontal: Option<f64>,
        discrete_vertical: Option<f64>,
    },
    /// Touch positions normalized to `0.0..=1.0`
    TouchDown {
        slot: i32,
        x: f64,
        y: f64,
    },
    TouchMotion {
        slot: i32,
        x: f64,
        y: f64,
    },
    TouchUp {
        slot: i32,
    },
    TouchCancel {
        slot: i32,
    },
    TouchFrame,
    TabletToolProximity {
        sample: ToolSample,
        entering: bool,
    },
    TabletToolAxis {
        sample: ToolSample,
    },
    TabletToolTip {
        sample: ToolSample,
        down: bool,
    },
    TabletToolButton {
        sample: ToolSample,
        button: Key,
        pressed: bool,
        seat_count: u32,
    },
    TabletPadButton {
        button: u32,
        pressed: bool,
        group: u32,
        mode: u32,
    },
    TabletPadRing {
        ring: u32,
        angle: f64,
        source: PadSource,
        group: u32,
        mode: u32,
    },
    TabletPadStrip {
        strip: u32,
        position: f64,
        source: PadSource,
        group: u32,
        mode: u32,
    },
    GesturePinch {
        phase: GesturePhase,
        fingers: u32,
        dx: f64,
        dy: f64,
        angle_delta: f64,
        scale: f64,
    },
    GestureSwipe {
        phase: GesturePhase,
        fingers: u32,
        dx: f64,
        dy: f64,
    },
    Switch {
        switch: SwitchKind,
        on: bool,
    },
}

impl RawEventKind {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            RawEventKind::DeviceAdded(_) => "device-added",
            RawEventKind::DeviceRemoved => "device-removed",
            RawEventKind::Key { .. } => "key",
            RawEventKind::PointerMotion { .. } => "pointer-motion",
            RawEventKind::PointerMotionAbsolute { .. } => "pointer-motion-absolute",
            RawEventKind::PointerButton { .. } => "pointer-button",
            RawEventKind::PointerAxis { .. } => "pointer-axis",
            RawEventKind::TouchDown { .. } => "touch-down",
            RawEventKind::TouchMotion { .. } => "touch-motion",
            RawEventKind::TouchUp { .. } => "touch-up",
            RawEventKind::TouchCancel { .. } => "touch-cancel",
            RawEventKind::TouchFrame => "touch-frame",
            RawEventKind::TabletToolProximity { .. } => "tablet-tool-proximity",
            RawEventKind::TabletToolAxis { .. } => "tablet-tool-axis",
            RawEventKind::TabletToolTip { .. } => "tablet-tool-tip",
            RawEventKind::TabletToolButton { .. } => "tablet-tool-button",
            RawEventKind::TabletPadButton { .. } => "tablet-pad-button",
            RawEventKind::TabletPadRing { .. } => "tablet-pad-ring",
            RawEventKind::TabletPadStrip { .. } => "tablet-pad-strip",
            RawEventKind::GesturePinch { .. } => "gesture-pinch",
            RawEventKind::GestureSwipe { .. } => "gesture-swipe",
            RawEventKind::Switch { .. } => "switch",
        }
    }
}
