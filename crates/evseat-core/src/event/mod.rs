// Evseat Events
// Normalized events produced by the seat and the stage-level queue

pub mod raw;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use strum_macros::Display;

use crate::input::{DeviceId, TabletAxes, TabletTool};
use crate::modifier::ModifierMask;
use crate::scroll::{ScrollDirection, ScrollFinish, ScrollSource};
use crate::Key;

/// Key state passed to `Seat::notify_key`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum KeyState {
    Released,
    Pressed,
    /// Autorepeat, never changes keyboard state
    Repeat,
}

impl KeyState {
    pub fn is_down(self) -> bool {
        !matches!(self, KeyState::Released)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TouchPhase {
    Begin,
    Update,
    End,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GesturePhase {
    Begin,
    Update,
    End,
    Cancel,
}

/// Source of a pad ring or strip event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PadSource {
    Unknown,
    Finger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SwitchKind {
    Lid,
    TabletMode,
}

/// Event flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventFlags {
    /// Produced by a virtual device
    pub synthetic: bool,
    /// Key autorepeat
    pub repeated: bool,
    /// Pointer event emulated from another one (discrete scroll from smooth)
    pub emulated: bool,
    /// Injected by an input method
    pub input_method: bool,
}

/// Relative motion carried on pointer motion events
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionDeltas {
    pub dx: f64,
    pub dy: f64,
    pub dx_unaccel: f64,
    pub dy_unaccel: f64,
}

/// Scroll payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollKind {
    Smooth {
        dx: f64,
        dy: f64,
        finish: ScrollFinish,
    },
    Discrete(ScrollDirection),
}

/// Normalized event payloads
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Key {
        key: Key,
        pressed: bool,
    },
    Motion {
        x: f32,
        y: f32,
        deltas: Option<MotionDeltas>,
        tool: Option<TabletTool>,
        axes: Option<TabletAxes>,
    },
    Button {
        /// Stage button number: 1 primary, 2 middle, 3 secondary
        button: u32,
        /// Evdev code that produced it
        code: Key,
        pressed: bool,
        x: f32,
        y: f32,
        tool: Option<TabletTool>,
    },
    Scroll {
        x: f32,
        y: f32,
        source: ScrollSource,
        scroll: ScrollKind,
    },
    Touch {
        phase: TouchPhase,
        /// Seat slot + 1, never zero
        sequence: u32,
        x: f32,
        y: f32,
    },
    Proximity {
        entering: bool,
        tool: Option<TabletTool>,
    },
    PadButton {
        button: u32,
        pressed: bool,
        group: u32,
        mode: u32,
    },
    PadRing {
        ring: u32,
        angle: f64,
        source: PadSource,
        group: u32,
        mode: u32,
    },
    PadStrip {
        strip: u32,
        value: f64,
        source: PadSource,
        group: u32,
        mode: u32,
    },
    Pinch {
        phase: GesturePhase,
        fingers: u32,
        x: f32,
        y: f32,
        dx: f64,
        dy: f64,
        angle_delta: f64,
        scale: f64,
    },
    Swipe {
        phase: GesturePhase,
        fingers: u32,
        x: f32,
        y: f32,
        dx: f64,
        dy: f64,
    },
    Switch {
        switch: SwitchKind,
        on: bool,
    },
    DeviceAdded,
    DeviceRemoved,
}

/// A normalized compositor input event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Monotonic timestamp in microseconds
    pub time_us: u64,
    /// Device the event is reported for: the core device for pointer and
    /// keyboard events, the device itself for tablets and pads
    pub device: DeviceId,
    /// Device that produced the event
    pub source_device: DeviceId,
    /// Effective modifiers and pointer buttons when the event happened
    pub modifiers: ModifierMask,
    pub flags: EventFlags,
    pub kind: EventKind,
}

impl Event {
    pub fn new(time_us: u64, device: DeviceId, source_device: DeviceId, kind: EventKind) -> Self {
        Self {
            time_us,
            device,
            source_device,
            modifiers: ModifierMask::NONE,
            flags: EventFlags::default(),
            kind,
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifierMask) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_flags(mut self, flags: EventFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Key and press state, if this is a key event
    pub fn key(&self) -> Option<(Key, bool)> {
        match self.kind {
            EventKind::Key { key, pressed } => Some((key, pressed)),
            _ => None,
        }
    }

    pub fn is_key_press(&self) -> bool {
        matches!(self.kind, EventKind::Key { pressed: true, .. })
    }

    /// Stage position for events that carry one
    pub fn position(&self) -> Option<(f32, f32)> {
        match self.kind {
            EventKind::Motion { x, y, .. }
            | EventKind::Button { x, y, .. }
            | EventKind::Scroll { x, y, .. }
            | EventKind::Touch { x, y, .. }
            | EventKind::Pinch { x, y, .. }
            | EventKind::Swipe { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match &self.kind {
            EventKind::Key { pressed: true, .. } => "key-press",
            EventKind::Key { .. } => "key-release",
            EventKind::Motion { .. } => "motion",
            EventKind::Button { pressed: true, .. } => "button-press",
            EventKind::Button { .. } => "button-release",
            EventKind::Scroll { .. } => "scroll",
            EventKind::Touch { phase, .. } => match phase {
                TouchPhase::Begin => "touch-begin",
                TouchPhase::Update => "touch-update",
                TouchPhase::End => "touch-end",
                TouchPhase::Cancel => "touch-cancel",
            },
            EventKind::Proximity { entering: true, .. } => "proximity-in",
            EventKind::Proximity { .. } => "proximity-out",
            EventKind::PadButton { pressed: true, .. } => "pad-button-press",
            EventKind::PadButton { .. } => "pad-button-release",
            EventKind::PadRing { .. } => "pad-ring",
            EventKind::PadStrip { .. } => "pad-strip",
            EventKind::Pinch { .. } => "touchpad-pinch",
            EventKind::Swipe { .. } => "touchpad-swipe",
            EventKind::Switch { .. } => "switch",
            EventKind::DeviceAdded => "device-added",
            EventKind::DeviceRemoved => "device-removed",
        }
    }
}

/// FIFO handed to the compositor. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct StageQueue {
    events: Arc<Mutex<VecDeque<Event>>>,
}

impl StageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.events.lock().push_back(event);
    }

    pub fn pop(&self) -> Option<Event> {
        self.events.lock().pop_front()
    }

    /// Take every queued event in order
    pub fn drain(&self) -> Vec<Event> {
        self.events.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(time_us: u64, pressed: bool) -> Event {
        Event::new(
            time_us,
            DeviceId(3),
            DeviceId(4),
            EventKind::Key {
                key: Key::A,
                pressed,
            },
        )
    }

    #[test]
    fn test_stage_queue_fifo_shared() {
        let queue = StageQueue::new();
        let consumer = queue.clone();
        queue.push(key_event(1, true));
        queue.push(key_event(2, false));
        assert_eq!(consumer.len(), 2);
        assert_eq!(consumer.pop().map(|e| e.time_us), Some(1));
        assert_eq!(queue.drain().len(), 1);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_key_accessors() {
        let event = key_event(5, true);
        assert_eq!(event.key(), Some((Key::A, true)));
        assert!(event.is_key_press());
        assert_eq!(event.name(), "key-press");
        assert!(event.position().is_none());
    }

    #[test]
    fn test_position_for_pointer_events() {
        let event = Event::new(
            0,
            DeviceId(2),
            DeviceId(5),
            EventKind::Button {
                button: 1,
                code: Key::BTN_LEFT,
                pressed: false,
                x: 10.0,
                y: 20.0,
                tool: None,
            },
        );
        assert_eq!(event.position(), Some((10.0, 20.0)));
        assert_eq!(event.name(), "button-release");
    }
}
