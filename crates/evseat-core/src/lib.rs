// Evseat Core Library
// Native input seat pipeline: raw device events in, normalized stage events out

pub mod a11y;
pub mod backend;
pub mod coords;
pub mod dispatch;
pub mod event;
pub mod input;
pub mod key;
pub mod modifier;
pub mod notify;
pub mod repeat;
pub mod scroll;
pub mod seat;
pub mod timer;
pub mod touch;

#[cfg(feature = "pure-rust")]
pub mod settings;

pub use a11y::{
    DwellClickType, DwellDirection, DwellMode, KbdA11yFlags, KbdA11ySettings, PointerA11ySettings,
};
pub use backend::{BackendError, BackendResult, DeviceBackend, PressCounter, ScriptedBackend};
pub use coords::{CoordinateMapping, StageSize, TransformMatrix};
pub use dispatch::{EventSource, Prepare};
pub use event::raw::{DeviceDescription, DeviceHandle, RawEvent, RawEventKind};
pub use event::{Event, EventFlags, EventKind, KeyState, StageQueue};
pub use input::{
    matches_device_filter, DeviceCapabilities, DeviceId, DeviceType, InputDevice,
    VirtualDeviceError, VirtualDeviceResult,
};
pub use key::{CodeKind, Key};
pub use modifier::{Leds, ModifierMask};
pub use notify::SeatNotification;
pub use repeat::RepeatConfig;
pub use scroll::{ScrollDirection, ScrollSource};
pub use seat::{FilterDecision, FilterId, Seat, SeatConfig, SeatError, SeatResult};
pub use timer::{Clock, ManualClock, MonotonicClock};

#[cfg(feature = "pure-rust")]
pub use backend::{DeviceInfo, EvdevBackend, EvdevOptions};
#[cfg(feature = "pure-rust")]
pub use settings::{Settings, SettingsError};
