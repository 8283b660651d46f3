// Evseat Seat Notifications
// Out-of-band signals the seat raises besides normalized events

use strum_macros::Display;

use crate::a11y::{DwellClickType, KbdA11yFlags};
use crate::input::{DeviceId, TabletTool};
use crate::modifier::{Leds, ModifierMask};

/// Pointer accessibility timeout kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PointerA11yTimeout {
    SecondaryClick,
    Dwell,
    Gesture,
}

/// Notifications drained with `Seat::take_notifications`
#[derive(Debug, Clone, PartialEq)]
pub enum SeatNotification {
    /// Keyboard accessibility flags changed from inside the pipeline
    /// (toggle gesture, slow keys watchdog, sticky keys two-key off)
    KbdA11yFlagsChanged {
        flags: KbdA11yFlags,
        changed: KbdA11yFlags,
    },
    /// Sticky keys latched/locked masks changed
    KbdA11yModsStateChanged {
        latched: ModifierMask,
        locked: ModifierMask,
    },
    /// Audible feedback requested by keyboard accessibility
    Bell,
    PtrA11yTimeoutStarted {
        device: DeviceId,
        timeout: PointerA11yTimeout,
        delay_ms: u32,
    },
    PtrA11yTimeoutStopped {
        device: DeviceId,
        timeout: PointerA11yTimeout,
        completed: bool,
    },
    PtrA11yDwellClickTypeChanged(DwellClickType),
    ToolChanged {
        device: DeviceId,
        tool: Option<TabletTool>,
    },
    LedsChanged(Leds),
}

impl SeatNotification {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SeatNotification::KbdA11yFlagsChanged { .. } => "kbd-a11y-flags-changed",
            SeatNotification::KbdA11yModsStateChanged { .. } => "kbd-a11y-mods-state-changed",
            SeatNotification::Bell => "bell",
            SeatNotification::PtrA11yTimeoutStarted { .. } => "ptr-a11y-timeout-started",
            SeatNotification::PtrA11yTimeoutStopped { .. } => "ptr-a11y-timeout-stopped",
            SeatNotification::PtrA11yDwellClickTypeChanged(_) => {
                "ptr-a11y-dwell-click-type-changed"
            }
            SeatNotification::ToolChanged { .. } => "tool-changed",
            SeatNotification::LedsChanged(_) => "leds-changed",
        }
    }
}
