// Evseat Input Layer - Devices
// Device capabilities, type classification and the per-device record

use std::collections::HashSet;
use strum_macros::{Display, EnumString};

use super::ids::DeviceId;
use super::tool::ToolSet;
use super::virtual_device::VirtualInputDevice;
use crate::a11y::{KeyboardA11yState, PointerA11yState};
use crate::coords::{CoordinateMapping, StageSize};
use crate::event::raw::{DeviceDescription, DeviceHandle};
use crate::modifier::ModifierMask;
use crate::touch::DeviceTouchMap;

/// What a device can report, as seen by the backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceCapabilities {
    pub keyboard: bool,
    pub pointer: bool,
    pub touch: bool,
    pub tablet_tool: bool,
    pub tablet_pad: bool,
    pub gesture: bool,
    pub switch: bool,
    /// Fingers the device can tap with; non-zero only for touchpads
    pub tap_finger_count: u32,
    /// Supported EV_KEY codes
    pub supported_keys: Vec<u16>,
}

impl DeviceCapabilities {
    /// Check if a specific key code is supported
    pub fn supports_key(&self, key_code: u16) -> bool {
        self.supported_keys.contains(&key_code)
    }

    /// Create a HashSet from supported keys for O(1) lookups
    pub fn key_set(&self) -> HashSet<u16> {
        self.supported_keys.iter().copied().collect()
    }
}

// QWERTY row key codes: Q, W, E, R, T, Y
const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];

// Representative A-Z and SPACE codes for keyboard detection
const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44]; // SPACE, A, Z

/// Whether a set of EV_KEY codes looks like a typing keyboard: the whole
/// QWERTY row plus A, Z and SPACE.
pub fn is_keyboard(supported_keys: &[u16]) -> bool {
    let key_set: HashSet<u16> = supported_keys.iter().copied().collect();

    let qwerty_present = QWERTY_CODES.iter().all(|code| key_set.contains(code));
    let az_present = A_Z_SPACE_CODES.iter().all(|code| key_set.contains(code));

    qwerty_present && az_present
}

/// Input device types the seat distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceType {
    Pointer,
    Keyboard,
    Extension,
    Touchpad,
    Touchscreen,
    Tablet,
    Pad,
}

impl DeviceType {
    /// Classify a device. The first matching capability wins, in order:
    /// tap fingers, tablet tool, tablet pad, pointer, touch, keyboard.
    pub fn determine(caps: &DeviceCapabilities) -> DeviceType {
        if caps.tap_finger_count > 0 {
            DeviceType::Touchpad
        } else if caps.tablet_tool {
            DeviceType::Tablet
        } else if caps.tablet_pad {
            DeviceType::Pad
        } else if caps.pointer {
            DeviceType::Pointer
        } else if caps.touch {
            DeviceType::Touchscreen
        } else if caps.keyboard {
            DeviceType::Keyboard
        } else {
            DeviceType::Extension
        }
    }

    /// Devices whose events go through the core pointer
    pub fn is_pointer_like(self) -> bool {
        matches!(
            self,
            DeviceType::Pointer | DeviceType::Touchpad | DeviceType::Touchscreen
        )
    }
}

/// How a device relates to the seat's core devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceMode {
    /// Core pointer or core keyboard
    Logical,
    /// Attached to a core device
    Physical,
    /// Not attached to anything
    Floating,
}

/// Tablet mapping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MappingMode {
    #[default]
    Absolute,
    Relative,
}

/// Where a device's events come from
#[derive(Debug, Clone)]
pub enum DeviceOrigin {
    /// The seat's core pointer or keyboard
    Core,
    /// Hardware device known to the backend
    Physical(DeviceHandle),
    /// Seat-created injection device
    Virtual(VirtualInputDevice),
}

/// Pad layout reported at hotplug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadLayout {
    pub rings: u32,
    pub strips: u32,
    pub mode_groups: u32,
}

impl Default for PadLayout {
    fn default() -> Self {
        Self {
            rings: 0,
            strips: 0,
            mode_groups: 1,
        }
    }
}

/// One device registered with a seat
#[derive(Debug)]
pub struct InputDevice {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
    pub mode: DeviceMode,
    pub origin: DeviceOrigin,
    pub capabilities: DeviceCapabilities,
    /// Four hex digits, as udev prints them
    pub vendor_id: String,
    pub product_id: String,
    pub node: Option<String>,
    /// Core device this one is attached to
    pub master: Option<DeviceId>,
    pub mapping: CoordinateMapping,
    pub mapping_mode: MappingMode,
    pub pad: PadLayout,
    pub has_stage: bool,
    /// Last position reported by this device (tablets track their own)
    pub position: (f32, f32),
    /// Effective state recorded on core devices after each event
    pub state: ModifierMask,
    pub touches: DeviceTouchMap,
    pub tools: ToolSet,
    pub kbd_a11y: Option<KeyboardA11yState>,
    pub pointer_a11y: Option<PointerA11yState>,
}

impl InputDevice {
    fn base(id: DeviceId, name: String, device_type: DeviceType, mode: DeviceMode) -> Self {
        Self {
            id,
            name,
            device_type,
            mode,
            origin: DeviceOrigin::Core,
            capabilities: DeviceCapabilities::default(),
            vendor_id: String::new(),
            product_id: String::new(),
            node: None,
            master: None,
            mapping: CoordinateMapping::default(),
            mapping_mode: MappingMode::default(),
            pad: PadLayout::default(),
            has_stage: false,
            position: (0.0, 0.0),
            state: ModifierMask::NONE,
            touches: DeviceTouchMap::default(),
            tools: ToolSet::default(),
            kbd_a11y: None,
            pointer_a11y: None,
        }
    }

    /// Core pointer or keyboard of a seat
    pub fn new_core(id: DeviceId, device_type: DeviceType) -> Self {
        let name = match device_type {
            DeviceType::Keyboard => "Virtual core keyboard",
            _ => "Virtual core pointer",
        };
        Self::base(id, name.to_string(), device_type, DeviceMode::Logical)
    }

    /// Hardware device from a hotplug description
    pub fn new_physical(id: DeviceId, handle: DeviceHandle, desc: &DeviceDescription) -> Self {
        let device_type = DeviceType::determine(&desc.capabilities);
        let mut device = Self::base(id, desc.name.clone(), device_type, DeviceMode::Physical);
        device.origin = DeviceOrigin::Physical(handle);
        device.capabilities = desc.capabilities.clone();
        device.vendor_id = format!("{:04x}", desc.vendor_id);
        device.product_id = format!("{:04x}", desc.product_id);
        device.node = desc.node.clone();
        if device_type == DeviceType::Pad {
            device.pad = desc.pad;
        }
        if let Some((width, height)) = desc.size_mm {
            if height > 0.0 {
                device.mapping.device_aspect_ratio = width / height;
            }
        }
        device
    }

    /// Seat-created injection device
    pub fn new_virtual(id: DeviceId, device_type: DeviceType) -> Self {
        let name = match device_type {
            DeviceType::Keyboard => "Virtual keyboard device for seat",
            DeviceType::Pointer => "Virtual pointer device for seat",
            DeviceType::Touchscreen => "Virtual touchscreen device for seat",
            _ => "Virtual device for seat",
        };
        let mut device = Self::base(id, name.to_string(), device_type, DeviceMode::Physical);
        device.origin = DeviceOrigin::Virtual(VirtualInputDevice::new());
        device
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.origin, DeviceOrigin::Virtual(_))
    }

    pub fn handle(&self) -> Option<DeviceHandle> {
        match self.origin {
            DeviceOrigin::Physical(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn virtual_state_mut(&mut self) -> Option<&mut VirtualInputDevice> {
        match &mut self.origin {
            DeviceOrigin::Virtual(state) => Some(state),
            _ => None,
        }
    }

    /// Map a stage-scaled absolute position through this device's
    /// transform and aspect correction
    pub fn translate_coordinates(&self, stage: StageSize, x: f32, y: f32) -> (f32, f32) {
        self.mapping.translate(stage, x, y)
    }
}
