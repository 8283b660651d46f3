// Evseat Input Layer
// Devices, device ids, tablet tools and virtual devices

mod device;
mod filter;
mod ids;
mod tool;
mod virtual_device;

pub use device::{
    is_keyboard, DeviceCapabilities, DeviceMode, DeviceOrigin, DeviceType, InputDevice,
    MappingMode, PadLayout,
};
pub use filter::matches_device_filter;
pub use ids::{DeviceId, DeviceIdAllocator, INITIAL_DEVICE_ID};
pub use tool::{TabletAxes, TabletTool, ToolDescriptor, ToolSet, ToolType};
pub use virtual_device::{
    button_to_evdev, VirtualDeviceError, VirtualDeviceResult, VirtualInputDevice,
};
