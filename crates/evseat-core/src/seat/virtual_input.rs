// Evseat Seat - Virtual Input
// Seat-created devices for injecting events

use super::{Seat, SeatError, SeatResult};
use crate::event::{Event, EventKind, KeyState};
use crate::input::{
    button_to_evdev, DeviceId, DeviceType, InputDevice, VirtualDeviceError, VirtualDeviceResult,
    VirtualInputDevice,
};
use crate::key::CodeKind;
use crate::scroll::{ScrollDirection, ScrollFinish, ScrollSource};
use crate::Key;

impl Seat {
    /// Create a virtual device attached to the matching core device
    pub fn create_virtual_device(&mut self, device_type: DeviceType) -> DeviceId {
        let id = self.ids.acquire();
        let mut device = InputDevice::new_virtual(id, device_type);
        device.has_stage = self.stage.is_some();
        device.master = Some(if device_type == DeviceType::Keyboard {
            self.core_keyboard
        } else {
            self.core_pointer
        });

        log::info!("created virtual {} device {}", device_type, id);
        self.devices.insert(id, device);
        self.queue
            .push_back(Event::new(self.time_us, id, id, EventKind::DeviceAdded));
        id
    }

    /// Remove a virtual device. Keys and buttons it still holds are
    /// released and its touch contacts cancelled first.
    ///
    /// The pointers the seat emits accessibility clicks and mouse keys
    /// through are refused; they go away with their feature.
    pub fn remove_virtual_device(&mut self, id: DeviceId) -> SeatResult<()> {
        if self.is_seat_owned(id) {
            return Err(SeatError::SeatOwned(id));
        }
        self.destroy_virtual_device(id)
    }

    /// Whether the seat itself emits through this virtual device
    pub fn is_seat_owned(&self, id: DeviceId) -> bool {
        self.a11y_virtual_pointer() == Some(id)
            || self.devices.values().any(|d| {
                d.kbd_a11y
                    .as_ref()
                    .is_some_and(|a11y| a11y.mousekeys().virtual_device() == Some(id))
            })
    }

    pub(super) fn destroy_virtual_device(&mut self, id: DeviceId) -> SeatResult<()> {
        let device = self
            .devices
            .get_mut(&id)
            .ok_or(SeatError::UnknownDevice(id))?;
        let held = device
            .virtual_state_mut()
            .ok_or(SeatError::NotVirtual(id))?
            .pressed_codes();

        let time_us = self.time_us;
        for code in held {
            log::debug!("releasing {} held by {}", code, id);
            if code.kind() == CodeKind::Button {
                self.notify_button(id, time_us, code, false);
            } else {
                self.notify_key(id, time_us, code, KeyState::Released, true);
            }
        }
        self.release_touch_slots(id, time_us);

        self.devices.shift_remove(&id);
        self.ids.release(id);
        log::info!("removed virtual device {}", id);
        self.queue
            .push_back(Event::new(time_us, id, id, EventKind::DeviceRemoved));
        Ok(())
    }

    fn virtual_state(&mut self, id: DeviceId) -> VirtualDeviceResult<&mut VirtualInputDevice> {
        self.devices
            .get_mut(&id)
            .and_then(InputDevice::virtual_state_mut)
            .ok_or_else(|| VirtualDeviceError::UnknownDevice(id.to_string()))
    }

    pub fn virtual_notify_key(
        &mut self,
        id: DeviceId,
        time_us: u64,
        key: Key,
        pressed: bool,
    ) -> VirtualDeviceResult<()> {
        self.virtual_state(id)?.update_key(key, pressed)?;
        let state = if pressed {
            KeyState::Pressed
        } else {
            KeyState::Released
        };
        self.notify_key(id, time_us, key, state, true);
        Ok(())
    }

    /// Press or release a button given its stage button number
    pub fn virtual_notify_button(
        &mut self,
        id: DeviceId,
        time_us: u64,
        button: u32,
        pressed: bool,
    ) -> VirtualDeviceResult<()> {
        let code = button_to_evdev(button)?;
        self.virtual_state(id)?.update_button(code, pressed)?;
        self.notify_button(id, time_us, code, pressed);
        Ok(())
    }

    pub fn virtual_notify_relative_motion(
        &mut self,
        id: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
    ) -> VirtualDeviceResult<()> {
        self.virtual_state(id)?;
        self.notify_relative_motion(id, time_us, dx, dy, dx, dy);
        Ok(())
    }

    /// Warp the pointer to a stage position
    pub fn virtual_notify_absolute_motion(
        &mut self,
        id: DeviceId,
        time_us: u64,
        x: f32,
        y: f32,
    ) -> VirtualDeviceResult<()> {
        self.virtual_state(id)?;
        self.notify_absolute_motion(id, time_us, x, y, None);
        Ok(())
    }

    pub fn virtual_notify_discrete_scroll(
        &mut self,
        id: DeviceId,
        time_us: u64,
        direction: ScrollDirection,
        source: ScrollSource,
    ) -> VirtualDeviceResult<()> {
        self.virtual_state(id)?;
        let (dx, dy) = match direction {
            ScrollDirection::Up => (0.0, -1.0),
            ScrollDirection::Down => (0.0, 1.0),
            ScrollDirection::Left => (-1.0, 0.0),
            ScrollDirection::Right => (1.0, 0.0),
        };
        self.notify_discrete_scroll(id, time_us, dx, dy, source);
        Ok(())
    }

    pub fn virtual_notify_scroll_continuous(
        &mut self,
        id: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
        source: ScrollSource,
        finish: ScrollFinish,
    ) -> VirtualDeviceResult<()> {
        self.virtual_state(id)?;
        self.notify_scroll_continuous(id, time_us, dx, dy, source, finish);
        Ok(())
    }
}
