// Evseat Seat - Tablets
// Tablet tools, pads and switches

use super::Seat;
use crate::event::raw::ToolSample;
use crate::event::{Event, EventKind, SwitchKind};
use crate::input::{DeviceId, MappingMode, ToolDescriptor};
use crate::notify::SeatNotification;
use crate::Key;

impl Seat {
    pub(super) fn process_tool_proximity(
        &mut self,
        device: DeviceId,
        time_us: u64,
        sample: &ToolSample,
        entering: bool,
    ) {
        if entering {
            self.set_current_tool(device, Some(sample.tool));
            self.notify_proximity(device, time_us, true);
            self.process_tool_axis(device, time_us, sample);
        } else {
            self.notify_proximity(device, time_us, false);
            self.set_current_tool(device, None);
        }
    }

    fn set_current_tool(&mut self, device: DeviceId, tool: Option<ToolDescriptor>) {
        let Some(input) = self.devices.get_mut(&device) else {
            return;
        };
        if input.tools.update(tool) {
            let current = input.tools.current();
            self.notifications.push(SeatNotification::ToolChanged {
                device,
                tool: current,
            });
        }
    }

    fn notify_proximity(&mut self, device: DeviceId, time_us: u64, entering: bool) {
        let Some(input) = self.devices.get(&device) else {
            return;
        };
        if !input.has_stage {
            return;
        }
        let tool = input.tools.current();
        let event = Event::new(time_us, device, device, EventKind::Proximity { entering, tool })
            .with_modifiers(self.modifiers())
            .with_flags(self.flags_for(device));
        self.queue.push_back(event);
    }

    /// Tool motion. Pucks and tablets in relative mapping move from the
    /// device's last position; everything else maps the tablet area onto
    /// the stage.
    pub(super) fn process_tool_axis(&mut self, device: DeviceId, time_us: u64, sample: &ToolSample) {
        let (Some(stage), Some(input)) = (self.stage, self.devices.get_mut(&device)) else {
            return;
        };
        if !input.has_stage {
            return;
        }

        let relative =
            input.mapping_mode == MappingMode::Relative || sample.tool.tool_type.is_puck();
        let (x, y) = if relative {
            let (x, y) = input.position;
            stage.clamp(x + sample.dx as f32, y + sample.dy as f32)
        } else {
            input.translate_coordinates(
                stage,
                (sample.x * f64::from(stage.width)) as f32,
                (sample.y * f64::from(stage.height)) as f32,
            )
        };
        input.position = (x, y);
        let tool = input.tools.current();

        let event = Event::new(
            time_us,
            device,
            device,
            EventKind::Motion {
                x,
                y,
                deltas: None,
                tool,
                axes: Some(sample.axes),
            },
        )
        .with_modifiers(self.modifiers())
        .with_flags(self.flags_for(device));
        self.queue.push_back(event);
    }

    /// Tip contact is reported as the primary button. The position is
    /// updated before a press and after a release.
    pub(super) fn process_tool_tip(&mut self, device: DeviceId, time_us: u64, sample: &ToolSample, down: bool) {
        if down {
            self.process_tool_axis(device, time_us, sample);
            self.notify_button(device, time_us, Key::BTN_TOUCH, true);
        } else {
            self.notify_button(device, time_us, Key::BTN_TOUCH, false);
            self.process_tool_axis(device, time_us, sample);
        }
    }

    pub(super) fn process_tool_button(
        &mut self,
        device: DeviceId,
        time_us: u64,
        sample: &ToolSample,
        button: Key,
        pressed: bool,
    ) {
        self.process_tool_axis(device, time_us, sample);
        self.notify_button(device, time_us, button, pressed);
    }

    /// Pad button, ring and strip events, reported for the pad itself
    pub(super) fn notify_pad(&mut self, device: DeviceId, time_us: u64, kind: EventKind) {
        if !self.has_stage(device) {
            return;
        }
        let event = Event::new(time_us, device, device, kind)
            .with_modifiers(self.modifiers())
            .with_flags(self.flags_for(device));
        self.queue.push_back(event);
    }

    pub(super) fn notify_switch(&mut self, device: DeviceId, time_us: u64, switch: SwitchKind, on: bool) {
        if !self.has_stage(device) {
            return;
        }
        log::debug!("{} switch {} on {}", switch, if on { "on" } else { "off" }, device);
        let event = Event::new(time_us, device, device, EventKind::Switch { switch, on })
            .with_flags(self.flags_for(device));
        self.queue.push_back(event);
    }
}
