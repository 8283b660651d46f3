// Evseat Seat - Pointer
// Motion, buttons, scrolling and touchpad gestures on the core pointer

use super::Seat;
use crate::a11y::A11yContext;
use crate::event::{Event, EventFlags, EventKind, GesturePhase, MotionDeltas, ScrollKind};
use crate::input::{DeviceId, DeviceType};
use crate::modifier::ModifierMask;
use crate::scroll::{ScrollAccumulator, ScrollFinish, ScrollSource, ScrollStep, ScrollSteps};
use crate::Key;

/// Highest button number the seat reports
pub const MAX_BUTTON: u32 = 12;

/// Map an evdev button code to a stage button number.
///
/// Tablet tool buttons count from `BTN_TOOL_PEN`, everything else from
/// `BTN_LEFT`; numbers outside `1..=12` are not reported.
pub fn button_number(code: Key, tablet: bool) -> Option<u32> {
    let number = match code {
        Key::BTN_LEFT | Key::BTN_TOUCH => 1,
        Key::BTN_MIDDLE | Key::BTN_STYLUS2 => 2,
        Key::BTN_RIGHT | Key::BTN_STYLUS => 3,
        Key::BTN_STYLUS3 => 8,
        _ if tablet => u32::from(code.0).checked_sub(u32::from(Key::BTN_TOOL_PEN.0))? + 4,
        _ => u32::from(code.0).checked_sub(u32::from(Key::BTN_LEFT.0) - 1)? + 4,
    };
    (1..=MAX_BUTTON).contains(&number).then_some(number)
}

impl Seat {
    pub(super) fn modifiers(&self) -> ModifierMask {
        self.keyboard.effective() | self.button_state
    }

    pub(super) fn flags_for(&self, device: DeviceId) -> EventFlags {
        EventFlags {
            synthetic: self.is_synthetic(device),
            ..Default::default()
        }
    }

    /// Clamp a proposed pointer position, through the configured
    /// constraint when there is one
    fn constrain(&self, device: DeviceId, time_us: u64, proposed: (f32, f32)) -> (f32, f32) {
        match (&self.constrain_pointer, self.stage) {
            (Some(constrain), _) => constrain(device, time_us, self.pointer, proposed),
            (None, Some(stage)) => stage.clamp(proposed.0, proposed.1),
            (None, None) => proposed,
        }
    }

    pub(crate) fn notify_relative_motion(
        &mut self,
        device: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
        dx_unaccel: f64,
        dy_unaccel: f64,
    ) {
        let (dx, dy) = match &self.motion_filter {
            Some(filter) => filter(device, self.pointer, dx, dy),
            None => (dx, dy),
        };
        let x = self.pointer.0 + dx as f32;
        let y = self.pointer.1 + dy as f32;
        let deltas = MotionDeltas {
            dx,
            dy,
            dx_unaccel,
            dy_unaccel,
        };
        self.notify_absolute_motion(device, time_us, x, y, Some(deltas));
    }

    /// Absolute pointer motion, position normalized to the device area
    pub(super) fn process_absolute_motion(&mut self, device: DeviceId, time_us: u64, x: f64, y: f64) {
        let (Some(stage), Some(input)) = (self.stage, self.devices.get(&device)) else {
            return;
        };
        let (x, y) = input.translate_coordinates(
            stage,
            (x * f64::from(stage.width)) as f32,
            (y * f64::from(stage.height)) as f32,
        );
        self.notify_absolute_motion(device, time_us, x, y, None);
    }

    /// Move the core pointer to a stage position
    pub(crate) fn notify_absolute_motion(
        &mut self,
        device: DeviceId,
        time_us: u64,
        x: f32,
        y: f32,
        deltas: Option<MotionDeltas>,
    ) {
        if !self.has_stage(device) {
            return;
        }

        let (x, y) = self.constrain(device, time_us, (x, y));
        self.pointer = (x, y);

        let flags = self.flags_for(device);
        let event = Event::new(
            time_us,
            self.core_pointer,
            device,
            EventKind::Motion {
                x,
                y,
                deltas,
                tool: None,
                axes: None,
            },
        )
        .with_modifiers(self.modifiers())
        .with_flags(flags);
        self.queue.push_back(event);

        if !flags.synthetic {
            self.pointer_a11y_motion(x, y, time_us);
        }
    }

    /// Emit a button event. `code` is the evdev code; the event carries
    /// the stage button number.
    pub(crate) fn notify_button(&mut self, device: DeviceId, time_us: u64, code: Key, pressed: bool) {
        if !self.update_button_count(code, pressed) {
            log::trace!("dropping repeated {} from {}", code, device);
            return;
        }

        let Some(input) = self.devices.get(&device) else {
            return;
        };
        if !input.has_stage {
            return;
        }

        let tablet = input.device_type == DeviceType::Tablet;
        let Some(button) = button_number(code, tablet) else {
            log::warn!("unhandled button {} ({:#x}) on {}", code, code.0, device);
            return;
        };

        let mask = ModifierMask::for_button(button);
        if pressed {
            self.button_state |= mask;
        } else {
            self.button_state &= !mask;
        }

        let (event_device, (x, y), tool) = if tablet {
            (device, input.position, input.tools.current())
        } else {
            (self.core_pointer, self.pointer, None)
        };

        let flags = self.flags_for(device);
        let event = Event::new(
            time_us,
            event_device,
            device,
            EventKind::Button {
                button,
                code,
                pressed,
                x,
                y,
                tool,
            },
        )
        .with_modifiers(self.modifiers())
        .with_flags(flags);
        self.queue.push_back(event);

        if !flags.synthetic && event_device == self.core_pointer {
            self.pointer_a11y_button(button, pressed, time_us);
        }
    }

    /// Scroll from a pointer axis event. Wheels report discrete steps,
    /// other sources smooth deltas where a zero on a present axis ends
    /// that axis' scroll sequence.
    pub(super) fn process_axis(
        &mut self,
        device: DeviceId,
        time_us: u64,
        source: ScrollSource,
        (horizontal, vertical): (Option<f64>, Option<f64>),
        (discrete_horizontal, discrete_vertical): (Option<f64>, Option<f64>),
    ) {
        if source == ScrollSource::Wheel {
            self.notify_discrete_scroll(
                device,
                time_us,
                discrete_horizontal.unwrap_or(0.0),
                discrete_vertical.unwrap_or(0.0),
                source,
            );
            return;
        }

        let finish = ScrollFinish {
            horizontal: horizontal.is_some_and(|v| v.abs() < f64::EPSILON),
            vertical: vertical.is_some_and(|v| v.abs() < f64::EPSILON),
        };
        self.notify_scroll_continuous(
            device,
            time_us,
            horizontal.unwrap_or(0.0),
            vertical.unwrap_or(0.0),
            source,
            finish,
        );
    }

    pub(crate) fn notify_scroll_continuous(
        &mut self,
        device: DeviceId,
        time_us: u64,
        dx: f64,
        dy: f64,
        source: ScrollSource,
        finish: ScrollFinish,
    ) {
        if !self.has_stage(device) {
            return;
        }
        let steps = self.scroll.accumulate(dx, dy, finish);
        self.emit_scroll(device, time_us, source, steps);
    }

    pub(crate) fn notify_discrete_scroll(
        &mut self,
        device: DeviceId,
        time_us: u64,
        discrete_dx: f64,
        discrete_dy: f64,
        source: ScrollSource,
    ) {
        if !self.has_stage(device) {
            return;
        }
        let steps = ScrollAccumulator::discrete(discrete_dx, discrete_dy);
        self.emit_scroll(device, time_us, source, steps);
    }

    fn emit_scroll(&mut self, device: DeviceId, time_us: u64, source: ScrollSource, steps: ScrollSteps) {
        let (x, y) = self.pointer;
        let modifiers = self.modifiers();
        let synthetic = self.is_synthetic(device);

        for step in steps {
            let (scroll, emulated) = match step {
                ScrollStep::Smooth {
                    dx,
                    dy,
                    finish,
                    emulated,
                } => (ScrollKind::Smooth { dx, dy, finish }, emulated),
                ScrollStep::Discrete {
                    direction,
                    emulated,
                } => (ScrollKind::Discrete(direction), emulated),
            };
            let event = Event::new(
                time_us,
                self.core_pointer,
                device,
                EventKind::Scroll {
                    x,
                    y,
                    source,
                    scroll,
                },
            )
            .with_modifiers(modifiers)
            .with_flags(EventFlags {
                synthetic,
                emulated,
                ..Default::default()
            });
            self.queue.push_back(event);
        }
    }

    pub(super) fn notify_pinch(
        &mut self,
        device: DeviceId,
        time_us: u64,
        phase: GesturePhase,
        fingers: u32,
        (dx, dy): (f64, f64),
        angle_delta: f64,
        scale: f64,
    ) {
        if !self.has_stage(device) {
            return;
        }
        let (x, y) = self.pointer;
        let event = Event::new(
            time_us,
            self.core_pointer,
            device,
            EventKind::Pinch {
                phase,
                fingers,
                x,
                y,
                dx,
                dy,
                angle_delta,
                scale,
            },
        )
        .with_modifiers(self.modifiers());
        self.queue.push_back(event);
    }

    pub(super) fn notify_swipe(
        &mut self,
        device: DeviceId,
        time_us: u64,
        phase: GesturePhase,
        fingers: u32,
        (dx, dy): (f64, f64),
    ) {
        if !self.has_stage(device) {
            return;
        }
        let (x, y) = self.pointer;
        let event = Event::new(
            time_us,
            self.core_pointer,
            device,
            EventKind::Swipe {
                phase,
                fingers,
                x,
                y,
                dx,
                dy,
            },
        )
        .with_modifiers(self.modifiers());
        self.queue.push_back(event);
    }

    fn pointer_a11y_motion(&mut self, x: f32, y: f32, time_us: u64) {
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
            a11y.on_motion(&mut ctx, &settings, x, y, time_us);
        }
        self.apply_effects(effects);
    }

    fn pointer_a11y_button(&mut self, button: u32, pressed: bool, time_us: u64) {
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
            a11y.on_button(&mut ctx, &settings, button, pressed, time_us);
        }
        self.apply_effects(effects);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{add, drain, pointer_desc, seat, STAGE};
    use super::super::{Seat, SeatConfig};
    use super::*;
    use crate::a11y::PointerA11ySettings;
    use crate::event::raw::{DeviceHandle, RawEvent, RawEventKind};
    use crate::scroll::ScrollDirection;

    fn motion(seat: &mut Seat, time_us: u64, dx: f64, dy: f64) {
        seat.process_raw(RawEvent::new(
            DeviceHandle(1),
            time_us,
            RawEventKind::PointerMotion {
                dx,
                dy,
                dx_unaccel: dx,
                dy_unaccel: dy,
            },
        ));
    }

    fn button(seat: &mut Seat, time_us: u64, code: Key, pressed: bool) {
        seat.process_raw(RawEvent::new(
            DeviceHandle(1),
            time_us,
            RawEventKind::PointerButton {
                button: code,
                pressed,
                seat_count: u32::from(pressed),
            },
        ));
    }

    fn axis(seat: &mut Seat, source: ScrollSource, value: Option<f64>, discrete: Option<f64>) {
        seat.process_raw(RawEvent::new(
            DeviceHandle(1),
            0,
            RawEventKind::PointerAxis {
                source,
                horizontal: None,
                vertical: value,
                discrete_horizontal: None,
                discrete_vertical: discrete,
            },
        ));
    }

    #[test]
    fn test_button_numbers() {
        assert_eq!(button_number(Key::BTN_LEFT, false), Some(1));
        assert_eq!(button_number(Key::BTN_MIDDLE, false), Some(2));
        assert_eq!(button_number(Key::BTN_RIGHT, false), Some(3));
        assert_eq!(button_number(Key::BTN_SIDE, false), Some(8));
        assert_eq!(button_number(Key::BTN_EXTRA, false), Some(9));
        assert_eq!(button_number(Key::BTN_STYLUS, true), Some(3));
        assert_eq!(button_number(Key::BTN_STYLUS3, true), Some(8));
        assert_eq!(button_number(Key::from(0x11f), false), None);
        assert_eq!(button_number(Key::A, false), None);
    }

    #[test]
    fn test_relative_motion_clamped_to_stage() {
        let mut seat = seat();
        let mouse = add(&mut seat, 1, pointer_desc());
        motion(&mut seat, 10, 4.0, 6.0);
        assert_eq!(seat.pointer_position(), (20.0, 22.0));

        motion(&mut seat, 20, 5000.0, -5000.0);
        assert_eq!(seat.pointer_position(), (STAGE.width - 1.0, 0.0));

        let events = drain(&mut seat);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].device, seat.core_pointer());
        assert_eq!(events[0].source_device, mouse);
        match events[0].kind {
            EventKind::Motion { x, y, deltas, .. } => {
                assert_eq!((x, y), (20.0, 22.0));
                assert_eq!(deltas.map(|d| (d.dx, d.dy)), Some((4.0, 6.0)));
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_custom_constraint_and_filter() {
        let mut seat = Seat::new(SeatConfig {
            stage: Some(STAGE),
            constrain_pointer: Some(Box::new(
                |_: DeviceId, _: u64, _: (f32, f32), (x, y): (f32, f32)| {
                    (x.min(100.0), y.min(100.0))
                },
            )),
            motion_filter: Some(Box::new(
                |_: DeviceId, _: (f32, f32), dx: f64, dy: f64| (dx * 2.0, dy * 2.0),
            )),
            ..Default::default()
        });
        add(&mut seat, 1, pointer_desc());

        motion(&mut seat, 10, 10.0, 100.0);
        assert_eq!(seat.pointer_position(), (36.0, 100.0));
    }

    #[test]
    fn test_absolute_motion_scaled() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        seat.process_raw(RawEvent::new(
            DeviceHandle(1),
            10,
            RawEventKind::PointerMotionAbsolute { x: 0.5, y: 0.25 },
        ));
        assert_eq!(seat.pointer_position(), (500.0, 200.0));
    }

    #[test]
    fn test_button_state_mask() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        button(&mut seat, 10, Key::BTN_RIGHT, true);
        assert_eq!(seat.button_state(), ModifierMask::BUTTON3);
        button(&mut seat, 20, Key::BTN_RIGHT, false);
        assert_eq!(seat.button_state(), ModifierMask::NONE);

        let events = drain(&mut seat);
        assert_eq!(events[0].modifiers, ModifierMask::BUTTON3);
        assert_eq!(events[1].modifiers, ModifierMask::NONE);
        match events[0].kind {
            EventKind::Button {
                button, code, x, y, ..
            } => {
                assert_eq!(button, 3);
                assert_eq!(code, Key::BTN_RIGHT);
                assert_eq!((x, y), (16.0, 16.0));
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_button_duplicates_and_unknown_codes() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        seat.process_raw(RawEvent::new(
            DeviceHandle(1),
            10,
            RawEventKind::PointerButton {
                button: Key::BTN_LEFT,
                pressed: true,
                seat_count: 2,
            },
        ));
        button(&mut seat, 20, Key::from(0x11f), true);
        assert!(drain(&mut seat).is_empty());
    }

    #[test]
    fn test_wheel_scroll() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        axis(&mut seat, ScrollSource::Wheel, Some(15.0), Some(1.0));

        let events = drain(&mut seat);
        assert_eq!(events.len(), 2);
        match events[0].kind {
            EventKind::Scroll {
                scroll: ScrollKind::Smooth { dx, dy, .. },
                source,
                ..
            } => {
                assert_eq!((dx, dy), (0.0, 1.0));
                assert_eq!(source, ScrollSource::Wheel);
            }
            ref other => panic!("unexpected {:?}", other),
        }
        assert!(events[0].flags.emulated);
        assert_eq!(
            events[1].kind,
            EventKind::Scroll {
                x: 16.0,
                y: 16.0,
                source: ScrollSource::Wheel,
                scroll: ScrollKind::Discrete(ScrollDirection::Down),
            }
        );
        assert!(!events[1].flags.emulated);
    }

    #[test]
    fn test_finger_scroll_accumulates_and_finishes() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        axis(&mut seat, ScrollSource::Finger, Some(-25.0), None);

        let events = drain(&mut seat);
        assert_eq!(events.len(), 3);
        assert!(!events[0].flags.emulated);
        for event in &events[1..] {
            assert!(event.flags.emulated);
            assert!(matches!(
                event.kind,
                EventKind::Scroll {
                    scroll: ScrollKind::Discrete(ScrollDirection::Up),
                    ..
                }
            ));
        }
        assert_eq!(seat.scroll_accumulated(), (0.0, -5.0));

        axis(&mut seat, ScrollSource::Finger, Some(0.0), None);
        assert_eq!(seat.scroll_accumulated(), (0.0, 0.0));
        let events = drain(&mut seat);
        match events[0].kind {
            EventKind::Scroll {
                scroll: ScrollKind::Smooth { finish, .. },
                ..
            } => assert!(finish.vertical && !finish.horizontal),
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_swipe_at_pointer() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        seat.process_raw(RawEvent::new(
            DeviceHandle(1),
            5,
            RawEventKind::GestureSwipe {
                phase: GesturePhase::Begin,
                fingers: 3,
                dx: 1.0,
                dy: 0.0,
            },
        ));
        let events = drain(&mut seat);
        assert_eq!(
            events[0].kind,
            EventKind::Swipe {
                phase: GesturePhase::Begin,
                fingers: 3,
                x: 16.0,
                y: 16.0,
                dx: 1.0,
                dy: 0.0,
            }
        );
        assert_eq!(events[0].device, seat.core_pointer());
    }

    #[test]
    fn test_dwell_click_through_seat() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        seat.set_pointer_a11y_settings(PointerA11ySettings {
            dwell_enabled: true,
            ..Default::default()
        });

        motion(&mut seat, 1_000, 5.0, 5.0);
        seat.run_timers(1_000 + 100_000 + 1_200_000);

        let events = drain(&mut seat);
        let virt = seat.a11y_virtual_pointer().unwrap();
        let clicks: Vec<(u32, bool)> = events
            .iter()
            .filter(|e| e.source_device == virt)
            .filter_map(|e| match e.kind {
                EventKind::Button {
                    button, pressed, ..
                } => Some((button, pressed)),
                _ => None,
            })
            .collect();
        assert_eq!(clicks, vec![(1, true), (1, false)]);
        assert!(events
            .iter()
            .filter(|e| e.source_device == virt)
            .all(|e| e.flags.synthetic));
        assert_eq!(seat.button_state(), ModifierMask::NONE);
    }

    #[test]
    fn test_secondary_click_through_seat() {
        let mut seat = seat();
        add(&mut seat, 1, pointer_desc());
        seat.set_pointer_a11y_settings(PointerA11ySettings {
            secondary_click_enabled: true,
            ..Default::default()
        });

        button(&mut seat, 0, Key::BTN_LEFT, true);
        seat.run_timers(1_300_000);
        button(&mut seat, 1_400_000, Key::BTN_LEFT, false);

        let events = drain(&mut seat);
        let buttons: Vec<(u32, bool)> = events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Button {
                    button, pressed, ..
                } => Some((button, pressed)),
                _ => None,
            })
            .collect();
        assert_eq!(buttons, vec![(1, true), (1, false), (3, true), (3, false)]);
    }
}
