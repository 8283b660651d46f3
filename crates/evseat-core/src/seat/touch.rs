// Evseat Seat - Touch
// Touch contacts bound to seat slots

use super::Seat;
use crate::event::{Event, EventKind, TouchPhase};
use crate::input::DeviceId;
use crate::modifier::ModifierMask;

impl Seat {
    /// Stage position of a normalized touch point
    fn touch_position(&self, device: DeviceId, x: f64, y: f64) -> Option<(f32, f32)> {
        let stage = self.stage?;
        let input = self.devices.get(&device)?;
        Some(input.translate_coordinates(
            stage,
            (x * f64::from(stage.width)) as f32,
            (y * f64::from(stage.height)) as f32,
        ))
    }

    pub(super) fn process_touch_down(&mut self, device: DeviceId, time_us: u64, slot: i32, x: f64, y: f64) {
        let Some((x, y)) = self.touch_position(device, x, y) else {
            return;
        };
        let Some(input) = self.devices.get_mut(&device) else {
            return;
        };
        if let Some(seat_slot) = input.touches.lookup(slot) {
            log::warn!("touch slot {} on {} is already down as {}", slot, device, seat_slot);
            return;
        }

        let seat_slot = self.touch_slots.acquire(device, slot);
        input.touches.insert(slot, seat_slot);
        if let Some(touch) = self.touch_slots.get_mut(seat_slot) {
            touch.x = x;
            touch.y = y;
        }
        self.notify_touch(device, time_us, TouchPhase::Begin, seat_slot);
    }

    pub(super) fn process_touch_motion(&mut self, device: DeviceId, time_us: u64, slot: i32, x: f64, y: f64) {
        let Some((x, y)) = self.touch_position(device, x, y) else {
            return;
        };
        let Some(seat_slot) = self.devices.get(&device).and_then(|d| d.touches.lookup(slot)) else {
            log::warn!("motion for unknown touch slot {} on {}", slot, device);
            return;
        };
        if let Some(touch) = self.touch_slots.get_mut(seat_slot) {
            touch.x = x;
            touch.y = y;
        }
        self.notify_touch(device, time_us, TouchPhase::Update, seat_slot);
    }

    pub(super) fn process_touch_up(&mut self, device: DeviceId, time_us: u64, slot: i32) {
        self.end_touch(device, time_us, slot, TouchPhase::End);
    }

    pub(super) fn process_touch_cancel(&mut self, device: DeviceId, time_us: u64, slot: i32) {
        self.end_touch(device, time_us, slot, TouchPhase::Cancel);
    }

    fn end_touch(&mut self, device: DeviceId, time_us: u64, slot: i32, phase: TouchPhase) {
        let Some(seat_slot) = self
            .devices
            .get_mut(&device)
            .and_then(|d| d.touches.remove(slot))
        else {
            log::warn!("{} for unknown touch slot {} on {}", phase, slot, device);
            return;
        };
        self.notify_touch(device, time_us, phase, seat_slot);
        self.touch_slots.release(seat_slot);
    }

    /// Cancel every contact a device still holds and free its slots
    pub(super) fn release_touch_slots(&mut self, device: DeviceId, time_us: u64) {
        let held = match self.devices.get_mut(&device) {
            Some(input) => input.touches.drain(),
            None => return,
        };
        for (slot, seat_slot) in held {
            log::debug!("cancelling touch slot {} on {}", slot, device);
            self.notify_touch(device, time_us, TouchPhase::Cancel, seat_slot);
            self.touch_slots.release(seat_slot);
        }
    }

    fn notify_touch(&mut self, device: DeviceId, time_us: u64, phase: TouchPhase, seat_slot: usize) {
        let Some(touch) = self.touch_slots.get(seat_slot) else {
            return;
        };

        let mut modifiers = self.modifiers();
        if matches!(phase, TouchPhase::Begin | TouchPhase::Update) {
            modifiers |= ModifierMask::BUTTON1;
        }

        let event = Event::new(
            time_us,
            self.core_pointer,
            device,
            EventKind::Touch {
                phase,
                sequence: touch.sequence(),
                x: touch.x,
                y: touch.y,
            },
        )
        .with_modifiers(modifiers)
        .with_flags(self.flags_for(device));
        self.queue.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{add, drain, seat};
    use super::super::{Seat, SeatConfig};
    use crate::event::raw::{DeviceDescription, DeviceHandle, RawEvent, RawEventKind};
    use crate::event::{Event, EventKind, TouchPhase};
    use crate::input::DeviceCapabilities;
    use crate::modifier::ModifierMask;

    fn touchscreen() -> DeviceDescription {
        DeviceDescription {
            name: "Test Touchscreen".to_string(),
            capabilities: DeviceCapabilities {
                touch: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn raw(seat: &mut Seat, time_us: u64, kind: RawEventKind) {
        seat.process_raw(RawEvent::new(DeviceHandle(1), time_us, kind));
    }

    fn touches(events: &[Event]) -> Vec<(TouchPhase, u32)> {
        events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Touch {
                    phase, sequence, ..
                } => Some((phase, sequence)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_touch_sequence() {
        let mut seat = seat();
        let screen = add(&mut seat, 1, touchscreen());
        raw(&mut seat, 0, RawEventKind::TouchDown { slot: 0, x: 0.5, y: 0.5 });
        raw(&mut seat, 10, RawEventKind::TouchMotion { slot: 0, x: 0.25, y: 0.5 });
        raw(&mut seat, 15, RawEventKind::TouchFrame);
        raw(&mut seat, 20, RawEventKind::TouchUp { slot: 0 });

        let events = drain(&mut seat);
        assert_eq!(
            touches(&events),
            vec![
                (TouchPhase::Begin, 1),
                (TouchPhase::Update, 1),
                (TouchPhase::End, 1)
            ]
        );
        assert_eq!(events[0].position(), Some((500.0, 400.0)));
        assert_eq!(events[1].position(), Some((250.0, 400.0)));
        assert_eq!(events[0].device, seat.core_pointer());
        assert_eq!(events[0].source_device, screen);
        assert!(events[0].modifiers.contains(ModifierMask::BUTTON1));
        assert!(events[1].modifiers.contains(ModifierMask::BUTTON1));
        assert!(!events[2].modifiers.contains(ModifierMask::BUTTON1));
        assert_eq!(seat.touch_slots().active_count(), 0);
    }

    #[test]
    fn test_concurrent_contacts_get_distinct_slots() {
        let mut seat = seat();
        add(&mut seat, 1, touchscreen());
        raw(&mut seat, 0, RawEventKind::TouchDown { slot: 3, x: 0.1, y: 0.1 });
        raw(&mut seat, 1, RawEventKind::TouchDown { slot: 7, x: 0.2, y: 0.2 });
        raw(&mut seat, 2, RawEventKind::TouchUp { slot: 3 });
        raw(&mut seat, 3, RawEventKind::TouchDown { slot: 9, x: 0.3, y: 0.3 });

        let events = drain(&mut seat);
        assert_eq!(
            touches(&events),
            vec![
                (TouchPhase::Begin, 1),
                (TouchPhase::Begin, 2),
                (TouchPhase::End, 1),
                (TouchPhase::Begin, 1)
            ]
        );
        assert_eq!(seat.touch_slots().active_count(), 2);
    }

    #[test]
    fn test_unknown_slot_ignored() {
        let mut seat = seat();
        add(&mut seat, 1, touchscreen());
        raw(&mut seat, 0, RawEventKind::TouchMotion { slot: 4, x: 0.1, y: 0.1 });
        raw(&mut seat, 1, RawEventKind::TouchUp { slot: 4 });
        assert!(drain(&mut seat).is_empty());
    }

    #[test]
    fn test_cancel_single_slot() {
        let mut seat = seat();
        add(&mut seat, 1, touchscreen());
        raw(&mut seat, 0, RawEventKind::TouchDown { slot: 0, x: 0.1, y: 0.1 });
        raw(&mut seat, 1, RawEventKind::TouchDown { slot: 1, x: 0.2, y: 0.2 });
        raw(&mut seat, 2, RawEventKind::TouchCancel { slot: 1 });

        let events = drain(&mut seat);
        assert_eq!(touches(&events).last(), Some(&(TouchPhase::Cancel, 2)));
        assert_eq!(seat.touch_slots().active_count(), 1);
    }

    #[test]
    fn test_removal_cancels_held_touches() {
        let mut seat = seat();
        let screen = add(&mut seat, 1, touchscreen());
        raw(&mut seat, 0, RawEventKind::TouchDown { slot: 0, x: 0.1, y: 0.1 });
        raw(&mut seat, 1, RawEventKind::TouchDown { slot: 1, x: 0.2, y: 0.2 });
        drain(&mut seat);

        raw(&mut seat, 5, RawEventKind::DeviceRemoved);
        let events = drain(&mut seat);
        assert_eq!(
            touches(&events),
            vec![(TouchPhase::Cancel, 1), (TouchPhase::Cancel, 2)]
        );
        assert_eq!(events.last().map(|e| (&e.kind, e.device)), Some((&EventKind::DeviceRemoved, screen)));
        assert_eq!(seat.touch_slots().active_count(), 0);
    }

    #[test]
    fn test_touch_needs_stage() {
        let mut seat = Seat::new(SeatConfig::default());
        add(&mut seat, 1, touchscreen());
        raw(&mut seat, 0, RawEventKind::TouchDown { slot: 0, x: 0.1, y: 0.1 });
        assert_eq!(seat.touch_slots().active_count(), 0);
    }
}
