// Evseat Seat Pipeline Scenarios
//
// End-to-end scenarios driving an EventSource over the scripted backend.
// Time is injected through raw event timestamps and a manual clock.
//
// Run with: cargo test --test seat_pipeline

use evseat_core::a11y::PointerA11ySettings;
use evseat_core::event::{ScrollKind, TouchPhase};
use evseat_core::scroll::ScrollDirection;
use evseat_core::{
    DeviceCapabilities, DeviceDescription, DeviceHandle, DeviceType, Event, EventKind,
    EventSource, KbdA11yFlags, KbdA11ySettings, Key, ManualClock, ModifierMask, RawEvent,
    RawEventKind, RepeatConfig, ScriptedBackend, ScrollSource, Seat, SeatConfig,
    SeatNotification, StageQueue, StageSize,
};

// =========================================================================
// Test Helpers
// =========================================================================

const KEYBOARD: u64 = 1;
const MOUSE: u64 = 2;
const TOUCHSCREEN: u64 = 3;

fn keyboard() -> DeviceDescription {
    DeviceDescription {
        name: "AT Translated Set 2 keyboard".to_string(),
        capabilities: DeviceCapabilities {
            keyboard: true,
            supported_keys: (1..120).collect(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn mouse() -> DeviceDescription {
    DeviceDescription {
        name: "USB Optical Mouse".to_string(),
        capabilities: DeviceCapabilities {
            pointer: true,
            supported_keys: vec![0x110, 0x111, 0x112], // BTN_LEFT, BTN_RIGHT, BTN_MIDDLE
            ..Default::default()
        },
        ..Default::default()
    }
}

fn touchscreen() -> DeviceDescription {
    DeviceDescription {
        name: "ELAN Touchscreen".to_string(),
        capabilities: DeviceCapabilities {
            touch: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

struct Harness {
    clock: ManualClock,
    source: EventSource<ScriptedBackend>,
}

impl Harness {
    /// Seat with a 1000x800 stage, a keyboard, a mouse and a touchscreen.
    /// Repeat is off unless a test turns it on.
    fn new(kbd_a11y: KbdA11ySettings) -> Self {
        let clock = ManualClock::new(0);
        let seat = Seat::new(SeatConfig {
            stage: Some(StageSize::new(1000.0, 800.0)),
            repeat: RepeatConfig {
                enabled: false,
                ..Default::default()
            },
            kbd_a11y,
            ..Default::default()
        });
        let mut backend = ScriptedBackend::new();
        backend.add_device(KEYBOARD, 0, keyboard());
        backend.add_device(MOUSE, 0, mouse());
        backend.add_device(TOUCHSCREEN, 0, touchscreen());

        let mut harness = Self {
            clock: clock.clone(),
            source: EventSource::new(seat, backend, StageQueue::new(), clock),
        };
        harness.run();
        harness
    }

    fn plain() -> Self {
        Self::new(KbdA11ySettings::default())
    }

    fn backend(&mut self) -> &mut ScriptedBackend {
        self.source.backend_mut()
    }

    fn push(&mut self, handle: u64, time_us: u64, kind: RawEventKind) {
        self.backend()
            .push(RawEvent::new(DeviceHandle(handle), time_us, kind));
    }

    /// Dispatch until idle and take everything the stage received
    fn run(&mut self) -> Vec<Event> {
        while self.source.dispatch().unwrap() {}
        self.source.stage_queue().drain()
    }

    /// Move the clock forward, fire due timers and collect the output
    fn advance_to(&mut self, now_us: u64) -> Vec<Event> {
        self.clock.set(now_us);
        self.run()
    }
}

fn keys(events: &[Event]) -> Vec<(Key, bool)> {
    events.iter().filter_map(|e| e.key()).collect()
}

fn buttons(events: &[Event]) -> Vec<(u32, bool)> {
    events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Button {
                button, pressed, ..
            } => Some((button, pressed)),
            _ => None,
        })
        .collect()
}

fn ms(value: u64) -> u64 {
    value * 1_000
}

// =========================================================================
// Keyboard
// =========================================================================

#[test]
fn test_typing_passes_through() {
    let mut h = Harness::plain();
    h.backend().tap_key(KEYBOARD, ms(10), Key::H, ms(40));
    h.backend().tap_key(KEYBOARD, ms(100), Key::I, ms(40));

    let events = h.run();
    assert_eq!(
        keys(&events),
        vec![
            (Key::H, true),
            (Key::H, false),
            (Key::I, true),
            (Key::I, false)
        ]
    );
    let core = h.source.seat().core_keyboard();
    assert!(events.iter().all(|e| e.device == core));
    assert!(events.iter().all(|e| !e.flags.synthetic));
}

#[test]
fn test_same_key_on_two_keyboards_is_delivered_once() {
    let mut h = Harness::plain();
    h.backend().add_device(4, ms(1), keyboard());
    h.run();

    h.backend().key(KEYBOARD, ms(10), Key::LEFT_CTRL, true);
    h.backend().key(4, ms(20), Key::LEFT_CTRL, true);
    h.backend().key(KEYBOARD, ms(30), Key::LEFT_CTRL, false);
    h.backend().key(4, ms(40), Key::LEFT_CTRL, false);

    let events = h.run();
    assert_eq!(
        keys(&events),
        vec![(Key::LEFT_CTRL, true), (Key::LEFT_CTRL, false)]
    );
    assert_eq!(events[1].time_us, ms(40));
}

#[test]
fn test_autorepeat_follows_the_clock() {
    let mut h = Harness::plain();
    h.source.seat_mut().set_repeat(RepeatConfig::default());
    h.backend().key(KEYBOARD, 0, Key::J, true);
    assert_eq!(h.run().len(), 1);

    assert_eq!(h.source.prepare().timeout_ms, Some(250));
    let events = h.advance_to(ms(300));
    let times: Vec<u64> = events.iter().map(|e| e.time_us).collect();
    assert_eq!(times, vec![ms(250), ms(283)]);
    assert!(events.iter().all(|e| e.flags.repeated));

    h.backend().key(KEYBOARD, ms(310), Key::J, false);
    assert_eq!(keys(&h.advance_to(ms(1_000))), vec![(Key::J, false)]);
    assert_eq!(h.source.prepare().timeout_ms, None);
}

#[test]
fn test_autorepeat_waits_for_unread_release() {
    let mut h = Harness::plain();
    h.source.seat_mut().set_repeat(RepeatConfig::default());
    h.backend().motion(MOUSE, ms(1), 2.0, 2.0);
    h.backend().motion(MOUSE, ms(2), 2.0, 2.0);
    h.backend().key(KEYBOARD, ms(3), Key::J, true);
    assert!(h.source.dispatch().unwrap());

    // The release sits in the backend while the clock passes the repeat delay
    h.backend().key(KEYBOARD, ms(100), Key::J, false);
    let events = h.advance_to(ms(400));

    assert_eq!(keys(&events), vec![(Key::J, true), (Key::J, false)]);
    assert!(events.iter().all(|e| !e.flags.repeated));
    assert!(events.windows(2).all(|w| w[0].time_us <= w[1].time_us));
    assert_eq!(h.source.prepare().timeout_ms, None);
}

#[test]
fn test_caps_lock_led_reaches_backend() {
    let mut h = Harness::plain();
    h.backend().tap_key(KEYBOARD, ms(10), Key::CAPSLOCK, ms(20));
    h.run();

    let leds = h.source.backend().leds().to_vec();
    assert_eq!(leds.len(), 1);
    assert!(leds[0].caps_lock);
    assert!(h.source.seat().keyboard_state().effective().contains(ModifierMask::LOCK));
}

// =========================================================================
// Keyboard accessibility
// =========================================================================

#[test]
fn test_bounce_keys_scenario() {
    let mut h = Harness::new(KbdA11ySettings {
        controls: KbdA11yFlags::KEYBOARD_ENABLED | KbdA11yFlags::BOUNCE_KEYS_ENABLED,
        debounce_delay: 500,
        ..Default::default()
    });

    h.backend().key(KEYBOARD, 0, Key::A, true);
    h.backend().key(KEYBOARD, ms(10), Key::A, false);
    // Bounces within the delay
    h.backend().key(KEYBOARD, ms(100), Key::A, true);
    h.backend().key(KEYBOARD, ms(110), Key::A, false);
    // Pressed again once the delay elapsed since the last release
    h.backend().key(KEYBOARD, ms(610), Key::A, true);

    let events = h.run();
    assert_eq!(
        keys(&events),
        vec![
            (Key::A, true),
            (Key::A, false),
            (Key::A, false),
            (Key::A, true)
        ]
    );
    assert_eq!(events.last().map(|e| e.time_us), Some(ms(610)));
}

#[test]
fn test_slow_keys_hold_and_early_release() {
    let mut h = Harness::new(KbdA11ySettings {
        controls: KbdA11yFlags::KEYBOARD_ENABLED | KbdA11yFlags::SLOW_KEYS_ENABLED,
        slowkeys_delay: 300,
        ..Default::default()
    });

    // Released before the delay: never delivered
    h.backend().tap_key(KEYBOARD, ms(10), Key::Q, ms(100));
    assert!(h.run().is_empty());

    // Held long enough: one press stamped at the deadline
    h.backend().key(KEYBOARD, ms(500), Key::W, true);
    assert!(h.run().is_empty());
    assert_eq!(h.source.prepare().timeout_ms, Some(800));

    let events = h.advance_to(ms(800));
    assert_eq!(keys(&events), vec![(Key::W, true)]);
    assert_eq!(events[0].time_us, ms(800));

    h.backend().key(KEYBOARD, ms(900), Key::W, false);
    assert_eq!(keys(&h.run()), vec![(Key::W, false)]);
}

#[test]
fn test_sticky_shift_latches_next_key() {
    let mut h = Harness::new(KbdA11ySettings {
        controls: KbdA11yFlags::KEYBOARD_ENABLED | KbdA11yFlags::STICKY_KEYS_ENABLED,
        ..Default::default()
    });

    h.backend().tap_key(KEYBOARD, ms(10), Key::LEFT_SHIFT, ms(20));
    h.run();
    assert_eq!(
        h.source.seat().keyboard_state().latched(),
        ModifierMask::SHIFT
    );

    h.backend().tap_key(KEYBOARD, ms(100), Key::A, ms(20));
    let events = h.run();
    assert_eq!(keys(&events), vec![(Key::A, true), (Key::A, false)]);
    assert!(events[0].modifiers.contains(ModifierMask::SHIFT));
    assert!(h.source.seat().keyboard_state().latched().is_empty());

    let notifications = h.source.seat_mut().take_notifications();
    assert!(notifications
        .iter()
        .any(|n| matches!(n, SeatNotification::KbdA11yModsStateChanged { .. })));
}

#[test]
fn test_mousekeys_move_the_pointer() {
    let mut h = Harness::new(KbdA11ySettings {
        controls: KbdA11yFlags::KEYBOARD_ENABLED | KbdA11yFlags::MOUSE_KEYS_ENABLED,
        ..Default::default()
    });
    let virt = h
        .source
        .seat()
        .devices()
        .find(|d| d.is_virtual())
        .map(|d| d.id)
        .unwrap();

    // One step on press, then steady steps after the initial delay
    h.backend().key(KEYBOARD, ms(10), Key::KP2, true);
    assert_eq!(h.run().len(), 1);
    assert_eq!(h.source.prepare().timeout_ms, Some(310));

    let events = h.advance_to(ms(400));
    assert!(events.len() > 1);
    assert!(events.iter().all(|e| e.source_device == virt));
    assert!(events
        .iter()
        .all(|e| matches!(e.kind, EventKind::Motion { .. })));
    let (x, y) = h.source.seat().pointer_position();
    assert_eq!(x, 16.0);
    assert!(y > 16.0);

    h.backend().key(KEYBOARD, ms(410), Key::KP2, false);
    h.run();
    assert_eq!(h.source.prepare().timeout_ms, None);
}

// =========================================================================
// Pointer
// =========================================================================

#[test]
fn test_motion_and_click() {
    let mut h = Harness::plain();
    h.backend().motion(MOUSE, ms(10), 100.0, 50.0);
    h.backend().button(MOUSE, ms(20), Key::BTN_LEFT, true);
    h.backend().button(MOUSE, ms(30), Key::BTN_LEFT, false);

    let events = h.run();
    assert_eq!(events[0].position(), Some((116.0, 66.0)));
    assert_eq!(buttons(&events), vec![(1, true), (1, false)]);
    assert!(events[2].modifiers.contains(ModifierMask::BUTTON1));
    assert_eq!(h.source.seat().button_state(), ModifierMask::NONE);
}

#[test]
fn test_wheel_click_scrolls_down() {
    let mut h = Harness::plain();
    h.push(
        MOUSE,
        ms(10),
        RawEventKind::PointerAxis {
            source: ScrollSource::Wheel,
            horizontal: None,
            vertical: Some(10.0),
            discrete_horizontal: None,
            discrete_vertical: Some(1.0),
        },
    );

    let events = h.run();
    let scrolls: Vec<ScrollKind> = events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Scroll { scroll, .. } => Some(scroll),
            _ => None,
        })
        .collect();
    assert_eq!(scrolls.len(), 2);
    assert!(matches!(scrolls[0], ScrollKind::Smooth { dy, .. } if dy == 1.0));
    assert_eq!(scrolls[1], ScrollKind::Discrete(ScrollDirection::Down));
}

#[test]
fn test_secondary_click_by_holding() {
    let mut h = Harness::plain();
    h.source.seat_mut().set_pointer_a11y_settings(PointerA11ySettings {
        secondary_click_enabled: true,
        ..Default::default()
    });

    h.backend().button(MOUSE, 0, Key::BTN_LEFT, true);
    h.run();
    h.advance_to(ms(1_300));
    h.backend().button(MOUSE, ms(1_400), Key::BTN_LEFT, false);

    let events = h.run();
    assert_eq!(buttons(&events), vec![(1, false), (3, true), (3, false)]);
}

// =========================================================================
// Touch and hotplug
// =========================================================================

#[test]
fn test_two_finger_touch() {
    let mut h = Harness::plain();
    h.push(TOUCHSCREEN, ms(10), RawEventKind::TouchDown { slot: 0, x: 0.1, y: 0.1 });
    h.push(TOUCHSCREEN, ms(10), RawEventKind::TouchDown { slot: 1, x: 0.75, y: 0.25 });
    h.push(TOUCHSCREEN, ms(10), RawEventKind::TouchFrame);
    h.push(TOUCHSCREEN, ms(20), RawEventKind::TouchUp { slot: 0 });
    h.push(TOUCHSCREEN, ms(30), RawEventKind::TouchUp { slot: 1 });

    let events = h.run();
    let touches: Vec<(TouchPhase, u32)> = events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Touch {
                phase, sequence, ..
            } => Some((phase, sequence)),
            _ => None,
        })
        .collect();
    assert_eq!(
        touches,
        vec![
            (TouchPhase::Begin, 1),
            (TouchPhase::Begin, 2),
            (TouchPhase::End, 1),
            (TouchPhase::End, 2)
        ]
    );
    assert_eq!(events[1].position(), Some((750.0, 200.0)));
    assert_eq!(h.source.seat().touch_slots().active_count(), 0);
}

#[test]
fn test_unplug_cancels_touches_and_frees_id() {
    let mut h = Harness::plain();
    let screen = h
        .source
        .seat()
        .device_for_handle(DeviceHandle(TOUCHSCREEN))
        .unwrap();
    h.push(TOUCHSCREEN, ms(10), RawEventKind::TouchDown { slot: 0, x: 0.5, y: 0.5 });
    h.backend().remove_device(TOUCHSCREEN, ms(20));

    let events = h.run();
    let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["touch-begin", "touch-cancel", "device-removed"]);
    assert!(h.source.seat().device(screen).is_none());

    h.backend().add_device(5, ms(30), touchscreen());
    h.run();
    assert_eq!(
        h.source.seat().device_for_handle(DeviceHandle(5)),
        Some(screen)
    );
}

#[test]
fn test_virtual_keyboard_alongside_physical() {
    let mut h = Harness::plain();
    let virt = h.source.seat_mut().create_virtual_device(DeviceType::Keyboard);
    assert_eq!(h.run().len(), 1);

    h.source
        .seat_mut()
        .virtual_notify_key(virt, ms(10), Key::ENTER, true)
        .unwrap();
    let events = h.run();
    assert_eq!(keys(&events), vec![(Key::ENTER, true)]);
    assert!(events[0].flags.synthetic);

    // Already down through the virtual keyboard
    h.backend().key(KEYBOARD, ms(20), Key::ENTER, true);
    assert!(h.run().is_empty());

    // Still held physically, so removal releases nothing
    h.source.seat_mut().remove_virtual_device(virt).unwrap();
    let names: Vec<&str> = h.run().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["device-removed"]);

    h.backend().key(KEYBOARD, ms(30), Key::ENTER, false);
    assert_eq!(keys(&h.run()), vec![(Key::ENTER, false)]);
}

#[test]
fn test_no_stage_discards_input() {
    let mut h = Harness::plain();
    h.source.seat_mut().set_stage(None);
    h.backend().tap_key(KEYBOARD, ms(10), Key::A, ms(10));
    h.backend().motion(MOUSE, ms(30), 5.0, 5.0);
    assert!(h.run().is_empty());
}
