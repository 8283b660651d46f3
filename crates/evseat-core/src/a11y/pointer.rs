// Evseat Accessibility - Pointer
// Secondary click by holding the primary button, dwell click and dwell gestures

use super::{
    A11yContext, A11yEffect, DwellClickType, DwellDirection, DwellMode, PointerA11ySettings,
};
use crate::input::DeviceId;
use crate::notify::{PointerA11yTimeout, SeatNotification};
use crate::timer::{ms_to_us, SeatTimer, TimerId};

/// Pause the pointer has to hold before a dwell is armed
pub const DWELL_POSITION_DELAY_MS: u32 = 100;

const BUTTON_PRIMARY: u32 = 1;
const BUTTON_MIDDLE: u32 = 2;
const BUTTON_SECONDARY: u32 = 3;

fn has_moved(anchor: (f32, f32), current: (f32, f32), threshold: u32) -> bool {
    let dx = current.0 - anchor.0;
    let dy = current.1 - anchor.1;
    let threshold = threshold as f32;
    dx * dx + dy * dy > threshold * threshold
}

/// Classify the movement from `anchor` to `current`.
///
/// Movement within `threshold` pixels is `None`. Otherwise the dominant
/// axis wins, vertical on ties.
pub fn dwell_direction(anchor: (f32, f32), current: (f32, f32), threshold: u32) -> DwellDirection {
    if !has_moved(anchor, current, threshold) {
        return DwellDirection::None;
    }

    let dx = (current.0 - anchor.0).abs();
    let dy = (current.1 - anchor.1).abs();

    if dx > dy {
        if current.0 < anchor.0 {
            DwellDirection::Left
        } else {
            DwellDirection::Right
        }
    } else if current.1 < anchor.1 {
        DwellDirection::Up
    } else {
        DwellDirection::Down
    }
}

/// Pointer accessibility state of the seat's core pointer
#[derive(Debug)]
pub struct PointerA11yState {
    core_pointer: DeviceId,
    /// Virtual pointer the emulated clicks come from
    virtual_device: DeviceId,

    current: (f32, f32),
    dwell: (f32, f32),

    /// Dwell, gesture and gesture-clear share one slot
    dwell_timer: Option<TimerId>,
    dwell_position_timer: Option<TimerId>,
    dwell_drag_started: bool,
    dwell_gesture_started: bool,

    secondary_click_timer: Option<TimerId>,
    secondary_click_triggered: bool,

    n_btn_pressed: u32,
}

impl PointerA11yState {
    pub fn new(core_pointer: DeviceId, virtual_device: DeviceId) -> Self {
        Self {
            core_pointer,
            virtual_device,
            current: (0.0, 0.0),
            dwell: (0.0, 0.0),
            dwell_timer: None,
            dwell_position_timer: None,
            dwell_drag_started: false,
            dwell_gesture_started: false,
            secondary_click_timer: None,
            secondary_click_triggered: false,
            n_btn_pressed: 0,
        }
    }

    pub fn virtual_device(&self) -> DeviceId {
        self.virtual_device
    }

    pub fn is_dragging(&self) -> bool {
        self.dwell_drag_started
    }

    pub fn is_gesturing(&self) -> bool {
        self.dwell_gesture_started
    }

    pub fn is_dwell_pending(&self) -> bool {
        self.dwell_timer.is_some()
    }

    pub fn is_secondary_click_pending(&self) -> bool {
        self.secondary_click_timer.is_some()
    }

    pub fn dwell_position(&self) -> (f32, f32) {
        self.dwell
    }

    pub fn pressed_buttons(&self) -> u32 {
        self.n_btn_pressed
    }

    fn pointer_has_moved(&self, settings: &PointerA11ySettings) -> bool {
        has_moved(self.dwell, self.current, settings.dwell_threshold)
    }

    /// Core pointer moved to `(x, y)`
    pub fn on_motion(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &PointerA11ySettings,
        x: f32,
        y: f32,
        time_us: u64,
    ) {
        if !settings.is_enabled() {
            return;
        }

        self.current = (x, y);

        if settings.secondary_click_enabled && self.pointer_has_moved(settings) {
            self.stop_secondary_click_timeout(ctx);
        }

        if settings.dwell_enabled {
            ctx.timers.cancel(&mut self.dwell_position_timer);

            // A gesture keeps its anchor to classify the movement
            if self.pointer_has_moved(settings) && !self.dwell_gesture_started {
                self.stop_dwell_timeout(ctx);
            }

            if self.dwell_timer.is_none() && (self.dwell_drag_started || self.n_btn_pressed == 0)
            {
                self.dwell_position_timer = Some(ctx.timers.schedule(
                    time_us + ms_to_us(DWELL_POSITION_DELAY_MS),
                    SeatTimer::DwellPosition,
                ));
            }
        }

        if !self.dwell_gesture_started
            && self.dwell_timer.is_none()
            && self.secondary_click_timer.is_none()
        {
            self.dwell = self.current;
        }
    }

    /// Core pointer button changed, `button` in stage button numbering
    pub fn on_button(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &PointerA11ySettings,
        button: u32,
        pressed: bool,
        time_us: u64,
    ) {
        if !settings.is_enabled() {
            return;
        }

        if pressed {
            self.n_btn_pressed += 1;

            ctx.timers.cancel(&mut self.dwell_position_timer);
            if settings.dwell_enabled || self.dwell_drag_started {
                self.stop_dwell_timeout(ctx);
            }

            if settings.secondary_click_enabled {
                if button == BUTTON_PRIMARY {
                    if !self.dwell_drag_started {
                        self.start_secondary_click_timeout(ctx, settings, time_us);
                    }
                } else if self.secondary_click_timer.is_some() {
                    self.stop_secondary_click_timeout(ctx);
                }
            }
        } else {
            self.n_btn_pressed = self.n_btn_pressed.saturating_sub(1);

            if self.secondary_click_triggered {
                self.emit_click(ctx, BUTTON_SECONDARY, time_us);
            }
            self.stop_secondary_click_timeout(ctx);

            if self.dwell_drag_started {
                self.emit_dwell_click(ctx, DwellClickType::Drag, time_us);
            }
        }
    }

    /// Handle one of the pointer accessibility timers
    pub fn fire_timer(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &PointerA11ySettings,
        id: TimerId,
        kind: SeatTimer,
        now_us: u64,
    ) {
        match kind {
            SeatTimer::SecondaryClick if self.secondary_click_timer == Some(id) => {
                self.secondary_click_timer = None;
                self.secondary_click_triggered = true;
                self.notify_stopped(ctx, PointerA11yTimeout::SecondaryClick, true);
            }
            SeatTimer::DwellPosition if self.dwell_position_timer == Some(id) => {
                self.dwell_position_timer = None;
                if settings.dwell_enabled && !self.pointer_has_moved(settings) {
                    self.start_dwell_timeout(ctx, settings, now_us);
                }
            }
            SeatTimer::Dwell if self.dwell_timer == Some(id) => {
                self.dwell_timer = None;
                self.trigger_dwell_click(ctx, settings, now_us);
            }
            SeatTimer::DwellGesture if self.dwell_timer == Some(id) => {
                self.dwell_timer = None;
                self.trigger_dwell_gesture(ctx, settings, now_us);
            }
            SeatTimer::ClearDwellGesture if self.dwell_timer == Some(id) => {
                self.dwell_timer = None;
                self.dwell_gesture_started = false;
            }
            other => log::debug!("pointer a11y ignored stale timer {:?}", other),
        }
    }

    /// Stop every timer and finish a dwell drag in progress
    pub fn teardown(&mut self, ctx: &mut A11yContext<'_>, time_us: u64) {
        if self.dwell_drag_started {
            self.emit_dwell_click(ctx, DwellClickType::Drag, time_us);
        }

        ctx.timers.cancel(&mut self.dwell_position_timer);
        self.stop_dwell_timeout(ctx);
        self.stop_secondary_click_timeout(ctx);
        self.n_btn_pressed = 0;
    }

    fn notify_started(&self, ctx: &mut A11yContext<'_>, timeout: PointerA11yTimeout, delay_ms: u32) {
        ctx.notify(SeatNotification::PtrA11yTimeoutStarted {
            device: self.core_pointer,
            timeout,
            delay_ms,
        });
    }

    fn notify_stopped(&self, ctx: &mut A11yContext<'_>, timeout: PointerA11yTimeout, completed: bool) {
        ctx.notify(SeatNotification::PtrA11yTimeoutStopped {
            device: self.core_pointer,
            timeout,
            completed,
        });
    }

    // Secondary click

    fn start_secondary_click_timeout(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &PointerA11ySettings,
        time_us: u64,
    ) {
        ctx.timers.cancel(&mut self.secondary_click_timer);
        let delay = settings.secondary_click_delay;
        self.secondary_click_timer = Some(
            ctx.timers
                .schedule(time_us + ms_to_us(delay), SeatTimer::SecondaryClick),
        );
        self.notify_started(ctx, PointerA11yTimeout::SecondaryClick, delay);
    }

    fn stop_secondary_click_timeout(&mut self, ctx: &mut A11yContext<'_>) {
        if self.secondary_click_timer.is_some() {
            ctx.timers.cancel(&mut self.secondary_click_timer);
            self.notify_stopped(ctx, PointerA11yTimeout::SecondaryClick, false);
        }
        self.secondary_click_triggered = false;
    }

    // Dwell

    fn start_dwell_timeout(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &PointerA11ySettings,
        time_us: u64,
    ) {
        let delay = settings.dwell_delay;
        self.dwell_timer = Some(
            ctx.timers
                .schedule(time_us + ms_to_us(delay), SeatTimer::Dwell),
        );
        self.notify_started(ctx, PointerA11yTimeout::Dwell, delay);
    }

    fn stop_dwell_timeout(&mut self, ctx: &mut A11yContext<'_>) {
        if self.dwell_timer.is_some() {
            ctx.timers.cancel(&mut self.dwell_timer);
            self.dwell_gesture_started = false;
            self.notify_stopped(ctx, PointerA11yTimeout::Dwell, false);
        }
    }

    fn trigger_dwell_click(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &PointerA11ySettings,
        now_us: u64,
    ) {
        self.notify_stopped(ctx, PointerA11yTimeout::Dwell, true);

        if settings.dwell_mode == DwellMode::Gesture {
            if self.dwell_drag_started {
                self.emit_dwell_click(ctx, DwellClickType::Drag, now_us);
            } else {
                let delay = settings.dwell_delay;
                self.dwell_timer = Some(
                    ctx.timers
                        .schedule(now_us + ms_to_us(delay), SeatTimer::DwellGesture),
                );
                self.dwell_gesture_started = true;
                self.notify_started(ctx, PointerA11yTimeout::Gesture, delay);
            }
        } else {
            self.emit_dwell_click(ctx, settings.dwell_click_type, now_us);
            self.update_dwell_click_type(ctx, settings);
        }
    }

    fn trigger_dwell_gesture(
        &mut self,
        ctx: &mut A11yContext<'_>,
        settings: &PointerA11ySettings,
        now_us: u64,
    ) {
        ctx.push(A11yEffect::VirtualAbsolute {
            device: self.virtual_device,
            x: self.dwell.0,
            y: self.dwell.1,
            time_us: now_us,
        });

        let direction = dwell_direction(self.dwell, self.current, settings.dwell_threshold);
        log::debug!("dwell gesture {}", direction);
        self.emit_dwell_click(ctx, settings.click_type_for_direction(direction), now_us);

        // Keep the slot busy for a while so the restore does not start a new dwell
        self.dwell_timer = Some(ctx.timers.schedule(
            now_us + ms_to_us(settings.dwell_delay),
            SeatTimer::ClearDwellGesture,
        ));
        self.notify_stopped(ctx, PointerA11yTimeout::Gesture, true);
    }

    /// One-shot click types fall back to primary after firing; a drag
    /// does once it has been released.
    fn update_dwell_click_type(&self, ctx: &mut A11yContext<'_>, settings: &PointerA11ySettings) {
        let click_type = match settings.dwell_click_type {
            DwellClickType::Double | DwellClickType::Secondary | DwellClickType::Middle => {
                DwellClickType::Primary
            }
            DwellClickType::Drag if !self.dwell_drag_started => DwellClickType::Primary,
            other => other,
        };

        if click_type != settings.dwell_click_type {
            ctx.push(A11yEffect::DwellClickTypeChanged(click_type));
        }
    }

    fn emit_button(&self, ctx: &mut A11yContext<'_>, button: u32, pressed: bool, time_us: u64) {
        ctx.push(A11yEffect::VirtualButton {
            device: self.virtual_device,
            button,
            pressed,
            time_us,
        });
    }

    fn emit_click(&self, ctx: &mut A11yContext<'_>, button: u32, time_us: u64) {
        self.emit_button(ctx, button, true, time_us);
        self.emit_button(ctx, button, false, time_us);
    }

    fn emit_dwell_click(&mut self, ctx: &mut A11yContext<'_>, click_type: DwellClickType, time_us: u64) {
        match click_type {
            DwellClickType::Primary => self.emit_click(ctx, BUTTON_PRIMARY, time_us),
            DwellClickType::Double => {
                self.emit_click(ctx, BUTTON_PRIMARY, time_us);
                self.emit_click(ctx, BUTTON_PRIMARY, time_us);
            }
            DwellClickType::Drag => {
                let pressed = !self.dwell_drag_started;
                self.emit_button(ctx, BUTTON_PRIMARY, pressed, time_us);
                self.dwell_drag_started = pressed;
            }
            DwellClickType::Secondary => self.emit_click(ctx, BUTTON_SECONDARY, time_us),
            DwellClickType::Middle => self.emit_click(ctx, BUTTON_MIDDLE, time_us),
            DwellClickType::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{KeyboardState, ModifierMask};
    use crate::timer::TimerQueue;

    const CORE: DeviceId = DeviceId(2);
    const VIRT: DeviceId = DeviceId(7);

    struct Harness {
        timers: TimerQueue<SeatTimer>,
        keyboard: KeyboardState,
        effects: Vec<A11yEffect>,
        settings: PointerA11ySettings,
        state: PointerA11yState,
    }

    impl Harness {
        fn new(settings: PointerA11ySettings) -> Self {
            Self {
                timers: TimerQueue::new(),
                keyboard: KeyboardState::new(),
                effects: Vec::new(),
                settings,
                state: PointerA11yState::new(CORE, VIRT),
            }
        }

        fn dwell() -> Self {
            Self::new(PointerA11ySettings {
                dwell_enabled: true,
                ..Default::default()
            })
        }

        fn ctx(&mut self) -> (A11yContext<'_>, &mut PointerA11yState, &PointerA11ySettings) {
            (
                A11yContext {
                    timers: &mut self.timers,
                    keyboard: &mut self.keyboard,
                    button_state: ModifierMask::NONE,
                    effects: &mut self.effects,
                },
                &mut self.state,
                &self.settings,
            )
        }

        fn motion(&mut self, x: f32, y: f32, time_us: u64) {
            let (mut ctx, state, settings) = self.ctx();
            state.on_motion(&mut ctx, settings, x, y, time_us);
        }

        fn button(&mut self, button: u32, pressed: bool, time_us: u64) {
            let (mut ctx, state, settings) = self.ctx();
            state.on_button(&mut ctx, settings, button, pressed, time_us);
        }

        /// Fire the next timer, returning its kind and deadline
        fn fire_next(&mut self) -> Option<(SeatTimer, u64)> {
            let (id, deadline, kind) = self.timers.pop_due(u64::MAX)?;
            let (mut ctx, state, settings) = self.ctx();
            state.fire_timer(&mut ctx, settings, id, kind, deadline);
            Some((kind, deadline))
        }

        fn buttons(&self) -> Vec<(u32, bool)> {
            self.effects
                .iter()
                .filter_map(|e| match e {
                    A11yEffect::VirtualButton {
                        device,
                        button,
                        pressed,
                        ..
                    } => {
                        assert_eq!(*device, VIRT);
                        Some((*button, *pressed))
                    }
                    _ => None,
                })
                .collect()
        }

        /// Rest the pointer at (x, y) and let the dwell timer fire
        fn rest_and_dwell(&mut self, x: f32, y: f32, time_us: u64) {
            self.motion(x, y, time_us);
            assert_eq!(
                self.fire_next(),
                Some((SeatTimer::DwellPosition, time_us + 100_000))
            );
            assert_eq!(
                self.fire_next(),
                Some((SeatTimer::Dwell, time_us + 1_300_000))
            );
        }
    }

    #[test]
    fn test_dwell_direction_quadrants() {
        assert_eq!(
            dwell_direction((100.0, 100.0), (100.0, 50.0), 10),
            DwellDirection::Up
        );
        assert_eq!(
            dwell_direction((150.0, 100.0), (100.0, 100.0), 10),
            DwellDirection::Left
        );
        assert_eq!(
            dwell_direction((100.0, 100.0), (150.0, 110.0), 10),
            DwellDirection::Right
        );
        assert_eq!(
            dwell_direction((100.0, 100.0), (95.0, 160.0), 10),
            DwellDirection::Down
        );
        assert_eq!(
            dwell_direction((100.0, 100.0), (105.0, 104.0), 10),
            DwellDirection::None
        );
    }

    #[test]
    fn test_dwell_direction_tie_is_vertical() {
        assert_eq!(
            dwell_direction((0.0, 0.0), (30.0, 30.0), 10),
            DwellDirection::Down
        );
        assert_eq!(
            dwell_direction((0.0, 0.0), (-30.0, -30.0), 10),
            DwellDirection::Up
        );
    }

    #[test]
    fn test_disabled_does_nothing() {
        let mut h = Harness::new(PointerA11ySettings::default());
        h.motion(50.0, 50.0, 0);
        h.button(1, true, 10);
        assert!(h.timers.is_empty());
        assert!(h.effects.is_empty());
    }

    #[test]
    fn test_dwell_primary_click() {
        let mut h = Harness::dwell();
        h.rest_and_dwell(50.0, 50.0, 0);
        assert_eq!(h.buttons(), vec![(1, true), (1, false)]);
        assert!(h.effects.iter().any(|e| matches!(
            e,
            A11yEffect::Notify(SeatNotification::PtrA11yTimeoutStopped {
                timeout: PointerA11yTimeout::Dwell,
                completed: true,
                ..
            })
        )));
        assert!(h.timers.is_empty());
    }

    #[test]
    fn test_small_motion_keeps_dwell() {
        let mut h = Harness::dwell();
        h.motion(50.0, 50.0, 0);
        h.fire_next();
        assert!(h.state.is_dwell_pending());

        h.motion(53.0, 52.0, 200_000);
        assert!(h.state.is_dwell_pending());
        assert_eq!(h.state.dwell_position(), (50.0, 50.0));
    }

    #[test]
    fn test_large_motion_cancels_dwell() {
        let mut h = Harness::dwell();
        h.motion(50.0, 50.0, 0);
        h.fire_next();
        h.motion(120.0, 50.0, 200_000);
        assert!(h.effects.iter().any(|e| matches!(
            e,
            A11yEffect::Notify(SeatNotification::PtrA11yTimeoutStopped {
                timeout: PointerA11yTimeout::Dwell,
                completed: false,
                ..
            })
        )));
        // A fresh pre-timer is armed at the new spot
        assert_eq!(h.fire_next(), Some((SeatTimer::DwellPosition, 300_000)));
        assert_eq!(h.state.dwell_position(), (120.0, 50.0));
    }

    #[test]
    fn test_transient_pause_does_not_arm_dwell() {
        let mut h = Harness::dwell();
        h.motion(50.0, 50.0, 0);
        h.motion(80.0, 50.0, 50_000);
        h.motion(110.0, 50.0, 90_000);
        assert_eq!(h.timers.len(), 1);
        assert_eq!(h.timers.next_deadline(), Some(190_000));
    }

    #[test]
    fn test_double_click_type_demoted() {
        let mut h = Harness::new(PointerA11ySettings {
            dwell_enabled: true,
            dwell_click_type: DwellClickType::Double,
            ..Default::default()
        });
        h.rest_and_dwell(50.0, 50.0, 0);
        assert_eq!(
            h.buttons(),
            vec![(1, true), (1, false), (1, true), (1, false)]
        );
        assert!(h
            .effects
            .contains(&A11yEffect::DwellClickTypeChanged(DwellClickType::Primary)));
    }

    #[test]
    fn test_drag_press_then_release() {
        let mut h = Harness::new(PointerA11ySettings {
            dwell_enabled: true,
            dwell_click_type: DwellClickType::Drag,
            ..Default::default()
        });
        h.rest_and_dwell(50.0, 50.0, 0);
        assert!(h.state.is_dragging());
        assert_eq!(h.buttons(), vec![(1, true)]);
        assert!(!h
            .effects
            .iter()
            .any(|e| matches!(e, A11yEffect::DwellClickTypeChanged(_))));

        h.rest_and_dwell(200.0, 200.0, 2_000_000);
        assert!(!h.state.is_dragging());
        assert_eq!(h.buttons(), vec![(1, true), (1, false)]);
        assert!(h
            .effects
            .contains(&A11yEffect::DwellClickTypeChanged(DwellClickType::Primary)));
    }

    #[test]
    fn test_gesture_mode_classifies_movement() {
        let mut h = Harness::new(PointerA11ySettings {
            dwell_enabled: true,
            dwell_mode: DwellMode::Gesture,
            ..Default::default()
        });
        h.rest_and_dwell(100.0, 100.0, 0);
        assert!(h.state.is_gesturing());
        assert!(h.buttons().is_empty());

        // Moving during the gesture keeps the anchor
        h.motion(100.0, 50.0, 2_000_000);
        assert_eq!(h.state.dwell_position(), (100.0, 100.0));
        assert!(h.state.is_dwell_pending());

        assert_eq!(h.fire_next(), Some((SeatTimer::DwellGesture, 2_500_000)));
        assert!(h.effects.contains(&A11yEffect::VirtualAbsolute {
            device: VIRT,
            x: 100.0,
            y: 100.0,
            time_us: 2_500_000,
        }));
        // Up maps to a double click by default
        assert_eq!(
            h.buttons(),
            vec![(1, true), (1, false), (1, true), (1, false)]
        );

        assert_eq!(
            h.fire_next(),
            Some((SeatTimer::ClearDwellGesture, 3_700_000))
        );
        assert!(!h.state.is_gesturing());
    }

    #[test]
    fn test_secondary_click_on_hold() {
        let mut h = Harness::new(PointerA11ySettings {
            secondary_click_enabled: true,
            ..Default::default()
        });
        h.button(1, true, 0);
        assert!(h.state.is_secondary_click_pending());
        assert_eq!(h.fire_next(), Some((SeatTimer::SecondaryClick, 1_200_000)));

        h.button(1, false, 1_500_000);
        assert_eq!(h.buttons(), vec![(3, true), (3, false)]);
        assert_eq!(h.state.pressed_buttons(), 0);
    }

    #[test]
    fn test_short_press_no_secondary_click() {
        let mut h = Harness::new(PointerA11ySettings {
            secondary_click_enabled: true,
            ..Default::default()
        });
        h.button(1, true, 0);
        h.button(1, false, 200_000);
        assert!(h.buttons().is_empty());
        assert!(h.timers.is_empty());
    }

    #[test]
    fn test_motion_cancels_secondary_click() {
        let mut h = Harness::new(PointerA11ySettings {
            secondary_click_enabled: true,
            ..Default::default()
        });
        h.motion(10.0, 10.0, 0);
        h.button(1, true, 10);
        h.motion(80.0, 10.0, 100_000);
        assert!(!h.state.is_secondary_click_pending());
        assert!(h.timers.is_empty());
    }

    #[test]
    fn test_teardown_finishes_drag() {
        let mut h = Harness::new(PointerA11ySettings {
            dwell_enabled: true,
            dwell_click_type: DwellClickType::Drag,
            ..Default::default()
        });
        h.rest_and_dwell(50.0, 50.0, 0);
        h.motion(90.0, 50.0, 1_400_000);

        let (mut ctx, state, _) = h.ctx();
        state.teardown(&mut ctx, 1_500_000);
        assert!(!h.state.is_dragging());
        assert_eq!(h.buttons(), vec![(1, true), (1, false)]);
        assert!(h.timers.is_empty());
    }
}
