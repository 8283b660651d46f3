// Evseat Settings Module
// Seat, repeat and accessibility settings loaded from TOML

#![cfg(feature = "pure-rust")]

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::a11y::{
    DwellClickType, DwellDirection, DwellMode, KbdA11yFlags, KbdA11ySettings, PointerA11ySettings,
};
use crate::coords::StageSize;
use crate::repeat::RepeatConfig;
use crate::seat::SeatConfig;

/// Settings for a seat
///
/// Loaded from a TOML file (default: ~/.config/evseat/settings.toml).
/// Every section and key is optional, missing values keep their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    seat_name: String,
    stage: Option<StageSize>,
    repeat: RepeatConfig,
    kbd_a11y: KbdA11ySettings,
    pointer_a11y: PointerA11ySettings,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsToml {
    seat: SeatSection,
    keyboard: KeyboardSection,
    keyboard_a11y: KeyboardA11ySection,
    pointer_a11y: PointerA11ySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SeatSection {
    name: Option<String>,
    stage: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct KeyboardSection {
    repeat: Option<bool>,
    repeat_delay: Option<u32>,
    repeat_interval: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct KeyboardA11ySection {
    enabled: Option<bool>,
    timeout_enabled: Option<bool>,
    mouse_keys: Option<bool>,
    slow_keys: Option<bool>,
    slow_keys_beep_press: Option<bool>,
    slow_keys_beep_accept: Option<bool>,
    slow_keys_beep_reject: Option<bool>,
    bounce_keys: Option<bool>,
    bounce_keys_beep_reject: Option<bool>,
    toggle_keys: Option<bool>,
    sticky_keys: Option<bool>,
    sticky_keys_two_key_off: Option<bool>,
    sticky_keys_beep: Option<bool>,
    feature_state_change_beep: Option<bool>,

    slow_keys_delay: Option<u32>,
    bounce_keys_delay: Option<u32>,
    timeout_delay: Option<u32>,
    mouse_keys_init_delay: Option<u32>,
    mouse_keys_max_speed: Option<u32>,
    mouse_keys_accel_time: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PointerA11ySection {
    secondary_click: Option<bool>,
    secondary_click_delay: Option<u32>,
    dwell_click: Option<bool>,
    dwell_delay: Option<u32>,
    dwell_threshold: Option<u32>,
    dwell_mode: Option<String>,
    dwell_click_type: Option<String>,
    gesture_single: Option<String>,
    gesture_double: Option<String>,
    gesture_drag: Option<String>,
    gesture_secondary: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            seat_name: "seat0".to_string(),
            stage: None,
            repeat: RepeatConfig::default(),
            kbd_a11y: KbdA11ySettings::default(),
            pointer_a11y: PointerA11ySettings::default(),
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let parsed: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();
        settings.apply_seat(parsed.seat)?;
        settings.apply_keyboard(parsed.keyboard);
        settings.apply_keyboard_a11y(parsed.keyboard_a11y);
        settings.apply_pointer_a11y(parsed.pointer_a11y)?;
        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("evseat").join("settings.toml"))
    }

    /// Load from default location (~/.config/evseat/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::new())
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            *self = Self::from_file(path)?;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }

    pub fn seat_name(&self) -> &str {
        &self.seat_name
    }

    pub fn stage(&self) -> Option<StageSize> {
        self.stage
    }

    pub fn set_stage(&mut self, stage: StageSize) {
        self.stage = Some(stage);
    }

    pub fn repeat(&self) -> RepeatConfig {
        self.repeat
    }

    pub fn kbd_a11y(&self) -> KbdA11ySettings {
        self.kbd_a11y
    }

    pub fn pointer_a11y(&self) -> PointerA11ySettings {
        self.pointer_a11y
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Construction-time configuration for a seat. Pointer hooks are left
    /// unset.
    pub fn seat_config(&self) -> SeatConfig {
        SeatConfig {
            name: self.seat_name.clone(),
            stage: self.stage,
            repeat: self.repeat,
            kbd_a11y: self.kbd_a11y,
            pointer_a11y: self.pointer_a11y,
            ..Default::default()
        }
    }

    fn apply_seat(&mut self, seat: SeatSection) -> Result<(), SettingsError> {
        if let Some(name) = seat.name {
            if name.is_empty() {
                return Err(SettingsError::InvalidValue(
                    "seat name must not be empty".to_string(),
                ));
            }
            self.seat_name = name;
        }
        if let Some(stage) = seat.stage {
            self.stage = Some(parse_stage_size(&stage)?);
        }
        Ok(())
    }

    fn apply_keyboard(&mut self, keyboard: KeyboardSection) {
        if let Some(enabled) = keyboard.repeat {
            self.repeat.enabled = enabled;
        }
        if let Some(delay) = keyboard.repeat_delay {
            self.repeat.delay_ms = delay;
        }
        if let Some(interval) = keyboard.repeat_interval {
            self.repeat.interval_ms = interval;
        }
    }

    fn apply_keyboard_a11y(&mut self, section: KeyboardA11ySection) {
        let kbd = &mut self.kbd_a11y;
        let flags = [
            (section.enabled, KbdA11yFlags::KEYBOARD_ENABLED),
            (section.timeout_enabled, KbdA11yFlags::TIMEOUT_ENABLED),
            (section.mouse_keys, KbdA11yFlags::MOUSE_KEYS_ENABLED),
            (section.slow_keys, KbdA11yFlags::SLOW_KEYS_ENABLED),
            (section.slow_keys_beep_press, KbdA11yFlags::SLOW_KEYS_BEEP_PRESS),
            (section.slow_keys_beep_accept, KbdA11yFlags::SLOW_KEYS_BEEP_ACCEPT),
            (section.slow_keys_beep_reject, KbdA11yFlags::SLOW_KEYS_BEEP_REJECT),
            (section.bounce_keys, KbdA11yFlags::BOUNCE_KEYS_ENABLED),
            (section.bounce_keys_beep_reject, KbdA11yFlags::BOUNCE_KEYS_BEEP_REJECT),
            (section.toggle_keys, KbdA11yFlags::TOGGLE_KEYS_ENABLED),
            (section.sticky_keys, KbdA11yFlags::STICKY_KEYS_ENABLED),
            (section.sticky_keys_two_key_off, KbdA11yFlags::STICKY_KEYS_TWO_KEY_OFF),
            (section.sticky_keys_beep, KbdA11yFlags::STICKY_KEYS_BEEP),
            (section.feature_state_change_beep, KbdA11yFlags::FEATURE_STATE_CHANGE_BEEP),
        ];
        for (value, flag) in flags {
            if let Some(on) = value {
                kbd.controls.set(flag, on);
            }
        }

        if let Some(delay) = section.slow_keys_delay {
            kbd.slowkeys_delay = delay;
        }
        if let Some(delay) = section.bounce_keys_delay {
            kbd.debounce_delay = delay;
        }
        if let Some(delay) = section.timeout_delay {
            kbd.timeout_delay = delay;
        }
        if let Some(delay) = section.mouse_keys_init_delay {
            kbd.mousekeys_init_delay = delay;
        }
        if let Some(speed) = section.mouse_keys_max_speed {
            kbd.mousekeys_max_speed = speed.max(1);
        }
        if let Some(time) = section.mouse_keys_accel_time {
            kbd.mousekeys_accel_time = time.max(1);
        }
    }

    fn apply_pointer_a11y(&mut self, section: PointerA11ySection) -> Result<(), SettingsError> {
        let ptr = &mut self.pointer_a11y;
        if let Some(enabled) = section.secondary_click {
            ptr.secondary_click_enabled = enabled;
        }
        if let Some(delay) = section.secondary_click_delay {
            ptr.secondary_click_delay = delay;
        }
        if let Some(enabled) = section.dwell_click {
            ptr.dwell_enabled = enabled;
        }
        if let Some(delay) = section.dwell_delay {
            ptr.dwell_delay = delay;
        }
        if let Some(threshold) = section.dwell_threshold {
            ptr.dwell_threshold = threshold;
        }
        if let Some(mode) = section.dwell_mode {
            ptr.dwell_mode = parse_enum::<DwellMode>("dwell_mode", &mode)?;
        }
        if let Some(click_type) = section.dwell_click_type {
            ptr.dwell_click_type = parse_enum::<DwellClickType>("dwell_click_type", &click_type)?;
        }
        if let Some(direction) = section.gesture_single {
            ptr.dwell_gesture_single = parse_enum::<DwellDirection>("gesture_single", &direction)?;
        }
        if let Some(direction) = section.gesture_double {
            ptr.dwell_gesture_double = parse_enum::<DwellDirection>("gesture_double", &direction)?;
        }
        if let Some(direction) = section.gesture_drag {
            ptr.dwell_gesture_drag = parse_enum::<DwellDirection>("gesture_drag", &direction)?;
        }
        if let Some(direction) = section.gesture_secondary {
            ptr.dwell_gesture_secondary =
                parse_enum::<DwellDirection>("gesture_secondary", &direction)?;
        }
        Ok(())
    }
}

fn parse_enum<T: FromStr>(field: &str, value: &str) -> Result<T, SettingsError> {
    value.trim().to_lowercase().parse().map_err(|_| {
        SettingsError::InvalidValue(format!("Cannot parse '{}' as {}", value, field))
    })
}

/// Parse a stage size written as `WIDTHxHEIGHT`, e.g. `1920x1080`
pub fn parse_stage_size(value: &str) -> Result<StageSize, SettingsError> {
    let invalid = || SettingsError::InvalidValue(format!("Invalid stage size '{}'", value));
    let (width, height) = value.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok(StageSize::new(width as f32, height as f32))
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Evseat Settings
# Place this file at: ~/.config/evseat/settings.toml

[seat]
name = "seat0"
# stage = "1920x1080"

[keyboard]
repeat = true
repeat_delay = 250
repeat_interval = 33

[keyboard_a11y]
enabled = false
slow_keys = false
slow_keys_delay = 300
bounce_keys = false
bounce_keys_delay = 300
sticky_keys = false
toggle_keys = false
mouse_keys = false
mouse_keys_init_delay = 300
mouse_keys_max_speed = 10
mouse_keys_accel_time = 300

[pointer_a11y]
secondary_click = false
secondary_click_delay = 1200
dwell_click = false
dwell_delay = 1200
dwell_threshold = 10
# "window" or "gesture"
dwell_mode = "window"
dwell_click_type = "primary"
gesture_single = "left"
gesture_double = "up"
gesture_drag = "down"
gesture_secondary = "right"
"#
}
