use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Named evdev codes the pipeline refers to directly.
/// Values match Linux input-event-codes.h.
const NAMED_CODES: &[(&str, u16)] = &[
    ("ESC", 1),
    ("KEY_1", 2),
    ("KEY_2", 3),
    ("KEY_0", 11),
    ("BACKSPACE", 14),
    ("TAB", 15),
    ("Q", 16),
    ("W", 17),
    ("E", 18),
    ("R", 19),
    ("T", 20),
    ("Y", 21),
    ("I", 23),
    ("ENTER", 28),
    ("LEFT_CTRL", 29),
    ("A", 30),
    ("S", 31),
    ("D", 32),
    ("H", 35),
    ("J", 36),
    ("LEFT_SHIFT", 42),
    ("Z", 44),
    ("X", 45),
    ("C", 46),
    ("B", 48),
    ("RIGHT_SHIFT", 54),
    ("KPASTERISK", 55),
    ("LEFT_ALT", 56),
    ("SPACE", 57),
    ("CAPSLOCK", 58),
    ("F1", 59),
    ("NUMLOCK", 69),
    ("SCROLLLOCK", 70),
    ("KP7", 71),
    ("KP8", 72),
    ("KP9", 73),
    ("KPMINUS", 74),
    ("KP4", 75),
    ("KP5", 76),
    ("KP6", 77),
    ("KPPLUS", 78),
    ("KP1", 79),
    ("KP2", 80),
    ("KP3", 81),
    ("KP0", 82),
    ("KPDOT", 83),
    ("KPENTER", 96),
    ("RIGHT_CTRL", 97),
    ("KPSLASH", 98),
    ("RIGHT_ALT", 100),
    ("HOME", 102),
    ("UP", 103),
    ("LEFT", 105),
    ("RIGHT", 106),
    ("DOWN", 108),
    ("LEFT_META", 125),
    ("RIGHT_META", 126),
    ("MICMUTE", 248),
    ("BTN_MISC", 0x100),
    ("BTN_LEFT", 0x110),
    ("BTN_RIGHT", 0x111),
    ("BTN_MIDDLE", 0x112),
    ("BTN_SIDE", 0x113),
    ("BTN_EXTRA", 0x114),
    ("BTN_FORWARD", 0x115),
    ("BTN_BACK", 0x116),
    ("BTN_TASK", 0x117),
    ("BTN_TOOL_PEN", 0x140),
    ("BTN_TOOL_RUBBER", 0x141),
    ("BTN_TOOL_BRUSH", 0x142),
    ("BTN_TOOL_PENCIL", 0x143),
    ("BTN_TOOL_AIRBRUSH", 0x144),
    ("BTN_TOOL_FINGER", 0x145),
    ("BTN_TOOL_MOUSE", 0x146),
    ("BTN_TOOL_LENS", 0x147),
    ("BTN_TOOL_QUINTTAP", 0x148),
    ("BTN_STYLUS3", 0x149),
    ("BTN_TOUCH", 0x14a),
    ("BTN_STYLUS", 0x14b),
    ("BTN_STYLUS2", 0x14c),
    ("BTN_TOOL_DOUBLETAP", 0x14d),
    ("BTN_TOOL_TRIPLETAP", 0x14e),
    ("BTN_TOOL_QUADTAP", 0x14f),
    ("BTN_GEAR_UP", 0x151),
    ("KEY_OK", 0x160),
    ("KEY_LIGHTS_TOGGLE", 0x21e),
    ("BTN_DPAD_UP", 0x220),
    ("BTN_DPAD_RIGHT", 0x223),
    ("KEY_ALS_TOGGLE", 0x230),
    ("KEY_KBDINPUTASSIST_CANCEL", 0x26f),
    ("BTN_TRIGGER_HAPPY", 0x2c0),
    ("BTN_TRIGGER_HAPPY40", 0x2e7),
];

fn write_key_codes(f: &mut File) -> io::Result<()> {
    writeln!(
        f,
        r#"
/// A single evdev key or button code.
///
/// Newtype around u16; values match Linux input-event-codes.h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {{
    /// Get the raw evdev code
    pub fn code(self) -> u16 {{
        self.0
    }}

    /// Get the display name of this code
    pub fn name(self) -> &'static str {{
        key_name(self.0)
    }}
}}
"#
    )?;

    writeln!(f, "#[allow(missing_docs)]\nimpl Key {{")?;
    for (name, code) in NAMED_CODES {
        writeln!(f, "    pub const {name}: Key = Key({code:#x});")?;
    }
    writeln!(f, "}}\n")?;

    writeln!(f, "fn generated_key_name(code: u16) -> Option<&'static str> {{")?;
    writeln!(f, "    match code {{")?;
    for (name, code) in NAMED_CODES {
        writeln!(f, "        {code:#x} => Some(\"{name}\"),")?;
    }
    writeln!(f, "        _ => None,\n    }}\n}}\n")?;

    writeln!(f, "fn generated_key_from_name(name: &str) -> Option<Key> {{")?;
    writeln!(f, "    match name {{")?;
    for (name, code) in NAMED_CODES {
        writeln!(f, "        \"{name}\" => Some(Key({code:#x})),")?;
    }
    writeln!(f, "        _ => None,\n    }}\n}}")?;

    Ok(())
}

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("key_codes.rs");
    let mut f = File::create(&dest_path).expect("create key_codes.rs");
    write_key_codes(&mut f).expect("write key_codes.rs");

    println!("cargo:rerun-if-changed=build.rs");
}
