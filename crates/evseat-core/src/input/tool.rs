// Evseat Input Layer - Tablet Tools
// Tools seen by a tablet and the axes they report

use strum_macros::{Display, EnumString};

/// Physical kind of tablet tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ToolType {
    Pen,
    Eraser,
    Brush,
    Pencil,
    Airbrush,
    Mouse,
    Lens,
}

impl ToolType {
    /// Mouse and lens tools are puck-like and always move relatively
    pub fn is_puck(self) -> bool {
        matches!(self, ToolType::Mouse | ToolType::Lens)
    }
}

/// A tool as reported with each raw tablet event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolDescriptor {
    /// Hardware serial, 0 when the tablet does not report one
    pub serial: u64,
    pub tool_type: ToolType,
}

/// A tool known to a tablet device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabletTool {
    pub serial: u64,
    pub tool_type: ToolType,
}

impl From<ToolDescriptor> for TabletTool {
    fn from(desc: ToolDescriptor) -> Self {
        Self {
            serial: desc.serial,
            tool_type: desc.tool_type,
        }
    }
}

/// Optional axes a tool may carry besides its position.
///
/// An axis is `None` when the tool lacks it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TabletAxes {
    pub distance: Option<f64>,
    pub pressure: Option<f64>,
    pub tilt: Option<(f64, f64)>,
    pub rotation: Option<f64>,
    pub slider: Option<f64>,
    pub wheel: Option<f64>,
}

impl TabletAxes {
    pub fn is_empty(&self) -> bool {
        *self == TabletAxes::default()
    }
}

/// Tools a tablet has seen, with the one currently in proximity
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: Vec<TabletTool>,
    last: Option<usize>,
}

impl ToolSet {
    pub fn lookup(&self, serial: u64, tool_type: ToolType) -> Option<&TabletTool> {
        self.tools
            .iter()
            .find(|t| t.serial == serial && t.tool_type == tool_type)
    }

    /// Make `desc` the current tool, creating it on first sight.
    /// Returns true when the current tool changed.
    pub fn update(&mut self, desc: Option<ToolDescriptor>) -> bool {
        let index = desc.map(|desc| {
            match self
                .tools
                .iter()
                .position(|t| t.serial == desc.serial && t.tool_type == desc.tool_type)
            {
                Some(index) => index,
                None => {
                    log::debug!("new {} tool, serial {:#x}", desc.tool_type, desc.serial);
                    self.tools.push(desc.into());
                    self.tools.len() - 1
                }
            }
        });

        let changed = self.last != index;
        self.last = index;
        changed
    }

    pub fn current(&self) -> Option<TabletTool> {
        self.last.and_then(|i| self.tools.get(i).copied())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
