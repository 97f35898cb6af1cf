//! Marlin Command Creator
//!
//! Builds the G-code lines sent to a Marlin mainboard. The optional Y/Z swap
//! for gantries with exchanged axis wiring is applied here and nowhere else,
//! so callers always work in the logical coordinate frame.

use printscope_core::Position;

/// Marlin command lines used by the hardware layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarlinCommand {
    /// `G21` millimeter units
    Millimeters,
    /// `G90` absolute positioning
    AbsolutePositioning,
    /// `G28` home all axes
    HomeAll,
    /// `M112` emergency stop
    EmergencyStop,
    /// `M105` report temperatures
    ReportTemperatures,
    /// `M114` report position
    ReportPosition,
    /// `M115` report firmware info
    FirmwareInfo,
}

impl MarlinCommand {
    /// Command text, without terminator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Millimeters => "G21",
            Self::AbsolutePositioning => "G90",
            Self::HomeAll => "G28",
            Self::EmergencyStop => "M112",
            Self::ReportTemperatures => "M105",
            Self::ReportPosition => "M114",
            Self::FirmwareInfo => "M115",
        }
    }

    /// Commands issued once after the link opens
    pub fn setup_sequence() -> [MarlinCommand; 2] {
        [Self::Millimeters, Self::AbsolutePositioning]
    }
}

impl std::fmt::Display for MarlinCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marlin command creator
#[derive(Debug, Clone, Copy, Default)]
pub struct MarlinCommandCreator {
    swap_yz: bool,
}

impl MarlinCommandCreator {
    /// Create a command creator
    ///
    /// With `swap_yz`, logical Y is sent as machine Z and vice versa.
    pub fn new(swap_yz: bool) -> Self {
        Self { swap_yz }
    }

    /// Whether Y and Z are exchanged on the wire
    pub fn swaps_yz(&self) -> bool {
        self.swap_yz
    }

    /// Map a logical position to the machine frame
    pub fn to_machine(&self, position: &Position) -> Position {
        if self.swap_yz {
            position.swapped_yz()
        } else {
            *position
        }
    }

    /// Map a machine position reported by the firmware to the logical frame
    pub fn to_logical(&self, position: &Position) -> Position {
        // the swap is its own inverse
        self.to_machine(position)
    }

    /// `G1` linear move to `target` at `feedrate` mm/min
    pub fn linear_move(&self, target: &Position, feedrate: f64) -> String {
        let machine = self.to_machine(target);
        format!(
            "G1 X{:.3} Y{:.3} Z{:.3} F{}",
            machine.x, machine.y, machine.z, feedrate
        )
    }

    /// Fixed command text
    pub fn command(&self, command: MarlinCommand) -> String {
        command.as_str().to_string()
    }
}
