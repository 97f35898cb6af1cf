//! Marlin Response Parser
//!
//! Extracts structured data from the free-text replies to `M105`, `M114`
//! and `M115`. Parsing is best effort: unrecognised replies yield `None`.

use printscope_core::Position;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TEMPERATURE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(T\d?|B):\s*(-?[\d.]+)(?:\s*/\s*(-?[\d.]+))?").ok()
});

static POSITION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"X:\s*(-?[\d.]+)\s+Y:\s*(-?[\d.]+)\s+Z:\s*(-?[\d.]+)").ok()
});

static FIRMWARE_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([A-Z_]+):").ok());

/// One heater reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaterReading {
    /// Measured temperature in °C
    pub current: f64,
    /// Target temperature in °C, when reported
    pub target: Option<f64>,
}

/// Temperatures reported by `M105`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TemperatureReport {
    /// Hotend (`T:`)
    pub hotend: Option<HeaterReading>,
    /// Bed (`B:`)
    pub bed: Option<HeaterReading>,
}

impl TemperatureReport {
    /// Whether anything was reported
    pub fn is_empty(&self) -> bool {
        self.hotend.is_none() && self.bed.is_none()
    }
}

/// Firmware identity reported by `M115`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FirmwareInfo {
    /// Firmware name, e.g. `Marlin`
    pub name: String,
    /// Version text following the name
    pub version: Option<String>,
    /// Machine type, when reported
    pub machine_type: Option<String>,
    /// Every key/value pair on the info line
    pub fields: BTreeMap<String, String>,
}

/// Marlin response parser
#[derive(Debug, Default, Clone, Copy)]
pub struct MarlinResponseParser;

impl MarlinResponseParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse an `M105` reply
    ///
    /// Accepts `T:21.3 /0.0 B:22.1 /60.0` as well as bare `T:21.3 B:22.1`.
    pub fn parse_temperatures(&self, text: &str) -> Option<TemperatureReport> {
        let re = TEMPERATURE.as_ref()?;
        let mut report = TemperatureReport::default();

        for caps in re.captures_iter(text) {
            let Some(current) = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) else {
                continue;
            };
            let reading = HeaterReading {
                current,
                target: caps.get(3).and_then(|m| m.as_str().parse::<f64>().ok()),
            };
            match caps.get(1).map(|m| m.as_str()) {
                Some("B") if report.bed.is_none() => report.bed = Some(reading),
                Some(key) if key.starts_with('T') && report.hotend.is_none() => {
                    report.hotend = Some(reading)
                }
                _ => {}
            }
        }

        if report.is_empty() {
            None
        } else {
            Some(report)
        }
    }

    /// Parse an `M114` reply into a machine-frame position
    pub fn parse_position(&self, text: &str) -> Option<Position> {
        let caps = POSITION.as_ref()?.captures(text)?;
        let axis = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
        Some(Position::new(axis(1)?, axis(2)?, axis(3)?))
    }

    /// Parse an `M115` reply
    pub fn parse_firmware_info(&self, text: &str) -> Option<FirmwareInfo> {
        let line = text
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("FIRMWARE_NAME:"))?;
        let fields = parse_key_values(line)?;

        let full_name = fields.get("FIRMWARE_NAME")?.trim().to_string();
        let mut parts = full_name.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_string();
        let version = parts
            .next()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Some(FirmwareInfo {
            name,
            version,
            machine_type: fields.get("MACHINE_TYPE").cloned(),
            fields,
        })
    }
}

/// Split `KEY_A:value a KEY_B:value b` into its key/value pairs
fn parse_key_values(line: &str) -> Option<BTreeMap<String, String>> {
    let re = FIRMWARE_KEY.as_ref()?;
    let keys: Vec<_> = re.captures_iter(line).filter_map(|c| c.get(1)).collect();

    let mut fields = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        let value_start = key.end() + 1;
        let value_end = keys.get(i + 1).map_or(line.len(), |next| next.start());
        if value_start <= value_end {
            let value = line[value_start..value_end].trim().to_string();
            fields.insert(key.as_str().to_string(), value);
        }
    }
    Some(fields)
}
