//! Size conditions and human readable sizes for the SI and IEC unit systems.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SI_UNITS: [&str; 10] = [
    "Byte", "Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB",
];
const IEC_UNITS: [&str; 10] = [
    "Byte", "Bytes", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeSystem {
    /// Decimal units, powers of 1000.
    #[default]
    #[serde(rename = "SI")]
    Si,
    /// Binary units, powers of 1024.
    #[serde(rename = "IEC")]
    Iec,
}

impl SizeSystem {
    pub fn divisor(self) -> f64 {
        match self {
            SizeSystem::Si => 1000.0,
            SizeSystem::Iec => 1024.0,
        }
    }

    /// Unit names, singular byte first.
    pub fn units(self) -> &'static [&'static str; 10] {
        match self {
            SizeSystem::Si => &SI_UNITS,
            SizeSystem::Iec => &IEC_UNITS,
        }
    }

    /// Bytes per `unit`, or `None` when the unit does not belong to this system.
    pub fn unit_factor(self, unit: &str) -> Option<f64> {
        let index = self.units().iter().position(|u| *u == unit)?;
        // "Byte" and "Bytes" both map to exponent 0.
        let exponent = index.saturating_sub(1) as i32;
        Some(self.divisor().powi(exponent))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SizeSystem::Si => "SI",
            SizeSystem::Iec => "IEC",
        }
    }
}

impl fmt::Display for SizeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SI" => Ok(SizeSystem::Si),
            "IEC" => Ok(SizeSystem::Iec),
            other => Err(format!("unknown size system '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SizeCondition {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    Between,
    NotBetween,
    /// Any label not in the table above. Never matches.
    Unknown,
}

impl SizeCondition {
    pub fn parse(label: &str) -> Self {
        match label {
            "Equals" => SizeCondition::Equals,
            "Not equals" => SizeCondition::NotEquals,
            "Less than" => SizeCondition::LessThan,
            "Greater than" => SizeCondition::GreaterThan,
            "Between" => SizeCondition::Between,
            "Not between" => SizeCondition::NotBetween,
            _ => SizeCondition::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SizeCondition::Equals => "Equals",
            SizeCondition::NotEquals => "Not equals",
            SizeCondition::LessThan => "Less than",
            SizeCondition::GreaterThan => "Greater than",
            SizeCondition::Between => "Between",
            SizeCondition::NotBetween => "Not between",
            SizeCondition::Unknown => "Unknown",
        }
    }
}

impl From<String> for SizeCondition {
    fn from(label: String) -> Self {
        SizeCondition::parse(&label)
    }
}

impl From<SizeCondition> for String {
    fn from(condition: SizeCondition) -> Self {
        condition.as_str().to_string()
    }
}

impl fmt::Display for SizeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts `value` expressed in `unit` into bytes. Units foreign to `system` yield 0.
pub fn convert_size(value: f64, unit: &str, system: SizeSystem) -> u64 {
    match system.unit_factor(unit) {
        Some(factor) => (value * factor) as u64,
        None => 0,
    }
}

/// Evaluates a size condition against a file size in bytes.
///
/// `Between` is inclusive on both bounds and `NotBetween` is its complement.
pub fn matches_size(
    file_size: u64,
    system: SizeSystem,
    condition: SizeCondition,
    value1: f64,
    value2: f64,
    unit1: &str,
    unit2: &str,
) -> bool {
    let bound1 = convert_size(value1, unit1, system);
    let bound2 = convert_size(value2, unit2, system);

    match condition {
        SizeCondition::Equals => file_size == bound1,
        SizeCondition::NotEquals => file_size != bound1,
        SizeCondition::LessThan => file_size < bound1,
        SizeCondition::GreaterThan => file_size > bound1,
        SizeCondition::Between => file_size >= bound1 && file_size <= bound2,
        SizeCondition::NotBetween => file_size < bound1 || file_size > bound2,
        SizeCondition::Unknown => false,
    }
}

/// Formats a byte count as e.g. `0 Bytes`, `1 Byte`, `512 Bytes`, `1.5 KB`, `2 MiB`.
pub fn format_size_human(size: u64, system: SizeSystem) -> String {
    if size == 0 {
        return "0 Bytes".to_string();
    }

    let units = system.units();
    let divisor = system.divisor();
    let mut magnitude = size as f64;
    // Index into the scaled units; 0 is plain bytes.
    let mut scale = 0usize;
    while magnitude >= divisor && scale < units.len() - 2 {
        magnitude /= divisor;
        scale += 1;
    }

    let number = if magnitude.fract() == 0.0 {
        format!("{}", magnitude as u64)
    } else {
        format!("{magnitude:.1}")
    };

    let unit = match scale {
        0 if magnitude == 1.0 => units[0],
        0 => units[1],
        n => units[n + 1],
    };

    format!("{number} {unit}")
}
