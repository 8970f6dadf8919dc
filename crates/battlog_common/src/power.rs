//! Power supply detection
//!
//! Reads the kernel power supply class:
//! - battery charge percent and cycle count
//! - AC adapter online state, falling back to the battery status when no
//!   adapter is exposed

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{BattlogError, Result};

pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

const AC_NAME_PREFIXES: [&str; 3] = ["AC", "ACAD", "ADP"];

/// One reading of the power supplies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerReading {
    pub battery_percent: u8,
    pub ac_connected: bool,
}

/// Entry under the power supply class
#[derive(Debug)]
struct PowerSupply {
    name: String,
    supply_type: String,
    path: PathBuf,
}

impl PowerSupply {
    fn read_value(&self, attr: &str) -> Option<String> {
        fs::read_to_string(self.path.join(attr))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn is_battery(&self) -> bool {
        self.supply_type == "Battery" || self.name.starts_with("BAT")
    }

    fn is_adapter(&self) -> bool {
        self.supply_type == "Mains" || AC_NAME_PREFIXES.iter().any(|p| self.name.starts_with(p))
    }
}

/// Reader over a power supply directory
#[derive(Debug, Clone)]
pub struct PowerSupplyReader {
    root: PathBuf,
}

impl Default for PowerSupplyReader {
    fn default() -> Self {
        Self::new(POWER_SUPPLY_ROOT)
    }
}

impl PowerSupplyReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Supplies sorted by name so BAT0 wins over BAT1
    fn supplies(&self) -> Vec<PowerSupply> {
        let mut supplies = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().to_string();
                let path = entry.path();
                let supply_type = fs::read_to_string(path.join("type"))
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                supplies.push(PowerSupply {
                    name,
                    supply_type,
                    path,
                });
            }
        }

        supplies.sort_by(|a, b| a.name.cmp(&b.name));
        supplies
    }

    fn first_battery_value(&self, attr: &str) -> Option<String> {
        self.supplies()
            .iter()
            .filter(|s| s.is_battery())
            .find_map(|s| s.read_value(attr))
    }

    /// Charge of the first battery, clamped to 0-100
    pub fn battery_percent(&self) -> Option<u8> {
        let raw = self.first_battery_value("capacity")?;
        let value: i64 = raw.parse().ok()?;
        Some(value.clamp(0, 100) as u8)
    }

    /// Whether an adapter reports online; without one, a battery that is
    /// charging or full implies AC
    pub fn ac_online(&self) -> bool {
        let supplies = self.supplies();

        if let Some(online) = supplies
            .iter()
            .filter(|s| s.is_adapter())
            .find_map(|s| s.read_value("online"))
        {
            return online == "1";
        }

        supplies
            .iter()
            .filter(|s| s.is_battery())
            .find_map(|s| s.read_value("status"))
            .map(|status| matches!(status.as_str(), "Charging" | "Full"))
            .unwrap_or(false)
    }

    /// Charge cycles reported by the first battery
    pub fn cycle_count(&self) -> Option<u32> {
        self.first_battery_value("cycle_count")?.parse().ok()
    }

    pub fn read(&self) -> Result<PowerReading> {
        let battery_percent = self
            .battery_percent()
            .ok_or_else(|| BattlogError::BatteryNotFound(self.root.clone()))?;
        let ac_connected = self.ac_online();
        debug!(
            "Power reading: battery {}%, ac {}",
            battery_percent, ac_connected
        );
        Ok(PowerReading {
            battery_percent,
            ac_connected,
        })
    }
}
