//! Sample model
//!
//! One reading of the power supply: when it was taken, whether AC was
//! connected, and the battery charge in percent. Samples are handed around as
//! chronologically sorted slices; nothing here re-sorts them.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

/// A single battery/AC reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken
    pub time: DateTime<Local>,
    /// AC adapter online at that moment
    pub ac_connected: bool,
    /// Battery charge, 0-100
    pub battery_percent: f64,
}

impl Sample {
    pub fn new(time: DateTime<Local>, ac_connected: bool, battery_percent: f64) -> Self {
        Self {
            time,
            ac_connected,
            battery_percent,
        }
    }
}

/// Which way the battery is (supposed to be) going for a given AC state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeDirection {
    Charging,
    Discharging,
}

impl ChargeDirection {
    pub fn from_ac(ac_connected: bool) -> Self {
        if ac_connected {
            ChargeDirection::Charging
        } else {
            ChargeDirection::Discharging
        }
    }

    /// Lowercase word used in confidence text ("charging" / "discharging")
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeDirection::Charging => "charging",
            ChargeDirection::Discharging => "discharging",
        }
    }
}

/// Earliest and latest timestamp of a sample set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBounds {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl DataBounds {
    /// Min/max over the sample timestamps. `None` for an empty set.
    pub fn of(samples: &[Sample]) -> Option<Self> {
        let first = samples.first()?;
        let (start, end) = samples
            .iter()
            .fold((first.time, first.time), |(lo, hi), s| {
                (lo.min(s.time), hi.max(s.time))
            });
        Some(Self { start, end })
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Raw counts over a sample set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleCounts {
    pub total: usize,
    pub on_ac: usize,
    pub on_battery: usize,
}

impl SampleCounts {
    pub fn of(samples: &[Sample]) -> Self {
        let on_ac = samples.iter().filter(|s| s.ac_connected).count();
        Self {
            total: samples.len(),
            on_ac,
            on_battery: samples.len() - on_ac,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(min: i64) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().unwrap() + Duration::minutes(min)
    }

    #[test]
    fn test_bounds_of_empty_is_none() {
        assert!(DataBounds::of(&[]).is_none());
    }

    #[test]
    fn test_bounds_use_min_and_max() {
        let samples = vec![
            Sample::new(at(5), false, 80.0),
            Sample::new(at(0), false, 81.0),
            Sample::new(at(30), true, 70.0),
        ];
        let bounds = DataBounds::of(&samples).unwrap();
        assert_eq!(bounds.start, at(0));
        assert_eq!(bounds.end, at(30));
        assert_eq!(bounds.span(), Duration::minutes(30));
    }

    #[test]
    fn test_counts_split_by_ac() {
        let samples = vec![
            Sample::new(at(0), true, 50.0),
            Sample::new(at(1), true, 51.0),
            Sample::new(at(2), false, 50.5),
        ];
        let counts = SampleCounts::of(&samples);
        assert_eq!(counts.total, 3);
        assert_eq!(counts.on_ac, 2);
        assert_eq!(counts.on_battery, 1);
    }

    #[test]
    fn test_direction_from_ac() {
        assert_eq!(ChargeDirection::from_ac(true), ChargeDirection::Charging);
        assert_eq!(ChargeDirection::from_ac(false).as_str(), "discharging");
    }
}
