//! battlog configuration
//!
//! TOML file with three sections: `[logger]` for the sampler, `[analytics]`
//! for rate/ETA and screen-on time, `[chart]` for the TUI. Every key has a
//! default, so any subset may be given.
//!
//! Files are layered, later ones overriding single keys of earlier ones:
//! `/etc/battlog/config.toml`, then `$XDG_CONFIG_HOME/battlog/config.toml`,
//! then an explicit `--config` path.

use chrono::{Duration, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chart::ChartSettings;
use crate::error::{BattlogError, Result};
use crate::window::WindowLimits;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/battlog/config.toml";
pub const APP_DIR: &str = "battlog";
const CONFIG_FILE: &str = "config.toml";

/// Clock used for new log timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimezoneMode {
    #[default]
    #[serde(alias = "local", alias = "LOCAL")]
    Local,
    #[serde(rename = "UTC", alias = "utc", alias = "Utc")]
    Utc,
}

/// Sampler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Seconds between samples on battery
    pub interval_secs: u64,
    /// Seconds between samples on AC
    pub interval_secs_on_ac: u64,
    pub timezone: TimezoneMode,
    /// Directory of the CSV log, `~` is expanded
    pub log_dir: String,
    pub log_file: String,
    /// Data lines kept after a trim
    pub max_lines: usize,
    /// Extra lines tolerated before trimming
    pub trim_buffer: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            interval_secs_on_ac: 300,
            timezone: TimezoneMode::Local,
            log_dir: default_log_dir(),
            log_file: "battery.csv".to_string(),
            max_lines: 1000,
            trim_buffer: 100,
        }
    }
}

/// Rate, ETA and screen-on time settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Charge target used for "time to full"
    pub max_charge_percent: u8,
    /// Sampling gaps at least this long count as suspend
    pub suspend_gap_minutes: i64,
    /// Recency weight of the regression, 0 = plain least squares
    pub alpha: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_charge_percent: 100,
            suspend_gap_minutes: 10,
            alpha: 0.05,
        }
    }
}

/// TUI chart settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    /// 256-color palette index of daytime columns
    pub day_color: u8,
    /// 256-color palette index of nighttime columns
    pub night_color: u8,
    pub base_window_hours: i64,
    pub min_window_minutes: i64,
    pub max_window_days: i64,
    pub zoom_step: f64,
    pub pan_fraction: f64,
    pub line_gap_minutes: i64,
    pub refresh_secs: u64,
    /// Date labels above each midnight marker
    pub show_dates: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            day_start_hour: 7,
            day_end_hour: 19,
            day_color: 237,
            night_color: 0,
            base_window_hours: 24,
            min_window_minutes: 5,
            max_window_days: 7,
            zoom_step: 0.1,
            pan_fraction: 0.1,
            line_gap_minutes: 5,
            refresh_secs: 10,
            show_dates: true,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BattlogConfig {
    pub logger: LoggerConfig,
    pub analytics: AnalyticsConfig,
    pub chart: ChartConfig,
}

/// Config files that are consulted, and which of them exist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPaths {
    pub candidates: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
}

impl ConfigPaths {
    /// One-line summary for the status panel
    pub fn describe(&self) -> String {
        match self.existing.as_slice() {
            [] => "Config: Using defaults (no config file found)".to_string(),
            [only] => format!("Config file: {}", only.display()),
            [.., last] => format!(
                "Config files: {} (+ {} more)",
                last.display(),
                self.existing.len() - 1
            ),
        }
    }
}

/// Candidate config files in load order
pub fn config_paths(explicit: Option<&Path>) -> ConfigPaths {
    let mut candidates = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join(CONFIG_FILE));
    }
    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }
    let existing = candidates.iter().filter(|p| p.is_file()).cloned().collect();
    ConfigPaths {
        candidates,
        existing,
    }
}

impl BattlogConfig {
    /// Load defaults plus every existing layer, then validate.
    ///
    /// An explicit path that does not exist is an error; missing system and
    /// user files are not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(BattlogError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                ));
            }
        }
        let paths = config_paths(explicit);
        Self::load_from(&paths.existing)
    }

    /// Load defaults overlaid with `files`, in order
    pub fn load_from(files: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Value::try_from(Self::default()).map_err(|e| {
            BattlogError::InvalidConfig(format!("cannot serialize defaults: {}", e))
        })?;

        for path in files {
            let content = fs::read_to_string(path).map_err(|e| BattlogError::io(path, e))?;
            let layer: toml::Value =
                toml::from_str(&content).map_err(|e| BattlogError::ConfigParse {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            debug!("Applying config layer {}", path.display());
            merge_toml(&mut merged, layer);
        }

        let config: Self = merged.try_into().map_err(|e: toml::de::Error| {
            BattlogError::InvalidConfig(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the sampler or the chart cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(BattlogError::InvalidConfig(msg)) };
        let l = &self.logger;
        let a = &self.analytics;
        let c = &self.chart;

        if l.interval_secs == 0 || l.interval_secs_on_ac == 0 {
            return invalid("sampling intervals must be positive".to_string());
        }
        if l.log_file.is_empty() {
            return invalid("log_file must not be empty".to_string());
        }
        if a.max_charge_percent == 0 || a.max_charge_percent > 100 {
            return invalid(format!(
                "max_charge_percent must be 1-100, got {}",
                a.max_charge_percent
            ));
        }
        if a.suspend_gap_minutes <= 0 {
            return invalid("suspend_gap_minutes must be positive".to_string());
        }
        if !a.alpha.is_finite() || a.alpha < 0.0 {
            return invalid(format!("alpha must be >= 0, got {}", a.alpha));
        }
        if c.day_start_hour > 23 || c.day_end_hour > 23 {
            return invalid(format!(
                "day hours must be 0-23, got {}-{}",
                c.day_start_hour, c.day_end_hour
            ));
        }
        if c.base_window_hours <= 0 || c.min_window_minutes <= 0 || c.max_window_days <= 0 {
            return invalid("window durations must be positive".to_string());
        }
        let limits = self.window_limits();
        if limits.min > limits.base || limits.base > limits.max {
            return invalid(
                "window durations must satisfy min <= base <= max".to_string(),
            );
        }
        if !(c.zoom_step > 0.0 && c.zoom_step < 1.0) {
            return invalid(format!("zoom_step must be in (0, 1), got {}", c.zoom_step));
        }
        if !(c.pan_fraction > 0.0 && c.pan_fraction <= 1.0) {
            return invalid(format!(
                "pan_fraction must be in (0, 1], got {}",
                c.pan_fraction
            ));
        }
        if c.line_gap_minutes < 0 {
            return invalid("line_gap_minutes must not be negative".to_string());
        }
        if c.refresh_secs == 0 {
            return invalid("refresh_secs must be positive".to_string());
        }
        Ok(())
    }

    /// Log directory with `~` expanded
    pub fn log_dir(&self) -> PathBuf {
        expand_tilde(&self.logger.log_dir)
    }

    /// Path of the CSV log; creates the log directory
    pub fn log_path(&self) -> Result<PathBuf> {
        let dir = self.log_dir();
        fs::create_dir_all(&dir).map_err(|e| BattlogError::io(&dir, e))?;
        Ok(dir.join(&self.logger.log_file))
    }

    /// RFC 3339 timestamp for a new sample, in the configured timezone
    pub fn timestamp_now(&self) -> String {
        match self.logger.timezone {
            TimezoneMode::Local => Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            TimezoneMode::Utc => Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Sampling period for the current AC state
    pub fn sample_interval(&self, ac_connected: bool) -> std::time::Duration {
        let secs = if ac_connected {
            self.logger.interval_secs_on_ac
        } else {
            self.logger.interval_secs
        };
        std::time::Duration::from_secs(secs)
    }

    /// Line count (header included) past which the log is trimmed
    pub fn trim_threshold(&self) -> usize {
        self.logger.max_lines + self.logger.trim_buffer + 1
    }

    pub fn suspend_gap(&self) -> Duration {
        Duration::minutes(self.analytics.suspend_gap_minutes)
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.chart.refresh_secs)
    }

    pub fn window_limits(&self) -> WindowLimits {
        let c = &self.chart;
        WindowLimits {
            base: Duration::hours(c.base_window_hours),
            min: Duration::minutes(c.min_window_minutes),
            max: Duration::days(c.max_window_days),
            zoom_step: c.zoom_step,
            pan_fraction: c.pan_fraction,
        }
    }

    pub fn chart_settings(&self) -> ChartSettings {
        ChartSettings {
            day_start_hour: self.chart.day_start_hour,
            day_end_hour: self.chart.day_end_hour,
            line_gap: Duration::minutes(self.chart.line_gap_minutes),
            show_dates: self.chart.show_dates,
            ..ChartSettings::default()
        }
    }
}

/// Directory for the TUI's own log file
pub fn state_dir() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| expand_tilde("~/.local/state"))
        .join(APP_DIR)
}

fn default_log_dir() -> String {
    state_dir().display().to_string()
}

/// Replace a leading `~` with the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}

/// Overlay `layer` onto `base`, recursing into tables
fn merge_toml(base: &mut toml::Value, layer: toml::Value) {
    match (base, layer) {
        (toml::Value::Table(base), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = BattlogConfig::default();
        assert_eq!(config.logger.interval_secs, 60);
        assert_eq!(config.logger.interval_secs_on_ac, 300);
        assert_eq!(config.logger.max_lines, 1000);
        assert_eq!(config.analytics.suspend_gap_minutes, 10);
        assert_eq!(config.chart.day_start_hour, 7);
        assert_eq!(config.chart.day_end_hour, 19);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.toml", "[chart]\nday_start_hour = 6\n");
        let config = BattlogConfig::load_from(&[path]).unwrap();
        assert_eq!(config.chart.day_start_hour, 6);
        assert_eq!(config.chart.day_end_hour, 19);
        assert_eq!(config.logger.interval_secs, 60);
    }

    #[test]
    fn test_later_layer_overrides_single_keys() {
        let dir = TempDir::new().unwrap();
        let system = write(
            &dir,
            "system.toml",
            "[logger]\ninterval_secs = 30\nmax_lines = 500\n",
        );
        let user = write(&dir, "user.toml", "[logger]\nmax_lines = 2000\n");
        let config = BattlogConfig::load_from(&[system, user]).unwrap();
        assert_eq!(config.logger.interval_secs, 30);
        assert_eq!(config.logger.max_lines, 2000);
    }

    #[test]
    fn test_timezone_parsing() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "tz.toml", "[logger]\ntimezone = \"UTC\"\n");
        let config = BattlogConfig::load_from(&[path]).unwrap();
        assert_eq!(config.logger.timezone, TimezoneMode::Utc);
        assert!(config.timestamp_now().ends_with('Z'));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.toml", "[logger\ninterval_secs = ");
        let err = BattlogConfig::load_from(&[path]).unwrap_err();
        assert!(matches!(err, BattlogError::ConfigParse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BattlogConfig::default();
        config.chart.day_end_hour = 24;
        assert!(config.validate().is_err());

        let mut config = BattlogConfig::default();
        config.chart.min_window_minutes = 60 * 48;
        assert!(config.validate().is_err());

        let mut config = BattlogConfig::default();
        config.chart.zoom_step = 1.0;
        assert!(config.validate().is_err());

        let mut config = BattlogConfig::default();
        config.analytics.alpha = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = BattlogConfig::load(Some(Path::new("/nonexistent/battlog.toml"))).unwrap_err();
        assert!(matches!(err, BattlogError::Io { .. }));
    }

    #[test]
    fn test_chart_settings_from_chart_section() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "chart.toml",
            "[chart]\nshow_dates = false\nline_gap_minutes = 15\nday_end_hour = 21\n",
        );
        let settings = BattlogConfig::load_from(&[path]).unwrap().chart_settings();
        assert!(!settings.show_dates);
        assert_eq!(settings.line_gap, Duration::minutes(15));
        assert_eq!(settings.day_end_hour, 21);
        assert!(BattlogConfig::default().chart_settings().show_dates);
    }

    #[test]
    fn test_window_limits_from_chart_section() {
        let limits = BattlogConfig::default().window_limits();
        assert_eq!(limits.base, Duration::hours(24));
        assert_eq!(limits.min, Duration::minutes(5));
        assert_eq!(limits.max, Duration::days(7));
    }

    #[test]
    fn test_trim_threshold_counts_header() {
        assert_eq!(BattlogConfig::default().trim_threshold(), 1101);
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/var/log"), PathBuf::from("/var/log"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x/y"), home.join("x/y"));
        }
    }

    #[test]
    fn test_describe_config_paths() {
        let none = ConfigPaths::default();
        assert!(none.describe().contains("Using defaults"));

        let two = ConfigPaths {
            candidates: vec![],
            existing: vec![PathBuf::from("/etc/a.toml"), PathBuf::from("/home/b.toml")],
        };
        assert_eq!(two.describe(), "Config files: /home/b.toml (+ 1 more)");
    }
}
