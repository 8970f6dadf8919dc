//! Non-interactive commands: status, trim, paths

use anyhow::{Context, Result};
use battlog_common::config::{config_paths, state_dir, BattlogConfig};
use battlog_common::csv_log::CsvLog;
use battlog_common::power::{PowerReading, PowerSupplyReader};
use battlog_common::status::{StatusContext, StatusLine, StatusReport, Tone};
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Everything the status summary needs besides the samples
pub fn status_context(config: &BattlogConfig, explicit: Option<&Path>) -> Result<StatusContext> {
    let log_path = config.log_path().context("Failed to resolve log path")?;
    Ok(StatusContext {
        log_path,
        config_summary: config_paths(explicit).describe(),
        cycle_count: PowerSupplyReader::default().cycle_count(),
        live_reading: None,
    })
}

/// Current power supply state; `None` when it cannot be read
pub fn live_reading(reader: &PowerSupplyReader) -> Option<PowerReading> {
    match reader.read() {
        Ok(reading) => Some(reading),
        Err(e) => {
            debug!("No live power reading: {}", e);
            None
        }
    }
}

/// Print the status summary, as colored text or as JSON
pub fn status(
    config: &BattlogConfig,
    context: StatusContext,
    json: bool,
    now: DateTime<Local>,
    out: &mut impl Write,
) -> Result<()> {
    let log = CsvLog::new(context.log_path.clone());
    let samples = log
        .read_samples()
        .with_context(|| format!("Failed to read {}", log.path().display()))?;
    debug!("Read {} samples", samples.len());

    let report = StatusReport::build(&samples, config, context, now);
    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    match report {
        Some(report) => {
            for line in report.lines() {
                writeln!(out, "{}", paint(&line))?;
            }
        }
        None => writeln!(out, "{}", format!("No data in {}", log.path().display()).yellow())?,
    }
    Ok(())
}

fn paint(line: &StatusLine) -> String {
    match line.tone {
        Tone::Plain => line.text.clone(),
        Tone::Headline => line.text.yellow().bold().to_string(),
        Tone::Section => line.text.cyan().to_string(),
        Tone::Good => line.text.green().to_string(),
        Tone::Bad => line.text.red().to_string(),
    }
}

/// Trim the log to `max_lines` data lines now
pub fn trim(config: &BattlogConfig, out: &mut impl Write) -> Result<()> {
    let log = CsvLog::new(config.log_path()?);
    let before = log.line_count()?;
    log.trim_to_last(config.logger.max_lines)?;
    let after = log.line_count()?;
    writeln!(
        out,
        "{} {} ({} -> {} lines)",
        "Trimmed".green(),
        log.path().display(),
        before,
        after
    )?;
    Ok(())
}

/// Show where data, config and logs live
pub fn paths(config: &BattlogConfig, explicit: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let files = config_paths(explicit);
    writeln!(out, "{}", "[DATA]".cyan())?;
    writeln!(out, "  log file:   {}", config.log_dir().join(&config.logger.log_file).display())?;
    writeln!(out, "  state dir:  {}", state_dir().display())?;
    writeln!(out)?;
    writeln!(out, "{}", "[CONFIG]".cyan())?;
    for path in &files.candidates {
        let marker = if files.existing.contains(path) {
            "[present]".green().to_string()
        } else {
            "[not present]".dimmed().to_string()
        };
        writeln!(out, "  {} {}", path.display(), marker)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap()
    }

    fn config(dir: &TempDir) -> BattlogConfig {
        let mut config = BattlogConfig::default();
        config.logger.log_dir = dir.path().display().to_string();
        config.logger.max_lines = 10;
        config
    }

    fn write_log(config: &BattlogConfig, rows: i64) -> CsvLog {
        let log = CsvLog::new(config.log_path().unwrap());
        for m in 0..rows {
            let t = now() - Duration::minutes(rows - m);
            log.append(&t.to_rfc3339(), false, (90 - m / 2) as u8).unwrap();
        }
        log
    }

    fn context(config: &BattlogConfig) -> StatusContext {
        StatusContext {
            log_path: config.log_path().unwrap(),
            config_summary: "Config: Using defaults (no config file found)".to_string(),
            cycle_count: None,
            live_reading: None,
        }
    }

    #[test]
    fn test_status_text() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        write_log(&config, 30);

        let mut out = Vec::new();
        status(&config, context(&config), false, now(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Unplugged"));
        assert!(text.contains("Data Summary:"));
    }

    #[test]
    fn test_status_json() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        write_log(&config, 30);

        let mut out = Vec::new();
        status(&config, context(&config), true, now(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["latest"]["ac_connected"], false);
        assert_eq!(value["counts"]["total"], 30);
    }

    #[test]
    fn test_status_without_samples() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let log = CsvLog::new(config.log_path().unwrap());
        std::fs::write(log.path(), "timestamp,ac_connected,battery_life\n").unwrap();

        let mut out = Vec::new();
        status(&config, context(&config), true, now(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "null");
    }

    #[test]
    fn test_status_missing_log_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let mut out = Vec::new();
        assert!(status(&config, context(&config), false, now(), &mut out).is_err());
    }

    #[test]
    fn test_live_reading_from_sysfs() {
        let dir = TempDir::new().unwrap();
        let bat = dir.path().join("BAT0");
        std::fs::create_dir_all(&bat).unwrap();
        std::fs::write(bat.join("type"), "Battery\n").unwrap();
        std::fs::write(bat.join("capacity"), "64\n").unwrap();
        std::fs::write(bat.join("status"), "Discharging\n").unwrap();

        let reading = live_reading(&PowerSupplyReader::new(dir.path())).unwrap();
        assert_eq!(reading.battery_percent, 64);
        assert!(!reading.ac_connected);

        let empty = TempDir::new().unwrap();
        assert!(live_reading(&PowerSupplyReader::new(empty.path())).is_none());
    }

    #[test]
    fn test_status_text_shows_live_reading() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        write_log(&config, 30);
        let mut ctx = context(&config);
        ctx.live_reading = Some(PowerReading {
            battery_percent: 64,
            ac_connected: false,
        });

        let mut out = Vec::new();
        status(&config, ctx, false, now(), &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Live reading: 64% (AC: Unplugged)"));
    }

    #[test]
    fn test_trim_keeps_max_lines() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let log = write_log(&config, 25);
        assert_eq!(log.line_count().unwrap(), 26);

        let mut out = Vec::new();
        trim(&config, &mut out).unwrap();
        assert_eq!(log.line_count().unwrap(), 11);
        assert!(String::from_utf8(out).unwrap().contains("26 -> 11 lines"));
    }

    #[test]
    fn test_paths_lists_explicit_config() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let explicit = dir.path().join("custom.toml");
        std::fs::write(&explicit, "").unwrap();

        let mut out = Vec::new();
        paths(&config, Some(&explicit), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("custom.toml"));
        assert!(text.contains("battery.csv"));
        assert!(text.contains("[present]"));
    }
}
