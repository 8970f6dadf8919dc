//! End-to-end tests over the common crate: CSV log on disk through analytics,
//! status, window navigation and chart rendering.

use battlog_common::chart::{
    split_series, Band, CellRect, ChartRenderer, ChartSurface, Ink, SeriesKind,
};
use battlog_common::csv_log::CsvLog;
use battlog_common::status::{StatusContext, StatusReport};
use battlog_common::{BattlogConfig, PanDirection, Sample, ViewNavigator};
use chrono::{DateTime, Duration, Local, TimeZone};
use tempfile::TempDir;

fn base() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).single().unwrap()
}

/// A morning on battery, a 40 minute suspend, then charging
fn write_day(log: &CsvLog) {
    let mut rows: Vec<(i64, bool, u8)> = Vec::new();
    for m in 0..60 {
        rows.push((m, false, 90 - (m / 6) as u8));
    }
    for m in 100..130 {
        rows.push((m, true, 80 + ((m - 100) / 3) as u8));
    }
    for (m, ac, pct) in rows {
        let t = base() + Duration::minutes(m);
        log.append(&t.to_rfc3339(), ac, pct).unwrap();
    }
}

#[derive(Default)]
struct CountingSurface {
    pixels: Vec<(u32, u32, SeriesKind)>,
    texts: Vec<String>,
    day_cells: usize,
    night_cells: usize,
}

impl ChartSurface for CountingSurface {
    fn area(&self) -> CellRect {
        CellRect::new(0, 0, 100, 24)
    }
    fn set_background(&mut self, _col: u16, _row: u16, band: Band) {
        match band {
            Band::Day => self.day_cells += 1,
            Band::Night => self.night_cells += 1,
        }
    }
    fn set_pixel(&mut self, px: u32, py: u32, series: SeriesKind) {
        self.pixels.push((px, py, series));
    }
    fn set_cell(&mut self, _col: u16, _row: u16, _glyph: char, _ink: Ink) {}
    fn draw_text(&mut self, _col: u16, _row: u16, text: &str, _ink: Ink) {
        self.texts.push(text.to_string());
    }
}

fn load(dir: &TempDir) -> (CsvLog, Vec<Sample>) {
    let log = CsvLog::new(dir.path().join("battery.csv"));
    write_day(&log);
    let samples = log.read_samples().unwrap();
    (log, samples)
}

#[test]
fn test_status_from_log_file() {
    let dir = TempDir::new().unwrap();
    let (log, samples) = load(&dir);
    assert_eq!(samples.len(), 90);

    let config = BattlogConfig::default();
    let context = StatusContext {
        log_path: log.path().to_path_buf(),
        config_summary: "Config: Using defaults (no config file found)".to_string(),
        cycle_count: None,
        live_reading: None,
    };
    let now = base() + Duration::minutes(129);
    let report = StatusReport::build(&samples, &config, context, now).unwrap();

    assert!(report.latest.ac_connected);
    assert_eq!(report.transition_time, base() + Duration::minutes(100));
    assert_eq!(report.counts.on_ac, 30);
    assert_eq!(report.counts.on_battery, 60);
    assert_eq!(report.screen_on.suspend_events.len(), 1);
    assert_eq!(report.screen_on.total_suspend_time, Duration::minutes(41));
    assert_eq!(report.screen_on.total_active_time, Duration::minutes(88));
    assert!(report.estimate.rate_per_min > 0.0);

    let text: Vec<String> = report.lines().into_iter().map(|l| l.text).collect();
    assert!(text.iter().any(|l| l.contains("Last suspend")));
    assert!(text.iter().any(|l| l.contains("battery.csv")));
}

#[test]
fn test_chart_from_log_file() {
    let dir = TempDir::new().unwrap();
    let (_log, samples) = load(&dir);

    let config = BattlogConfig::default();
    let mut nav = ViewNavigator::new(config.window_limits(), base() + Duration::minutes(130));
    nav.set_data_bounds(&samples);
    for _ in 0..60 {
        nav.zoom_in();
    }
    assert_eq!(nav.window().duration, Duration::minutes(5));
    nav.pan(PanDirection::Right);
    assert_eq!(nav.window().end, base() + Duration::minutes(129));

    nav.reset(base() + Duration::minutes(130));
    let renderer = ChartRenderer::new(config.chart_settings());
    let mut surface = CountingSurface::default();
    renderer
        .render(&mut surface, &nav.window(), &split_series(&samples))
        .unwrap();

    assert!(surface.pixels.iter().any(|p| p.2 == SeriesKind::Charging));
    assert!(surface.pixels.iter().any(|p| p.2 == SeriesKind::Discharging));
    // window runs from 10:10 the day before, so both bands show
    assert!(surface.day_cells > 0);
    assert!(surface.night_cells > 0);
    assert!(surface.texts.iter().any(|t| t == "100%"));
}

#[test]
fn test_trim_then_reload() {
    let dir = TempDir::new().unwrap();
    let (log, _) = load(&dir);

    let mut config = BattlogConfig::default();
    config.logger.max_lines = 20;
    config.logger.trim_buffer = 5;
    assert!(log
        .trim_if_needed(config.trim_threshold(), config.logger.max_lines)
        .unwrap());

    let samples = log.read_samples().unwrap();
    assert_eq!(samples.len(), 20);
    assert!(samples.iter().all(|s| s.ac_connected));
}
