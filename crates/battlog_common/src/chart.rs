//! Battery chart renderer
//!
//! Maps a `ViewWindow` and the sample series onto an abstract drawing surface.
//! The surface is a grid of character cells; each cell is further split into a
//! 2x4 sub-cell pixel grid (braille) for the data lines.
//!
//! Frame composition, back to front:
//! 1. day/night background per column
//! 2. axes, percent labels, time labels, date labels above the plot
//! 3. data series (charging and discharging drawn separately)
//! 4. dashed day-break markers at local midnight
//!
//! The renderer never auto-scales the y axis; battery percent is bounded.

use chrono::{DateTime, Duration, Local, TimeZone, Timelike};

use crate::analytics::start_of_day;
use crate::error::RenderError;
use crate::sample::Sample;
use crate::window::ViewWindow;

/// Sub-cell pixels per character cell, horizontally
pub const SUBCELL_COLS: u32 = 2;
/// Sub-cell pixels per character cell, vertically
pub const SUBCELL_ROWS: u32 = 4;

/// Smallest surface the chart will draw on
pub const MIN_AREA: (u16, u16) = (10, 5);
/// Smallest plot area left after margins
pub const MIN_PLOT: (u16, u16) = (5, 3);

const Y_LABEL_COUNT: u16 = 4;
const DAY_BREAK_GLYPH: char = '┊';

/// A rectangle of character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl CellRect {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the last column
    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// One past the last row
    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }
}

/// Background band of a plot column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Day,
    Night,
}

/// Which line a pixel belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    Charging,
    Discharging,
}

/// Foreground role of text and glyph cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Axis,
    AxisLabel,
    DateLabel,
    DayBreak,
    Placeholder,
}

/// Drawing capability the renderer calls into.
///
/// Coordinates are absolute. Pixel coordinates address the sub-cell grid, so
/// pixel `(px, py)` lives in cell `(px / SUBCELL_COLS, py / SUBCELL_ROWS)`.
pub trait ChartSurface {
    /// The cells available to the chart
    fn area(&self) -> CellRect;
    fn set_background(&mut self, col: u16, row: u16, band: Band);
    fn set_pixel(&mut self, px: u32, py: u32, series: SeriesKind);
    fn set_cell(&mut self, col: u16, row: u16, glyph: char, ink: Ink);
    fn draw_text(&mut self, col: u16, row: u16, text: &str, ink: Ink);
}

/// One plotted value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub time: DateTime<Local>,
    pub value: f64,
}

/// A logical line on the chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub points: Vec<ChartPoint>,
}

/// Split samples into a charging and a discharging series. Empty series are
/// left out.
pub fn split_series(samples: &[Sample]) -> Vec<ChartSeries> {
    let (charging, discharging): (Vec<&Sample>, Vec<&Sample>) =
        samples.iter().partition(|s| s.ac_connected);
    let to_points = |v: Vec<&Sample>| -> Vec<ChartPoint> {
        v.into_iter()
            .map(|s| ChartPoint {
                time: s.time,
                value: s.battery_percent,
            })
            .collect()
    };

    let mut series = Vec::with_capacity(2);
    if !charging.is_empty() {
        series.push(ChartSeries {
            kind: SeriesKind::Charging,
            points: to_points(charging),
        });
    }
    if !discharging.is_empty() {
        series.push(ChartSeries {
            kind: SeriesKind::Discharging,
            points: to_points(discharging),
        });
    }
    series
}

/// Tunables of the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSettings {
    pub y_min: f64,
    pub y_max: f64,
    /// First daytime hour (inclusive)
    pub day_start_hour: u32,
    /// First nighttime hour (exclusive end of day)
    pub day_end_hour: u32,
    /// Adjacent points further apart than this are not joined
    pub line_gap: Duration,
    pub show_dates: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            y_min: 0.0,
            y_max: 100.0,
            day_start_hour: 7,
            day_end_hour: 19,
            line_gap: Duration::minutes(5),
            show_dates: true,
        }
    }
}

/// A pixel on the sub-cell grid, relative to the plot origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

/// What to draw for one visible point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotMark {
    /// Isolated point: first point, or the previous one is too far back
    Dot(PixelPoint),
    /// Segment from the previous point
    Line(PixelPoint, PixelPoint),
}

/// Column for `t` on a grid `width` wide, `None` when outside the window
pub fn time_to_column(t: DateTime<Local>, window: &ViewWindow, width: u32) -> Option<u32> {
    if width == 0 || !window.contains(t) {
        return None;
    }
    let span = (window.end - window.start).num_milliseconds();
    if span <= 0 {
        return None;
    }
    let offset = (t - window.start).num_milliseconds();
    let col = (width as f64 * offset as f64 / span as f64) as u32;
    Some(col.min(width - 1))
}

/// Row for `value` on a grid `height` tall; higher values nearer the top
pub fn value_to_row(value: f64, y_min: f64, y_max: f64, height: u32) -> u32 {
    if height == 0 {
        return 0;
    }
    let frac = (value - y_min) / (y_max - y_min);
    let row = (height as f64 - 1.0) - (frac * height as f64).floor();
    row.clamp(0.0, height as f64 - 1.0) as u32
}

/// Representative time of a column
pub fn column_time(col: u32, window: &ViewWindow, width: u32) -> DateTime<Local> {
    if width == 0 {
        return window.start;
    }
    let span = (window.end - window.start).num_milliseconds();
    window.start + Duration::milliseconds(span * col as i64 / width as i64)
}

/// Whether `hour` falls in `[day_start, day_end)`; a start after the end
/// wraps past midnight
pub fn is_daytime(hour: u32, day_start: u32, day_end: u32) -> bool {
    if day_start <= day_end {
        hour >= day_start && hour < day_end
    } else {
        hour >= day_start || hour < day_end
    }
}

/// Time-axis tick spacing for a window of `duration`
pub fn label_interval(duration: Duration) -> Duration {
    match duration {
        d if d <= Duration::minutes(30) => Duration::minutes(5),
        d if d <= Duration::hours(2) => Duration::minutes(15),
        d if d <= Duration::hours(4) => Duration::minutes(30),
        d if d <= Duration::hours(8) => Duration::hours(1),
        d if d <= Duration::hours(24) => Duration::hours(2),
        d if d <= Duration::hours(48) => Duration::hours(4),
        d if d <= Duration::days(7) => Duration::hours(12),
        _ => Duration::hours(24),
    }
}

/// Local midnights strictly inside the window
pub fn midnights_within(window: &ViewWindow) -> Vec<DateTime<Local>> {
    let mut out = Vec::new();
    let mut day = window.start.date_naive();
    while let Some(next) = day.succ_opt() {
        day = next;
        let Some(midnight) = start_of_day(day) else {
            continue;
        };
        if midnight >= window.end {
            break;
        }
        if midnight > window.start {
            out.push(midnight);
        }
    }
    out
}

/// Tick times strictly inside the window, on local wall-clock multiples of
/// `interval` counted from each day's midnight. Wall-clock times skipped by a
/// DST change produce no tick.
pub fn time_ticks(window: &ViewWindow, interval: Duration) -> Vec<DateTime<Local>> {
    if interval <= Duration::zero() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut day = window.start.date_naive();
    while day <= window.end.date_naive() {
        let Some(midnight) = day.and_hms_opt(0, 0, 0) else {
            break;
        };
        let mut offset = Duration::zero();
        while offset < Duration::days(1) {
            let tick = Local.from_local_datetime(&(midnight + offset)).earliest();
            if let Some(tick) = tick.filter(|t| *t > window.start && *t < window.end) {
                out.push(tick);
            }
            offset += interval;
        }
        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
    }
    out
}

/// Gap-aware marks for one series on a `width` x `height` pixel grid.
///
/// Points outside the window are skipped without breaking the line; NaN
/// values break it.
pub fn plot_marks(
    points: &[ChartPoint],
    window: &ViewWindow,
    width: u32,
    height: u32,
    settings: &ChartSettings,
) -> Vec<PlotMark> {
    let mut marks = Vec::new();
    let mut prev: Option<(PixelPoint, DateTime<Local>)> = None;

    for point in points {
        if !window.contains(point.time) {
            continue;
        }
        if point.value.is_nan() {
            prev = None;
            continue;
        }
        let Some(x) = time_to_column(point.time, window, width) else {
            continue;
        };
        let here = PixelPoint {
            x,
            y: value_to_row(point.value, settings.y_min, settings.y_max, height),
        };

        match prev {
            Some((from, t)) if point.time - t <= settings.line_gap => {
                marks.push(PlotMark::Line(from, here))
            }
            _ => marks.push(PlotMark::Dot(here)),
        }
        prev = Some((here, point.time));
    }
    marks
}

/// Pixels of the segment `a`-`b`, both ends included (Bresenham)
pub fn line_pixels(a: PixelPoint, b: PixelPoint) -> Vec<PixelPoint> {
    let (mut x, mut y) = (a.x as i64, a.y as i64);
    let (x1, y1) = (b.x as i64, b.y as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut out = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        out.push(PixelPoint {
            x: x as u32,
            y: y as u32,
        });
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    out
}

/// Plot area inside the surface: room for percent labels on the left, date
/// labels on top, axis and time labels below
pub fn plot_area(area: CellRect) -> Result<CellRect, RenderError> {
    if area.width < MIN_AREA.0 || area.height < MIN_AREA.1 {
        return Err(RenderError::NeedsMoreSpace {
            width: area.width,
            height: area.height,
        });
    }
    let plot = CellRect::new(area.x + 5, area.y + 1, area.width - 6, area.height - 4);
    if plot.width < MIN_PLOT.0 || plot.height < MIN_PLOT.1 {
        return Err(RenderError::NeedsMoreSpace {
            width: area.width,
            height: area.height,
        });
    }
    Ok(plot)
}

/// Draws one chart frame
#[derive(Debug, Clone, Default)]
pub struct ChartRenderer {
    settings: ChartSettings,
}

impl ChartRenderer {
    pub fn new(settings: ChartSettings) -> Self {
        Self { settings }
    }

    /// Draw `series` as seen through `window`.
    ///
    /// Too small a surface is an error the caller turns into a "needs more
    /// space" message; no series at all draws a "No data" placeholder.
    pub fn render<S: ChartSurface>(
        &self,
        surface: &mut S,
        window: &ViewWindow,
        series: &[ChartSeries],
    ) -> Result<(), RenderError> {
        let area = surface.area();
        let plot = plot_area(area)?;

        if series.iter().all(|s| s.points.is_empty()) {
            surface.draw_text(area.x + 1, area.y + 1, "No data", Ink::Placeholder);
            return Ok(());
        }

        self.draw_background(surface, plot, window);
        self.draw_axes(surface, plot);
        self.draw_percent_labels(surface, area, plot);
        self.draw_time_labels(surface, area, plot, window);
        let midnights = if self.settings.show_dates {
            midnights_within(window)
        } else {
            Vec::new()
        };
        self.draw_date_labels(surface, area, plot, window, &midnights);

        for s in series {
            self.draw_series(surface, plot, window, s);
        }

        self.draw_day_breaks(surface, plot, window, &midnights);
        Ok(())
    }

    fn draw_background<S: ChartSurface>(&self, surface: &mut S, plot: CellRect, window: &ViewWindow) {
        let width = plot.width as u32;
        for col in 0..plot.width {
            let hour = column_time(col as u32, window, width).hour();
            let band = if is_daytime(hour, self.settings.day_start_hour, self.settings.day_end_hour) {
                Band::Day
            } else {
                Band::Night
            };
            for row in plot.y..plot.bottom() {
                surface.set_background(plot.x + col, row, band);
            }
        }
    }

    fn draw_axes<S: ChartSurface>(&self, surface: &mut S, plot: CellRect) {
        let axis_col = plot.x - 1;
        for row in plot.y..plot.bottom() {
            surface.set_cell(axis_col, row, '│', Ink::Axis);
        }
        surface.set_cell(axis_col, plot.bottom(), '└', Ink::Axis);
        for col in plot.x..plot.right() {
            surface.set_cell(col, plot.bottom(), '─', Ink::Axis);
        }
    }

    fn draw_percent_labels<S: ChartSurface>(&self, surface: &mut S, area: CellRect, plot: CellRect) {
        let span = plot.height - 1;
        for i in 0..Y_LABEL_COUNT {
            let row = plot.bottom() - 1 - i * span / (Y_LABEL_COUNT - 1);
            let value = self.settings.y_min
                + (self.settings.y_max - self.settings.y_min) * i as f64 / (Y_LABEL_COUNT - 1) as f64;
            let label = format!("{:.0}%", value);
            let Some(col) = (plot.x - 1).checked_sub(label.len() as u16) else {
                continue;
            };
            if col >= area.x {
                surface.draw_text(col, row, &label, Ink::AxisLabel);
            }
        }
    }

    fn draw_time_labels<S: ChartSurface>(
        &self,
        surface: &mut S,
        area: CellRect,
        plot: CellRect,
        window: &ViewWindow,
    ) {
        let row = plot.bottom() + 1;
        if row >= area.bottom() {
            return;
        }
        for tick in time_ticks(window, label_interval(window.duration)) {
            let Some(col) = time_to_column(tick, window, plot.width as u32) else {
                continue;
            };
            let label = tick.format("%H:%M").to_string();
            self.draw_centered(surface, area, plot.x + col as u16, row, &label, Ink::AxisLabel);
        }
    }

    fn draw_date_labels<S: ChartSurface>(
        &self,
        surface: &mut S,
        area: CellRect,
        plot: CellRect,
        window: &ViewWindow,
        midnights: &[DateTime<Local>],
    ) {
        let Some(row) = plot.y.checked_sub(1) else {
            return;
        };
        for midnight in midnights {
            let Some(col) = time_to_column(*midnight, window, plot.width as u32) else {
                continue;
            };
            let label = midnight.format("%b %-d").to_string();
            self.draw_centered(surface, area, plot.x + col as u16, row, &label, Ink::DateLabel);
        }
    }

    /// Text centered on `center`, dropped when it would leave the area
    fn draw_centered<S: ChartSurface>(
        &self,
        surface: &mut S,
        area: CellRect,
        center: u16,
        row: u16,
        text: &str,
        ink: Ink,
    ) {
        let len = text.chars().count() as u16;
        let Some(col) = center.checked_sub(len / 2) else {
            return;
        };
        if col < area.x || col + len > area.right() {
            return;
        }
        surface.draw_text(col, row, text, ink);
    }

    fn draw_series<S: ChartSurface>(
        &self,
        surface: &mut S,
        plot: CellRect,
        window: &ViewWindow,
        series: &ChartSeries,
    ) {
        let width = plot.width as u32 * SUBCELL_COLS;
        let height = plot.height as u32 * SUBCELL_ROWS;
        let origin_x = plot.x as u32 * SUBCELL_COLS;
        let origin_y = plot.y as u32 * SUBCELL_ROWS;

        for mark in plot_marks(&series.points, window, width, height, &self.settings) {
            match mark {
                PlotMark::Dot(p) => surface.set_pixel(origin_x + p.x, origin_y + p.y, series.kind),
                PlotMark::Line(a, b) => {
                    for p in line_pixels(a, b) {
                        surface.set_pixel(origin_x + p.x, origin_y + p.y, series.kind);
                    }
                }
            }
        }
    }

    fn draw_day_breaks<S: ChartSurface>(
        &self,
        surface: &mut S,
        plot: CellRect,
        window: &ViewWindow,
        midnights: &[DateTime<Local>],
    ) {
        for midnight in midnights {
            let Some(col) = time_to_column(*midnight, window, plot.width as u32) else {
                continue;
            };
            // dashed: every other row
            for row in (plot.y..plot.bottom()).step_by(2) {
                surface.set_cell(plot.x + col as u16, row, DAY_BREAK_GLYPH, Ink::DayBreak);
            }
        }
    }
}
