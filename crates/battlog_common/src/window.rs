//! View window navigation
//!
//! Zoom, pan and reset over the chart's time axis. The navigator owns the
//! visible window plus its limits (min/max/base duration and the extent of the
//! loaded data) and nothing else; it knows nothing about rendering.
//!
//! Rules:
//! - zoom keeps the right edge fixed and never looks at the data bounds
//! - pan shifts both edges and then pins the window inside the data bounds
//! - a data refresh only updates the bounds; the window is corrected on the
//!   next pan, so an inspection session is not moved by background refreshes
//! - every transition is reported to the observer with the new window

use chrono::{DateTime, Duration, Local};
use serde::Serialize;

use crate::sample::{DataBounds, Sample};

/// The visible time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    #[serde(skip)]
    pub duration: Duration,
}

impl ViewWindow {
    /// Window of `duration` ending at `end`
    pub fn ending_at(end: DateTime<Local>, duration: Duration) -> Self {
        Self {
            start: end - duration,
            end,
            duration,
        }
    }

    /// Window of `duration` starting at `start`
    pub fn starting_at(start: DateTime<Local>, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
            duration,
        }
    }

    pub fn contains(&self, t: DateTime<Local>) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Pan direction on the time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    /// Backward in time
    Left,
    /// Forward in time
    Right,
}

/// Size limits and step sizes for navigation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLimits {
    pub base: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Fraction of the duration removed/added per zoom step
    pub zoom_step: f64,
    /// Fraction of the duration moved per pan step
    pub pan_fraction: f64,
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self {
            base: Duration::hours(24),
            min: Duration::minutes(5),
            max: Duration::days(7),
            zoom_step: 0.1,
            pan_fraction: 0.1,
        }
    }
}

/// Change notification callback, receives the window after every transition
pub type WindowObserver = Box<dyn FnMut(&ViewWindow) + Send>;

/// The zoom/pan state machine
pub struct ViewNavigator {
    window: ViewWindow,
    limits: WindowLimits,
    bounds: Option<DataBounds>,
    observer: Option<WindowObserver>,
}

impl std::fmt::Debug for ViewNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewNavigator")
            .field("window", &self.window)
            .field("limits", &self.limits)
            .field("bounds", &self.bounds)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl ViewNavigator {
    /// Start with the base window ending at `now`
    pub fn new(limits: WindowLimits, now: DateTime<Local>) -> Self {
        Self {
            window: ViewWindow::ending_at(now, limits.base),
            limits,
            bounds: None,
            observer: None,
        }
    }

    /// Register the change observer, replacing any previous one
    pub fn set_observer(&mut self, observer: WindowObserver) {
        self.observer = Some(observer);
    }

    pub fn window(&self) -> ViewWindow {
        self.window
    }

    pub fn data_bounds(&self) -> Option<DataBounds> {
        self.bounds
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(1.0 - self.limits.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 + self.limits.zoom_step);
    }

    fn zoom_by(&mut self, factor: f64) {
        let scaled = scale(self.window.duration, factor);
        let duration = scaled.clamp(self.limits.min, self.limits.max);
        self.window = ViewWindow::ending_at(self.window.end, duration);
        self.notify();
    }

    /// Shift by `pan_fraction` of the duration, then pin inside the data.
    /// Does nothing until data bounds are known.
    pub fn pan(&mut self, direction: PanDirection) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let duration = self.window.duration;
        let step = scale(duration, self.limits.pan_fraction);
        let shift = match direction {
            PanDirection::Left => -step,
            PanDirection::Right => step,
        };

        let mut next = ViewWindow::starting_at(self.window.start + shift, duration);
        if next.start < bounds.start {
            next = ViewWindow::starting_at(bounds.start, duration);
        }
        if next.end > bounds.end {
            next = ViewWindow::ending_at(bounds.end, duration);
        }
        if duration > bounds.span() {
            next = ViewWindow::starting_at(bounds.start, duration);
        }

        self.window = next;
        self.notify();
    }

    /// Back to the base duration ending at `now`
    pub fn reset(&mut self, now: DateTime<Local>) {
        self.window = ViewWindow::ending_at(now, self.limits.base);
        self.notify();
    }

    /// Recompute the data extent from a fresh sample set. The window itself
    /// is left where it is.
    pub fn set_data_bounds(&mut self, samples: &[Sample]) {
        self.bounds = DataBounds::of(samples);
        self.notify();
    }

    fn notify(&mut self) {
        let window = self.window;
        if let Some(observer) = self.observer.as_mut() {
            observer(&window);
        }
    }
}

fn scale(d: Duration, factor: f64) -> Duration {
    Duration::milliseconds((d.num_milliseconds() as f64 * factor).round() as i64)
}
