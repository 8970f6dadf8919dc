//! App state and dispatch
//!
//! `App` owns everything the TUI shows: the samples, the view window, the
//! status lines and the weekly screen-on bars. It is only changed through
//! `App::dispatch`, one `AppEvent` at a time.

use battlog_common::analytics::{weekly_screen_on_time, DailyUsage};
use battlog_common::chart::{split_series, ChartSeries};
use battlog_common::config::BattlogConfig;
use battlog_common::csv_log::CsvLog;
use battlog_common::format::{format_duration_auto, round_to_minute};
use battlog_common::status::{StatusContext, StatusLine, StatusReport};
use battlog_common::{PanDirection, Sample, ViewNavigator, ViewWindow};
use chrono::{DateTime, Local};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// User intent, already decoded from keys and mouse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Refresh,
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    ResetView,
    ScrollUp,
    ScrollDown,
}

/// Everything the dispatch loop reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// Periodic reload from the timer task
    RefreshTick,
    Input(Action),
    /// The view window moved; sent by the navigator's observer
    WindowChanged(ViewWindow),
    /// Terminal size changed; only needs a redraw
    Resize,
}

pub struct App {
    config: BattlogConfig,
    log: CsvLog,
    context: StatusContext,
    navigator: ViewNavigator,
    samples: Vec<Sample>,
    series: Vec<ChartSeries>,
    status: Vec<StatusLine>,
    weekly: Vec<DailyUsage>,
    chart_title: String,
    load_error: Option<String>,
    scroll: u16,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: BattlogConfig,
        log: CsvLog,
        context: StatusContext,
        now: DateTime<Local>,
    ) -> Self {
        let navigator = ViewNavigator::new(config.window_limits(), now);
        let chart_title = chart_title(&navigator.window());
        Self {
            config,
            log,
            context,
            navigator,
            samples: Vec::new(),
            series: Vec::new(),
            status: Vec::new(),
            weekly: Vec::new(),
            chart_title,
            load_error: None,
            scroll: 0,
            should_quit: false,
        }
    }

    /// Route window-change notifications back into the event channel
    pub fn forward_window_changes(&mut self, tx: UnboundedSender<AppEvent>) {
        self.navigator.set_observer(Box::new(move |window| {
            let _ = tx.send(AppEvent::WindowChanged(*window));
        }));
    }

    /// Apply one event
    pub fn dispatch(&mut self, event: AppEvent, now: DateTime<Local>) {
        match event {
            AppEvent::RefreshTick => self.reload(now),
            AppEvent::Resize => {}
            AppEvent::WindowChanged(window) => self.chart_title = chart_title(&window),
            AppEvent::Input(action) => self.apply(action, now),
        }
    }

    fn apply(&mut self, action: Action, now: DateTime<Local>) {
        debug!("Action {:?}", action);
        match action {
            Action::Quit => self.should_quit = true,
            Action::Refresh => self.reload(now),
            Action::ZoomIn => self.navigator.zoom_in(),
            Action::ZoomOut => self.navigator.zoom_out(),
            Action::PanLeft => self.navigator.pan(PanDirection::Left),
            Action::PanRight => self.navigator.pan(PanDirection::Right),
            Action::ResetView => self.navigator.reset(now),
            Action::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            Action::ScrollDown => {
                let max = self.status.len().saturating_sub(1) as u16;
                self.scroll = (self.scroll + 1).min(max);
            }
        }
    }

    /// Re-read the log and recompute everything derived from it. A failed
    /// read leaves no data and keeps the error for the status panel.
    pub fn reload(&mut self, now: DateTime<Local>) {
        match self.log.read_samples() {
            Ok(samples) => {
                self.samples = samples;
                self.load_error = None;
            }
            Err(e) => {
                warn!("Failed to read {}: {}", self.log.path().display(), e);
                self.samples.clear();
                self.load_error = Some(e.to_string());
            }
        }
        self.recompute(now);
    }

    /// Replace the samples without touching the log
    pub fn set_samples(&mut self, samples: Vec<Sample>, now: DateTime<Local>) {
        self.samples = samples;
        self.load_error = None;
        self.recompute(now);
    }

    fn recompute(&mut self, now: DateTime<Local>) {
        let gap = self.config.suspend_gap();
        self.navigator.set_data_bounds(&self.samples);
        self.series = split_series(&self.samples);
        self.weekly = weekly_screen_on_time(&self.samples, now.date_naive(), gap);
        self.status = StatusReport::build(&self.samples, &self.config, self.context.clone(), now)
            .map(|report| report.lines())
            .unwrap_or_default();
        let max = self.status.len().saturating_sub(1) as u16;
        self.scroll = self.scroll.min(max);
    }

    pub fn config(&self) -> &BattlogConfig {
        &self.config
    }

    pub fn window(&self) -> ViewWindow {
        self.navigator.window()
    }

    pub fn series(&self) -> &[ChartSeries] {
        &self.series
    }

    pub fn status_lines(&self) -> &[StatusLine] {
        &self.status
    }

    pub fn weekly(&self) -> &[DailyUsage] {
        &self.weekly
    }

    pub fn chart_title(&self) -> &str {
        &self.chart_title
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

/// Chart panel title with the visible span
pub fn chart_title(window: &ViewWindow) -> String {
    format!(
        "Battery % Over Time [{}] - i/o/mouse wheel: zoom, ←→: pan, esc: reset",
        format_duration_auto(round_to_minute(window.end - window.start))
    )
}
