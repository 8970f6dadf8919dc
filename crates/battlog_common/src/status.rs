//! Status summary
//!
//! Gathers the analytics for the latest state of the log into one
//! serializable report, and renders it as styled text lines for the TUI and
//! the `status` command.

use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use std::path::PathBuf;

use crate::analytics::{
    contiguous_run, daily_screen_on_time, find_last_transition, rate_and_estimate,
    screen_on_time, serialize_minutes, RateEstimate, UsageWindow,
};
use crate::config::BattlogConfig;
use crate::format::{format_duration_auto, round_to_minute, NO_VALUE};
use crate::power::PowerReading;
use crate::sample::{Sample, SampleCounts};

const STAMP: &str = "%b %-d %H:%M";
const INDENT: &str = "    ";

/// Emphasis of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Plain,
    /// AC state headline
    Headline,
    /// Section title
    Section,
    Good,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
}

impl StatusLine {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }

    fn blank() -> Self {
        Self::plain("")
    }
}

/// Inputs that do not come from the samples
#[derive(Debug, Clone, Default)]
pub struct StatusContext {
    pub log_path: PathBuf,
    pub config_summary: String,
    pub cycle_count: Option<u32>,
    /// Power supply state at report time, when it could be read
    pub live_reading: Option<PowerReading>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Local>,
    pub latest: Sample,
    /// First sample of the current AC state
    pub transition_time: DateTime<Local>,
    pub transition_battery: f64,
    #[serde(serialize_with = "serialize_minutes")]
    pub time_in_state: Duration,
    /// Battery change since the transition, latest - start
    pub battery_delta: f64,
    pub rate_label: &'static str,
    pub slope_text: String,
    pub confidence: String,
    pub estimate: RateEstimate,
    pub eta_text: String,
    /// Wall clock at which the ETA is reached
    pub eta_at: Option<DateTime<Local>>,
    pub max_charge_percent: u8,
    pub counts: SampleCounts,
    #[serde(serialize_with = "serialize_minutes")]
    pub span: Duration,
    pub first_time: DateTime<Local>,
    pub last_time: DateTime<Local>,
    pub screen_on: UsageWindow,
    #[serde(serialize_with = "serialize_minutes")]
    pub today_screen_on: Duration,
    pub cycle_count: Option<u32>,
    pub live_reading: Option<PowerReading>,
    pub log_path: PathBuf,
    pub config_summary: String,
}

impl StatusReport {
    /// `None` without samples
    pub fn build(
        samples: &[Sample],
        config: &BattlogConfig,
        context: StatusContext,
        now: DateTime<Local>,
    ) -> Option<Self> {
        let latest = *samples.last()?;
        let first = *samples.first()?;
        let (transition_time, transition_battery) = find_last_transition(samples)?;

        let estimate = rate_and_estimate(
            contiguous_run(samples),
            latest.battery_percent,
            config.analytics.alpha,
            f64::from(config.analytics.max_charge_percent),
        );
        let slope_text = if estimate.is_ok() {
            format!("{:.3} %/min", estimate.rate_per_min)
        } else {
            "n/a".to_string()
        };
        let eta = estimate.eta().map(round_to_minute);
        let eta_text = eta
            .map(format_duration_auto)
            .unwrap_or_else(|| NO_VALUE.to_string());
        let eta_at = eta
            .filter(|d| *d > Duration::zero())
            .map(|d| round_to_clock_minute(now + d));

        let gap = config.suspend_gap();

        Some(Self {
            generated_at: now,
            latest,
            transition_time,
            transition_battery,
            time_in_state: round_to_minute(latest.time - transition_time),
            battery_delta: latest.battery_percent - transition_battery,
            rate_label: if latest.ac_connected {
                "Charge Rate"
            } else {
                "Discharge Rate"
            },
            slope_text,
            confidence: estimate.confidence(),
            estimate,
            eta_text,
            eta_at,
            max_charge_percent: config.analytics.max_charge_percent,
            counts: SampleCounts::of(samples),
            span: round_to_minute(latest.time - first.time),
            first_time: first.time,
            last_time: latest.time,
            screen_on: screen_on_time(samples, gap),
            today_screen_on: daily_screen_on_time(samples, now.date_naive(), gap)
                .total_active_time,
            cycle_count: context.cycle_count,
            live_reading: context.live_reading,
            log_path: context.log_path,
            config_summary: context.config_summary,
        })
    }

    /// Text lines, top to bottom
    pub fn lines(&self) -> Vec<StatusLine> {
        let mut lines = Vec::new();
        let detail = |text: String| StatusLine::plain(format!("{}{}", INDENT, text));

        // AC state
        let ac = self.latest.ac_connected;
        lines.push(StatusLine::new(
            format!("AC Status: {}", if ac { "Plugged In" } else { "Unplugged" }),
            Tone::Headline,
        ));
        if ac {
            lines.push(detail(format!(
                "Plugged in for {}, battery ↑ {:.1}% (start: {:.1}%)",
                format_duration_auto(self.time_in_state),
                self.battery_delta,
                self.transition_battery
            )));
        } else {
            lines.push(detail(format!(
                "On battery for {} (since: {}), battery ↓ {:.1}% (start: {:.1}%)",
                format_duration_auto(self.time_in_state),
                self.transition_time.format(STAMP),
                -self.battery_delta,
                self.transition_battery
            )));
        }
        let target = if ac {
            format!("Time to Full ({}%)", self.max_charge_percent)
        } else {
            "Time to Empty (0%)".to_string()
        };
        match self.eta_at {
            Some(at) => lines.push(detail(format!(
                "{}: {} (by: {})",
                target,
                self.eta_text,
                at.format("%H:%M")
            ))),
            None => lines.push(detail(format!("{}: {}", target, self.eta_text))),
        }
        lines.push(StatusLine::blank());

        // Battery
        lines.push(StatusLine::new("Battery Status:", Tone::Section));
        lines.push(detail(format!(
            "Current Battery: {:.1}%",
            self.latest.battery_percent
        )));
        if let Some(live) = self.live_reading {
            lines.push(detail(format!(
                "Live reading: {}% (AC: {})",
                live.battery_percent,
                if live.ac_connected { "Plugged In" } else { "Unplugged" }
            )));
        }
        if let Some(cycles) = self.cycle_count {
            lines.push(detail(format!("Battery Cycles: {}", cycles)));
        }
        lines.push(detail(format!(
            "{}: {} {}",
            self.rate_label, self.slope_text, self.confidence
        )));
        lines.push(StatusLine::blank());

        // Screen-on time
        lines.push(StatusLine::new("Screen-On Time (SOT):", Tone::Section));
        let last_suspend = self.screen_on.last_suspend();
        if self.screen_on.last_active_session > Duration::zero() {
            let session = format_duration_auto(self.screen_on.last_active_session);
            lines.push(detail(match last_suspend {
                Some(event) => format!(
                    "Current session: {} (since: {})",
                    session,
                    event.end_time.format(STAMP)
                ),
                None => format!("Current session: {}", session),
            }));
        }
        if self.today_screen_on > Duration::zero() {
            lines.push(detail(format!(
                "Today's total: {}",
                format_duration_auto(self.today_screen_on)
            )));
        }
        if let Some(event) = last_suspend {
            lines.push(detail(format!(
                "Last suspend: {} - {} (lasted {})",
                event.start_time.format(STAMP),
                event.end_time.format(STAMP),
                format_duration_auto(event.duration)
            )));
            let change = format!(
                "{}{}Battery: {:.1}% → {:.1}%",
                INDENT, INDENT, event.battery_before, event.battery_after
            );
            lines.push(if event.battery_delta > 0.0 {
                StatusLine::new(format!("{} ({:.1}% drain)", change, event.battery_delta), Tone::Bad)
            } else if event.battery_delta < 0.0 {
                StatusLine::new(format!("{} (+{:.1}% gain)", change, -event.battery_delta), Tone::Good)
            } else {
                StatusLine::plain(format!("{} (no change)", change))
            });
        }
        lines.push(StatusLine::blank());

        // Samples
        lines.push(StatusLine::new("Data Summary:", Tone::Section));
        lines.push(detail(format!(
            "Total samples: {} (spanning {})",
            self.counts.total,
            format_duration_auto(self.span)
        )));
        lines.push(StatusLine::new(
            format!("{}AC plugged: {} samples", INDENT, self.counts.on_ac),
            Tone::Good,
        ));
        lines.push(StatusLine::new(
            format!("{}On battery: {} samples", INDENT, self.counts.on_battery),
            Tone::Bad,
        ));
        lines.push(detail(format!(
            "Time range: {} to {}",
            self.first_time.format(STAMP),
            self.last_time.format(STAMP)
        )));
        lines.push(StatusLine::blank());

        lines.push(StatusLine::plain(format!(
            "Data file: {}",
            self.log_path.display()
        )));
        lines.push(StatusLine::plain(self.config_summary.clone()));

        lines
    }
}

fn round_to_clock_minute(t: DateTime<Local>) -> DateTime<Local> {
    let since_epoch = Duration::milliseconds(t.timestamp_millis());
    t + (round_to_minute(since_epoch) - since_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap()
    }

    fn at(min: i64, ac: bool, pct: f64) -> Sample {
        Sample::new(base() + Duration::minutes(min), ac, pct)
    }

    fn context() -> StatusContext {
        StatusContext {
            log_path: PathBuf::from("/tmp/battery.csv"),
            config_summary: "Config: Using defaults (no config file found)".to_string(),
            cycle_count: Some(120),
            live_reading: None,
        }
    }

    fn texts(report: &StatusReport) -> Vec<String> {
        report.lines().into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn test_empty_samples_no_report() {
        let config = BattlogConfig::default();
        assert!(StatusReport::build(&[], &config, context(), base()).is_none());
    }

    #[test]
    fn test_charging_report() {
        let config = BattlogConfig::default();
        let samples: Vec<Sample> = (0..=10)
            .map(|m| at(m, true, 50.0 + m as f64))
            .collect();
        let now = base() + Duration::minutes(10);
        let report = StatusReport::build(&samples, &config, context(), now).unwrap();

        assert_eq!(report.rate_label, "Charge Rate");
        assert_eq!(report.slope_text, "1.000 %/min");
        assert_eq!(report.eta_text, "00h 40m");
        assert_eq!(report.eta_at, Some(now + Duration::minutes(40)));
        assert_eq!(report.time_in_state, Duration::minutes(10));

        let lines = texts(&report);
        assert_eq!(lines[0], "AC Status: Plugged In");
        assert!(lines.iter().any(|l| l.contains("battery ↑ 10.0% (start: 50.0%)")));
        assert!(lines.iter().any(|l| l.contains("Time to Full (100%): 00h 40m (by: ")));
        assert!(lines.iter().any(|l| l.contains("Battery Cycles: 120")));
        assert!(lines.iter().any(|l| l.contains("(based on 11 charging samples)")));
    }

    #[test]
    fn test_discharging_with_suspend() {
        let config = BattlogConfig::default();
        let samples = vec![
            at(0, true, 90.0),
            at(1, false, 90.0),
            at(2, false, 89.0),
            at(50, false, 87.0),
            at(51, false, 86.0),
        ];
        let report = StatusReport::build(&samples, &config, context(), base() + Duration::minutes(51)).unwrap();

        assert_eq!(report.rate_label, "Discharge Rate");
        assert_eq!(report.transition_time, base() + Duration::minutes(1));
        assert_eq!(report.counts.on_ac, 1);
        assert_eq!(report.screen_on.suspend_events.len(), 1);

        let lines = report.lines();
        let drain = lines.iter().find(|l| l.text.contains("drain")).unwrap();
        assert_eq!(drain.tone, Tone::Bad);
        assert!(drain.text.contains("89.0% → 87.0% (2.0% drain)"));
        assert!(lines.iter().any(|l| l.text.contains("On battery for 00h 50m")));
    }

    #[test]
    fn test_single_sample_needs_more() {
        let config = BattlogConfig::default();
        let report = StatusReport::build(&[at(0, false, 70.0)], &config, context(), base()).unwrap();
        assert_eq!(report.slope_text, "n/a");
        assert_eq!(report.eta_text, NO_VALUE);
        assert!(report.eta_at.is_none());
        assert_eq!(report.confidence, "(need ≥2 discharging samples)");
    }

    #[test]
    fn test_degenerate_regression_shows_no_slope() {
        let config = BattlogConfig::default();
        let samples = vec![at(0, false, 70.0), at(0, false, 69.0)];
        let report = StatusReport::build(&samples, &config, context(), base()).unwrap();
        assert_eq!(report.slope_text, "n/a");
        assert_eq!(report.eta_text, NO_VALUE);
        assert_eq!(report.confidence, "(regression failed)");
        assert!(texts(&report)
            .iter()
            .any(|l| l.contains("Discharge Rate: n/a (regression failed)")));
    }

    #[test]
    fn test_live_reading_line() {
        let config = BattlogConfig::default();
        let samples = vec![at(0, false, 80.0), at(10, false, 79.0)];
        let mut ctx = context();
        assert!(!texts(&StatusReport::build(&samples, &config, ctx.clone(), base()).unwrap())
            .iter()
            .any(|l| l.contains("Live reading")));

        ctx.live_reading = Some(PowerReading {
            battery_percent: 77,
            ac_connected: true,
        });
        let report = StatusReport::build(&samples, &config, ctx, base()).unwrap();
        assert!(texts(&report)
            .iter()
            .any(|l| l.contains("Live reading: 77% (AC: Plugged In)")));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["live_reading"]["battery_percent"], 77);
    }

    #[test]
    fn test_json_shape() {
        let config = BattlogConfig::default();
        let samples = vec![at(0, false, 80.0), at(10, false, 79.0)];
        let report = StatusReport::build(&samples, &config, context(), base()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rate_label"], "Discharge Rate");
        assert_eq!(json["counts"]["total"], 2);
        assert_eq!(json["span"], 10);
        assert_eq!(json["estimate"]["status"]["kind"], "estimated");
        assert_eq!(json["cycle_count"], 120);
    }
}
