//! Battery analytics
//!
//! Turns a sorted sample series into:
//! - charge/discharge rates from an exponentially weighted regression
//! - time-to-full / time-to-empty predictions anchored on the live reading
//! - suspend detection from logging gaps, and screen-on time derived from it
//!
//! Nothing in here fails loudly. Sparse or degenerate input comes back as an
//! explicit state (`None`, `EstimateStatus::InsufficientSamples`, a zero
//! `UsageWindow`) that the caller renders as a placeholder.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::sample::{ChargeDirection, Sample};

/// Slopes closer to zero than this count as "not moving"
pub const SLOPE_EPSILON: f64 = 1e-6;

/// Result of a weighted least-squares fit, x in minutes relative to the
/// latest sample (x <= 0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionFit {
    /// Percent per minute
    pub slope: f64,
    /// Fitted percent at x = 0 (the latest sample)
    pub intercept: f64,
    /// Number of samples the fit used
    pub samples: usize,
}

/// Exponentially weighted linear regression of battery percent over time.
///
/// Each sample gets `w = exp(alpha * x)` where x is minutes before the latest
/// sample, so recent samples weigh close to 1 and older ones decay towards 0.
/// `alpha = 0` is ordinary least squares. Returns `None` for fewer than two
/// samples or when the normal equations are singular (all x identical).
pub fn weighted_regression(samples: &[Sample], alpha: f64) -> Option<RegressionFit> {
    if samples.len() < 2 {
        return None;
    }
    let t_now = samples[samples.len() - 1].time;

    let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for s in samples {
        let x = minutes_between(t_now, s.time);
        let y = s.battery_percent;
        let w = (alpha * x).exp();
        sw += w;
        swx += w * x;
        swy += w * y;
        swxx += w * x * x;
        swxy += w * x * y;
    }

    let den = sw * swxx - swx * swx;
    if den == 0.0 {
        return None;
    }
    let slope = (sw * swxy - swx * swy) / den;
    let intercept = (swy - slope * swx) / sw;
    Some(RegressionFit {
        slope,
        intercept,
        samples: samples.len(),
    })
}

/// Signed minutes from `reference` to `t` (negative when `t` is earlier)
fn minutes_between(reference: DateTime<Local>, t: DateTime<Local>) -> f64 {
    (t - reference).num_milliseconds() as f64 / 60_000.0
}

/// The maximal suffix of `samples` sharing the latest sample's AC state
pub fn contiguous_run(samples: &[Sample]) -> &[Sample] {
    let Some(last) = samples.last() else {
        return samples;
    };
    let start = samples
        .iter()
        .rposition(|s| s.ac_connected != last.ac_connected)
        .map(|i| i + 1)
        .unwrap_or(0);
    &samples[start..]
}

/// Outcome class of a rate/ETA calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EstimateStatus {
    /// Slope points the right way; ETA is finite
    Estimated { samples: usize },
    /// Plugged in but not rising, or unplugged but not falling
    Stalled,
    /// Fewer than two samples in the run
    InsufficientSamples,
    /// Regression denominator was zero
    Degenerate,
}

/// Rate and time-to-target for the current contiguous run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateEstimate {
    pub direction: ChargeDirection,
    /// Percent per minute (positive when charging)
    pub rate_per_min: f64,
    /// Minutes until full/empty. `f64::INFINITY` when stalled.
    pub eta_minutes: f64,
    pub status: EstimateStatus,
}

impl RateEstimate {
    fn without_fit(direction: ChargeDirection, status: EstimateStatus) -> Self {
        Self {
            direction,
            rate_per_min: 0.0,
            eta_minutes: 0.0,
            status,
        }
    }

    /// Success flag: a regression ran and produced a usable rate
    pub fn is_ok(&self) -> bool {
        matches!(
            self.status,
            EstimateStatus::Estimated { .. } | EstimateStatus::Stalled
        )
    }

    /// Finite, non-negative ETA as a duration
    pub fn eta(&self) -> Option<Duration> {
        if !matches!(self.status, EstimateStatus::Estimated { .. }) {
            return None;
        }
        if !self.eta_minutes.is_finite() || self.eta_minutes < 0.0 {
            return None;
        }
        Some(Duration::milliseconds((self.eta_minutes * 60_000.0).round() as i64))
    }

    /// Human-readable basis for the estimate
    pub fn confidence(&self) -> String {
        match self.status {
            EstimateStatus::Estimated { samples } => {
                format!("(based on {} {} samples)", samples, self.direction.as_str())
            }
            EstimateStatus::Stalled => match self.direction {
                ChargeDirection::Charging => "(not charging or already full)".to_string(),
                ChargeDirection::Discharging => "(not discharging)".to_string(),
            },
            EstimateStatus::InsufficientSamples => {
                format!("(need ≥2 {} samples)", self.direction.as_str())
            }
            EstimateStatus::Degenerate => "(regression failed)".to_string(),
        }
    }
}

/// Rate and ETA for a contiguous run.
///
/// The run's AC state picks the target: `max_charge_target` when charging,
/// 0% when discharging. The ETA is measured from `current_percent` (the live
/// reading), not from the regression intercept.
pub fn rate_and_estimate(
    run: &[Sample],
    current_percent: f64,
    alpha: f64,
    max_charge_target: f64,
) -> RateEstimate {
    let direction = ChargeDirection::from_ac(run.last().map(|s| s.ac_connected).unwrap_or(false));
    if run.len() < 2 {
        return RateEstimate::without_fit(direction, EstimateStatus::InsufficientSamples);
    }
    let Some(fit) = weighted_regression(run, alpha) else {
        return RateEstimate::without_fit(direction, EstimateStatus::Degenerate);
    };

    let rate = fit.slope;
    let (eta_minutes, status) = match direction {
        ChargeDirection::Charging if rate > SLOPE_EPSILON => (
            (max_charge_target - current_percent) / rate,
            EstimateStatus::Estimated { samples: run.len() },
        ),
        ChargeDirection::Discharging if rate < -SLOPE_EPSILON => (
            -current_percent / rate,
            EstimateStatus::Estimated { samples: run.len() },
        ),
        _ => (f64::INFINITY, EstimateStatus::Stalled),
    };

    RateEstimate {
        direction,
        rate_per_min: rate,
        eta_minutes,
        status,
    }
}

/// Where the current AC state began: time and battery of the first sample of
/// the contiguous run. The whole series when it never changes state.
pub fn find_last_transition(samples: &[Sample]) -> Option<(DateTime<Local>, f64)> {
    let first = contiguous_run(samples).first()?;
    Some((first.time, first.battery_percent))
}

/// A gap in logging long enough to count as sleep or shutdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuspendEvent {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    #[serde(serialize_with = "serialize_minutes")]
    pub duration: Duration,
    pub battery_before: f64,
    pub battery_after: f64,
    /// before - after: positive is drain, negative is gain
    pub battery_delta: f64,
}

pub(crate) fn serialize_minutes<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_minutes())
}

/// Every adjacent pair whose gap is at least `gap_threshold`, in order
pub fn detect_suspend_events(samples: &[Sample], gap_threshold: Duration) -> Vec<SuspendEvent> {
    samples
        .windows(2)
        .filter_map(|pair| {
            let (before, after) = (&pair[0], &pair[1]);
            let gap = after.time - before.time;
            (gap >= gap_threshold).then(|| SuspendEvent {
                start_time: before.time,
                end_time: after.time,
                duration: gap,
                battery_before: before.battery_percent,
                battery_after: after.battery_percent,
                battery_delta: before.battery_percent - after.battery_percent,
            })
        })
        .collect()
}

/// Screen-on time over a sample set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageWindow {
    #[serde(serialize_with = "serialize_minutes")]
    pub total_active_time: Duration,
    #[serde(serialize_with = "serialize_minutes")]
    pub total_suspend_time: Duration,
    #[serde(serialize_with = "serialize_minutes")]
    pub last_active_session: Duration,
    pub suspend_events: Vec<SuspendEvent>,
}

impl Default for UsageWindow {
    fn default() -> Self {
        Self {
            total_active_time: Duration::zero(),
            total_suspend_time: Duration::zero(),
            last_active_session: Duration::zero(),
            suspend_events: Vec::new(),
        }
    }
}

impl UsageWindow {
    pub fn last_suspend(&self) -> Option<&SuspendEvent> {
        self.suspend_events.last()
    }
}

/// Active time = sample span minus every suspend gap
pub fn screen_on_time(samples: &[Sample], gap_threshold: Duration) -> UsageWindow {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return UsageWindow::default();
    };
    if samples.len() < 2 {
        return UsageWindow::default();
    }

    let suspend_events = detect_suspend_events(samples, gap_threshold);
    let total_suspend_time = suspend_events
        .iter()
        .fold(Duration::zero(), |acc, e| acc + e.duration);
    let total_active_time = (last.time - first.time) - total_suspend_time;
    let last_active_session = match suspend_events.last() {
        Some(event) => last.time - event.end_time,
        None => total_active_time,
    };

    UsageWindow {
        total_active_time,
        total_suspend_time,
        last_active_session,
        suspend_events,
    }
}

/// Local midnight starting `day`
pub fn start_of_day(day: NaiveDate) -> Option<DateTime<Local>> {
    let midnight = day.and_hms_opt(0, 0, 0)?;
    Local.from_local_datetime(&midnight).earliest()
}

/// Screen-on time restricted to `[start_of_day(day), +24h)`
pub fn daily_screen_on_time(
    samples: &[Sample],
    day: NaiveDate,
    gap_threshold: Duration,
) -> UsageWindow {
    let Some(start) = start_of_day(day) else {
        return UsageWindow::default();
    };
    let end = start + Duration::hours(24);
    let in_day: Vec<Sample> = samples
        .iter()
        .filter(|s| s.time >= start && s.time < end)
        .copied()
        .collect();
    screen_on_time(&in_day, gap_threshold)
}

/// One bar of the weekly screen-on chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_minutes")]
    pub active_time: Duration,
    pub is_today: bool,
}

/// Seven days of screen-on time, oldest first, ending with `today`
pub fn weekly_screen_on_time(
    samples: &[Sample],
    today: NaiveDate,
    gap_threshold: Duration,
) -> Vec<DailyUsage> {
    (0..7)
        .rev()
        .filter_map(|back| {
            let date = today.checked_sub_signed(Duration::days(back))?;
            Some(DailyUsage {
                date,
                active_time: daily_screen_on_time(samples, date, gap_threshold).total_active_time,
                is_today: back == 0,
            })
        })
        .collect()
}
