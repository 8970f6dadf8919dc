//! Duration formatting shared by the status report, chart titles and CLI

use chrono::Duration;

/// Placeholder for values that cannot be shown (infinite ETA, no data)
pub const NO_VALUE: &str = "—";

/// `HHh MMm` below a day, `Xd Yh` from a day on
pub fn format_duration_auto(d: Duration) -> String {
    let d = d.max(Duration::zero());
    if d < Duration::hours(24) {
        format!("{:02}h {:02}m", d.num_hours(), d.num_minutes() % 60)
    } else {
        format!("{}d {}h", d.num_days(), d.num_hours() % 24)
    }
}

/// `HH:MM` used on the screen-on bars
pub fn format_hhmm(d: Duration) -> String {
    if d <= Duration::zero() {
        return "00:00".to_string();
    }
    format!("{:02}:{:02}", d.num_hours(), d.num_minutes() % 60)
}

/// Round to the nearest whole minute
pub fn round_to_minute(d: Duration) -> Duration {
    let ms = d.num_milliseconds();
    let minute = 60_000;
    let rounded = (ms + minute / 2).div_euclid(minute) * minute;
    Duration::milliseconds(rounded)
}
