//! Layout - panel rectangles of the battlog screen
//!
//! ```text
//! ┌ battlog ─────────────────────────────────┐
//! │ chart (60%)                              │
//! ├──────────────────────────┬───────────────┤
//! │ status (65%)             │ SOT bars (35%)│
//! └──────────────────────────┴───────────────┘
//! ```

use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuiLayout {
    /// Chart panel, border included
    pub chart: Rect,
    /// Status text panel, border included
    pub status: Rect,
    /// Daily screen-on bars, border included
    pub sot: Rect,
}

const CHART_PERCENT: u16 = 60;
const STATUS_PERCENT: u16 = 65;

/// Split the area inside the outer frame
pub fn compute_layout(inner: Rect) -> TuiLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(CHART_PERCENT),
            Constraint::Percentage(100 - CHART_PERCENT),
        ])
        .split(inner);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(STATUS_PERCENT),
            Constraint::Percentage(100 - STATUS_PERCENT),
        ])
        .split(rows[1]);

    TuiLayout {
        chart: rows[0],
        status: bottom[0],
        sot: bottom[1],
    }
}
