//! Rendering - draws the App into a ratatui frame

use battlog_common::analytics::DailyUsage;
use battlog_common::chart::{ChartRenderer, ChartSeries};
use battlog_common::format::format_hhmm;
use battlog_common::status::{StatusLine, Tone};
use battlog_common::ViewWindow;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Widget},
    Frame,
};

use super::app::App;
use super::layout::compute_layout;
use super::surface::{BrailleSurface, Palette};

const FRAME_TITLE: &str = " battlog - q: quit, r: refresh ";
const STATUS_TITLE: &str = " Battery Status & Prediction - ↑↓ to scroll ";
const SOT_TITLE: &str = " Daily Screen-On Time (7 days) ";

pub fn draw_ui(f: &mut Frame, app: &App) {
    let outer = Block::default().borders(Borders::ALL).title(FRAME_TITLE);
    let inner = outer.inner(f.size());
    f.render_widget(outer, f.size());

    let layout = compute_layout(inner);
    draw_chart_panel(f, layout.chart, app);
    draw_status_panel(f, layout.status, app);
    draw_sot_panel(f, layout.sot, app);
}

fn draw_chart_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", app.chart_title()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let widget = ChartWidget {
        renderer: ChartRenderer::new(app.config().chart_settings()),
        window: app.window(),
        series: app.series(),
        palette: Palette::from_config(&app.config().chart),
    };
    f.render_widget(widget, inner);
}

/// Battery chart as a ratatui widget
pub struct ChartWidget<'a> {
    pub renderer: ChartRenderer,
    pub window: ViewWindow,
    pub series: &'a [ChartSeries],
    pub palette: Palette,
}

impl Widget for ChartWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut surface = BrailleSurface::new(buf, area, self.palette);
        if let Err(e) = self.renderer.render(&mut surface, &self.window, self.series) {
            let style = Style::default().fg(self.palette.placeholder);
            buf.set_stringn(area.x, area.y, e.to_string(), area.width as usize, style);
        }
    }
}

fn draw_status_panel(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = if app.status_lines().is_empty() {
        let reason = app
            .load_error()
            .map(|e| format!("No data ({})", e))
            .unwrap_or_else(|| "No data".to_string());
        vec![Line::from(Span::styled(reason, Style::default().fg(Color::Yellow)))]
    } else {
        app.status_lines().iter().map(styled_line).collect()
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(STATUS_TITLE))
        .scroll((app.scroll(), 0));
    f.render_widget(paragraph, area);
}

fn styled_line(line: &StatusLine) -> Line<'static> {
    let style = match line.tone {
        Tone::Plain => Style::default(),
        Tone::Headline => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        Tone::Section => Style::default().fg(Color::Cyan),
        Tone::Good => Style::default().fg(Color::Green),
        Tone::Bad => Style::default().fg(Color::Red),
    };
    Line::from(Span::styled(line.text.clone(), style))
}

fn draw_sot_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(SOT_TITLE)
        .title_style(Style::default().fg(Color::Cyan));
    let days = app.weekly();
    let inner_width = block.inner(area).width;

    let bars: Vec<Bar> = days.iter().map(sot_bar).collect();
    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width(inner_width, days.len() as u16))
        .bar_gap(1);
    f.render_widget(chart, area);
}

fn sot_bar(day: &DailyUsage) -> Bar<'static> {
    let (color, value_fg) = if day.is_today {
        (Color::Yellow, Color::Black)
    } else {
        (Color::Cyan, Color::White)
    };
    let label = if day.is_today {
        "Today".to_string()
    } else {
        day.date.format("%a").to_string()
    };
    Bar::default()
        .value(day.active_time.num_minutes().max(0) as u64)
        .text_value(format_hhmm(day.active_time))
        .label(Line::from(label))
        .style(Style::default().fg(color))
        .value_style(Style::default().fg(value_fg).bg(color))
}

/// Widest bars that fit `count` bars with one column gaps
pub fn bar_width(inner_width: u16, count: u16) -> u16 {
    if count == 0 {
        return 1;
    }
    let gaps = count - 1;
    (inner_width.saturating_sub(gaps) / count).max(1)
}
