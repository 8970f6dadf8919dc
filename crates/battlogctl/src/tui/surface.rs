//! Braille chart surface over a ratatui buffer
//!
//! Each cell packs a 2x4 dot grid. Pixels set in the same cell are OR-ed
//! into one braille glyph; the last series to touch a cell picks its color.

use battlog_common::chart::{Band, CellRect, ChartSurface, Ink, SeriesKind};
use battlog_common::config::ChartConfig;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};

const BRAILLE_BLANK: u32 = 0x2800;

/// Dot bit for sub-cell `(x, y)`, indexed `[y][x]`
const BRAILLE_DOTS: [[u32; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// Colors of the chart roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub day: Color,
    pub night: Color,
    pub charging: Color,
    pub discharging: Color,
    pub axis: Color,
    pub label: Color,
    pub date_label: Color,
    pub day_break: Color,
    pub placeholder: Color,
}

impl Palette {
    pub fn from_config(chart: &ChartConfig) -> Self {
        Self {
            day: Color::Indexed(chart.day_color),
            night: Color::Indexed(chart.night_color),
            ..Self::default()
        }
    }

    fn ink(&self, ink: Ink) -> Color {
        match ink {
            Ink::Axis => self.axis,
            Ink::AxisLabel => self.label,
            Ink::DateLabel => self.date_label,
            Ink::DayBreak => self.day_break,
            Ink::Placeholder => self.placeholder,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            day: Color::Indexed(237),
            night: Color::Indexed(0),
            charging: Color::Indexed(46),
            discharging: Color::Indexed(196),
            axis: Color::Gray,
            label: Color::White,
            date_label: Color::Cyan,
            day_break: Color::DarkGray,
            placeholder: Color::Yellow,
        }
    }
}

pub struct BrailleSurface<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    palette: Palette,
}

impl<'a> BrailleSurface<'a> {
    /// Surface restricted to `area`, which must lie inside `buf`
    pub fn new(buf: &'a mut Buffer, area: Rect, palette: Palette) -> Self {
        let area = area.intersection(buf.area);
        Self { buf, area, palette }
    }

    fn contains(&self, col: u16, row: u16) -> bool {
        col >= self.area.x && col < self.area.right() && row >= self.area.y && row < self.area.bottom()
    }
}

impl ChartSurface for BrailleSurface<'_> {
    fn area(&self) -> CellRect {
        CellRect::new(self.area.x, self.area.y, self.area.width, self.area.height)
    }

    fn set_background(&mut self, col: u16, row: u16, band: Band) {
        if !self.contains(col, row) {
            return;
        }
        let color = match band {
            Band::Day => self.palette.day,
            Band::Night => self.palette.night,
        };
        self.buf.get_mut(col, row).set_bg(color);
    }

    fn set_pixel(&mut self, px: u32, py: u32, series: SeriesKind) {
        let (col, row) = (px / 2, py / 4);
        let (Ok(col), Ok(row)) = (u16::try_from(col), u16::try_from(row)) else {
            return;
        };
        if !self.contains(col, row) {
            return;
        }

        let bit = BRAILLE_DOTS[(py % 4) as usize][(px % 2) as usize];
        let color = match series {
            SeriesKind::Charging => self.palette.charging,
            SeriesKind::Discharging => self.palette.discharging,
        };
        let cell = self.buf.get_mut(col, row);
        let current = cell
            .symbol()
            .chars()
            .next()
            .map(u32::from)
            .filter(|c| (BRAILLE_BLANK..=BRAILLE_BLANK + 0xFF).contains(c))
            .unwrap_or(BRAILLE_BLANK);
        if let Some(glyph) = char::from_u32(current | bit) {
            cell.set_char(glyph).set_fg(color);
        }
    }

    fn set_cell(&mut self, col: u16, row: u16, glyph: char, ink: Ink) {
        if !self.contains(col, row) {
            return;
        }
        let color = self.palette.ink(ink);
        self.buf.get_mut(col, row).set_char(glyph).set_fg(color);
    }

    fn draw_text(&mut self, col: u16, row: u16, text: &str, ink: Ink) {
        if !self.contains(col, row) {
            return;
        }
        let width = (self.area.right() - col) as usize;
        let style = Style::default().fg(self.palette.ink(ink));
        self.buf.set_stringn(col, row, text, width, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: u16, height: u16) -> Buffer {
        Buffer::empty(Rect::new(0, 0, width, height))
    }

    #[test]
    fn test_pixels_compose_in_one_cell() {
        let mut buf = buffer(4, 2);
        let mut surface = BrailleSurface::new(&mut buf, Rect::new(0, 0, 4, 2), Palette::default());
        surface.set_pixel(0, 0, SeriesKind::Discharging);
        surface.set_pixel(1, 3, SeriesKind::Discharging);

        let cell = buf.get(0, 0);
        assert_eq!(cell.symbol(), "⢁");
        assert_eq!(cell.fg, Color::Indexed(196));
    }

    #[test]
    fn test_pixel_cell_mapping() {
        let mut buf = buffer(4, 2);
        let mut surface = BrailleSurface::new(&mut buf, Rect::new(0, 0, 4, 2), Palette::default());
        // sub-cell (1, 1) of cell (2, 1)
        surface.set_pixel(5, 5, SeriesKind::Charging);
        assert_eq!(buf.get(2, 1).symbol(), "⠐");
        assert_eq!(buf.get(2, 1).fg, Color::Indexed(46));
        assert_eq!(buf.get(0, 0).symbol(), " ");
    }

    #[test]
    fn test_pixel_replaces_text_glyph() {
        let mut buf = buffer(2, 1);
        let mut surface = BrailleSurface::new(&mut buf, Rect::new(0, 0, 2, 1), Palette::default());
        surface.set_cell(0, 0, '│', Ink::Axis);
        surface.set_pixel(0, 2, SeriesKind::Charging);
        assert_eq!(buf.get(0, 0).symbol(), "⠄");
    }

    #[test]
    fn test_writes_outside_area_are_dropped() {
        let mut buf = buffer(6, 3);
        let mut surface = BrailleSurface::new(&mut buf, Rect::new(1, 1, 3, 1), Palette::default());
        surface.set_pixel(0, 0, SeriesKind::Charging);
        surface.set_background(5, 2, Band::Day);
        surface.draw_text(1, 1, "100%", Ink::AxisLabel);

        assert_eq!(buf.get(0, 0).symbol(), " ");
        assert_eq!(buf.get(5, 2).bg, Color::Reset);
        assert_eq!(buf.get(1, 1).symbol(), "1");
        assert_eq!(buf.get(3, 1).symbol(), "0");
        // clipped at the area edge
        assert_eq!(buf.get(4, 1).symbol(), " ");
    }

    #[test]
    fn test_background_bands() {
        let mut buf = buffer(2, 1);
        let palette = Palette::from_config(&ChartConfig::default());
        let mut surface = BrailleSurface::new(&mut buf, Rect::new(0, 0, 2, 1), palette);
        surface.set_background(0, 0, Band::Day);
        surface.set_background(1, 0, Band::Night);
        assert_eq!(buf.get(0, 0).bg, Color::Indexed(237));
        assert_eq!(buf.get(1, 0).bg, Color::Indexed(0));
    }
}
