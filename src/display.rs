use crate::machine::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. Rows are 64-bit masks, bit 63 being the leftmost pixel.
pub trait Display {
    /// every pixel has been switched off
    fn clear(&mut self) -> Result<(), io::Error>;

    /// rows `first_row..first_row + rows.len()` now hold `rows`
    fn update_region(&mut self, first_row: usize, rows: &[u64]) -> Result<(), io::Error>;
}

// store useful metadata about the screen
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// coords of every pixel that is `lit`, in canvas space
    fn bitplane_from_rows<'a>(
        &self,
        rows: &'a [u64],
        lit: bool,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count().min(rows.len() * self.0);
        let w = self.0;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let (x, y) = (count % w, count / w);
                let bit = rows[y] >> (63 - x) & 1 == 1;
                if bit == lit {
                    return Some((
                        x as f64,        // x
                        -1.0 * y as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// text rendering of a framebuffer, one line per row
pub fn render_rows(rows: &[u64]) -> String {
    let mut out = String::with_capacity(rows.len() * (DISPLAY_WIDTH + 2));
    for row in rows {
        for x in 0..DISPLAY_WIDTH {
            out.push(if row >> (63 - x) & 1 == 1 { '#' } else { ' ' });
        }
        out.push('|');
        out.push('\n');
    }
    out
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    rows: [u64; DISPLAY_HEIGHT],
}

impl MonoTermDisplay {
    pub fn new() -> Result<MonoTermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            rows: [0; DISPLAY_HEIGHT],
        })
    }

    fn redraw(&mut self) -> Result<(), io::Error> {
        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        let resolution = &self.resolution;
        let rows = &self.rows;
        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + resolution.0 as u16, 2 + resolution.1 as u16);

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    // expand each bitplane into x, y float coords, suitable for
                    // rendering with TUI. this just prints blocky points for now
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_rows(rows, false).collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_rows(rows, true).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

impl Display for MonoTermDisplay {
    fn clear(&mut self) -> Result<(), io::Error> {
        self.rows = [0; DISPLAY_HEIGHT];
        self.redraw()
    }

    fn update_region(&mut self, first_row: usize, rows: &[u64]) -> Result<(), io::Error> {
        for (offset, row) in rows.iter().enumerate() {
            if let Some(dst) = self.rows.get_mut(first_row + offset) {
                *dst = *row;
            }
        }
        self.redraw()
    }
}

/// what a HeadlessDisplay was told
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Clear,
    Region { first_row: usize, rows: Vec<u64> },
}

/// keeps its own copy of the screen and a log of every event; useful for
/// testing and for running without a terminal
pub struct HeadlessDisplay {
    rows: [u64; DISPLAY_HEIGHT],
    events: Vec<DisplayEvent>,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        HeadlessDisplay {
            rows: [0; DISPLAY_HEIGHT],
            events: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[u64] {
        &self.rows
    }

    pub fn events(&self) -> &[DisplayEvent] {
        &self.events
    }

    pub fn render(&self) -> String {
        render_rows(&self.rows)
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HeadlessDisplay {
    fn clear(&mut self) -> Result<(), io::Error> {
        self.rows = [0; DISPLAY_HEIGHT];
        self.events.push(DisplayEvent::Clear);
        Ok(())
    }

    fn update_region(&mut self, first_row: usize, rows: &[u64]) -> Result<(), io::Error> {
        if first_row + rows.len() > DISPLAY_HEIGHT {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("rows {}..{} are off screen", first_row, first_row + rows.len()),
            ));
        }
        self.rows[first_row..first_row + rows.len()].copy_from_slice(rows);
        self.events.push(DisplayEvent::Region {
            first_row,
            rows: rows.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_pixel_count() {
        let r = Resolution(64, 32);
        assert_eq!(r.pixel_count(), 2048)
    }

    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_bitplanes_split_the_screen() {
        let r = Resolution(64, 32);
        let lit = r.bitplane_from_rows(&TEST_CARD, true).count();
        let unlit = r.bitplane_from_rows(&TEST_CARD, false).count();
        let expected: u32 = TEST_CARD.iter().map(|row| row.count_ones()).sum();
        assert_eq!(lit, expected as usize);
        assert_eq!(lit + unlit, 2048);
    }

    #[test]
    fn test_bitplane_coords() {
        let r = Resolution(64, 32);
        let mut rows = [0u64; 32];
        rows[2] = 1 << 63 | 1;
        let mut lit: Vec<_> = r.bitplane_from_rows(&rows, true).collect();
        lit.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(lit, vec![(0.0, -2.0), (63.0, -2.0)]);
    }

    #[test]
    fn test_render_rows() {
        let text = render_rows(&[0xF000_0000_0000_0001]);
        assert_eq!(text.len(), 66);
        assert!(text.starts_with("####    "));
        assert!(text.ends_with("#|\n"));
    }

    // HeadlessDisplay tests
    #[test]
    fn test_headless_records_events() -> Result<(), io::Error> {
        let mut d = HeadlessDisplay::new();
        d.update_region(30, &[0xFF, 0xF0])?;
        d.clear()?;
        d.update_region(0, &[1])?;
        assert_eq!(
            d.events(),
            &[
                DisplayEvent::Region {
                    first_row: 30,
                    rows: vec![0xFF, 0xF0]
                },
                DisplayEvent::Clear,
                DisplayEvent::Region {
                    first_row: 0,
                    rows: vec![1]
                },
            ]
        );
        assert_eq!(d.rows()[0], 1);
        assert_eq!(d.rows()[30], 0);
        Ok(())
    }

    #[test]
    fn test_headless_rejects_off_screen_rows() {
        let mut d = HeadlessDisplay::new();
        assert!(d.update_region(31, &[0, 0]).is_err());
        assert!(d.events().is_empty());
    }

    #[test]
    fn test_headless_shows_test_card() -> Result<(), io::Error> {
        let mut d = HeadlessDisplay::new();
        d.update_region(0, &TEST_CARD)?;
        let text = d.render();
        let first = text.lines().next().unwrap_or_default();
        assert_eq!(first, format!("{}|", "#".repeat(64)));
        Ok(())
    }
}

/// this is a display test card, for testing display routines
#[cfg(test)]
#[rustfmt::skip]
const TEST_CARD: [u64; DISPLAY_HEIGHT] = [
    0xFFFF_FFFF_FFFF_FFFF, // 00
    0x8000_0001_8000_0001, // 01
    0x8000_0003_C241_5555, // 02
    0x81FF_FFC5_A240_AAA9, // 03
    0x8000_0009_9241_5555, // 04
    0x81FF_FFC1_8240_AAA9, // 05
    0xA000_0001_83C1_5555, // 06
    0xA1FF_FFC1_8000_AAA9, // 07
    0xA000_0000_0001_5555, // 08
    0xA1FF_FFC0_0000_AAA9, // 09
    0xBC00_0000_0000_0001, // 10
    0x81FF_FFC0_0000_0001, // 11
    0x8800_0001_8000_0011, // 12
    0x91FF_FFC1_8000_0009, // 13
    0xA000_0001_8000_0005, // 14
    0xFF80_001F_F800_01FF, // 15
    0xFF80_001F_F800_01FF, // 16
    0xA000_0001_8000_0005, // 17
    0x9000_0001_8555_5509, // 18
    0x8800_0001_8555_5511, // 19
    0x8000_0000_0555_5501, // 20
    0x8000_0000_0555_553D, // 21
    0x9555_4000_0555_5525, // 22
    0xAAAA_8000_0555_553D, // 23
    0x9555_4001_8555_5529, // 24
    0xAAAA_83C1_8555_5525, // 25
    0x9555_4141_8555_5501, // 26
    0xAAAA_8149_9555_5501, // 27
    0x9555_4145_A555_5501, // 28
    0xAAAA_83C3_C555_5501, // 29
    0x8000_0001_8000_0001, // 30
    0xFFFF_FFFF_FFFF_FFFF, // 31
];
